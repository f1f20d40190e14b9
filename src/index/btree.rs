use std::collections::BTreeMap;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::{
  data::log_record::LogRecordPos,
  errors::Result,
  option::IteratorOptions,
};

use super::{IndexIterator, Indexer};

/// An in-memory, ordered index backed by `std::collections::BTreeMap`.
pub struct BTree {
  tree: RwLock<BTreeMap<Vec<u8>, LogRecordPos>>,
}

impl BTree {
  pub fn new() -> Self {
    Self {
      tree: RwLock::new(BTreeMap::new()),
    }
  }
}

impl Default for BTree {
  fn default() -> Self {
    Self::new()
  }
}

impl Indexer for BTree {
  fn put(&self, key: Vec<u8>, pos: LogRecordPos) -> Option<LogRecordPos> {
    let mut tree = self.tree.write();
    tree.insert(key, pos)
  }

  fn get(&self, key: Vec<u8>) -> Option<LogRecordPos> {
    let tree = self.tree.read();
    tree.get(&key).copied()
  }

  fn delete(&self, key: Vec<u8>) -> Option<LogRecordPos> {
    let mut tree = self.tree.write();
    tree.remove(&key)
  }

  fn size(&self) -> usize {
    self.tree.read().len()
  }

  fn list_keys(&self) -> Result<Vec<Bytes>> {
    let tree = self.tree.read();
    Ok(tree.keys().map(|k| Bytes::from(k.clone())).collect())
  }

  fn iterator(&self, options: IteratorOptions) -> Box<dyn IndexIterator> {
    let tree = self.tree.read();
    let mut items: Vec<(Vec<u8>, LogRecordPos)> =
      tree.iter().map(|(k, v)| (k.clone(), *v)).collect();
    if options.reverse {
      items.reverse();
    }
    Box::new(BTreeIterator {
      items,
      cursor: 0,
      options,
    })
  }
}

/// A snapshot taken under the tree's read lock at construction time; the
/// lock is released immediately after and never reacquired while
/// iterating.
pub struct BTreeIterator {
  items: Vec<(Vec<u8>, LogRecordPos)>,
  cursor: usize,
  options: IteratorOptions,
}

impl IndexIterator for BTreeIterator {
  fn rewind(&mut self) {
    self.cursor = 0;
  }

  fn seek(&mut self, key: Vec<u8>) {
    self.cursor = match self.options.reverse {
      false => self
        .items
        .partition_point(|(item_key, _)| item_key.as_slice() < key.as_slice()),
      true => self
        .items
        .partition_point(|(item_key, _)| item_key.as_slice() > key.as_slice()),
    };
  }

  fn next(&mut self) {
    self.cursor += 1;
  }

  fn valid(&self) -> bool {
    self.cursor < self.items.len()
  }

  fn key(&self) -> &[u8] {
    &self.items[self.cursor].0
  }

  fn value(&self) -> LogRecordPos {
    self.items[self.cursor].1
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pos(file_id: u32, offset: u64) -> LogRecordPos {
    LogRecordPos {
      file_id,
      offset,
      size: 10,
    }
  }

  #[test]
  fn put_get_delete() {
    let bt = BTree::new();
    assert!(bt.put(b"a".to_vec(), pos(1, 0)).is_none());
    assert_eq!(bt.get(b"a".to_vec()), Some(pos(1, 0)));

    let old = bt.put(b"a".to_vec(), pos(1, 10));
    assert_eq!(old, Some(pos(1, 0)));
    assert_eq!(bt.get(b"a".to_vec()), Some(pos(1, 10)));

    assert_eq!(bt.delete(b"a".to_vec()), Some(pos(1, 10)));
    assert_eq!(bt.get(b"a".to_vec()), None);
    assert_eq!(bt.delete(b"a".to_vec()), None);
  }

  #[test]
  fn iterator_ascending_and_descending() {
    let bt = BTree::new();
    for (i, k) in ["b", "a", "c"].iter().enumerate() {
      bt.put(k.as_bytes().to_vec(), pos(0, i as u64));
    }

    let mut it = bt.iterator(IteratorOptions::default());
    let mut keys = Vec::new();
    it.rewind();
    while it.valid() {
      keys.push(it.key().to_vec());
      it.next();
    }
    assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);

    let mut rit = bt.iterator(IteratorOptions {
      prefix: vec![],
      reverse: true,
    });
    let mut rkeys = Vec::new();
    rit.rewind();
    while rit.valid() {
      rkeys.push(rit.key().to_vec());
      rit.next();
    }
    assert_eq!(rkeys, vec![b"c".to_vec(), b"b".to_vec(), b"a".to_vec()]);
  }

  #[test]
  fn seek_positions_at_first_key_gte_or_lte() {
    let bt = BTree::new();
    for k in ["a", "c", "e"] {
      bt.put(k.as_bytes().to_vec(), pos(0, 0));
    }

    let mut it = bt.iterator(IteratorOptions::default());
    it.seek(b"b".to_vec());
    assert_eq!(it.key(), b"c");

    let mut rit = bt.iterator(IteratorOptions {
      prefix: vec![],
      reverse: true,
    });
    rit.seek(b"d".to_vec());
    assert_eq!(rit.key(), b"c");
  }
}
