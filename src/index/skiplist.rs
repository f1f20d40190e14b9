use bytes::Bytes;
use crossbeam_skiplist::SkipMap;

use crate::{
  data::log_record::LogRecordPos,
  errors::Result,
  option::IteratorOptions,
};

use super::{IndexIterator, Indexer};

/// A lock-free, in-memory ordered index backed by `crossbeam_skiplist`.
pub struct SkipList {
  skl: SkipMap<Vec<u8>, LogRecordPos>,
}

impl SkipList {
  pub fn new() -> Self {
    Self {
      skl: SkipMap::new(),
    }
  }
}

impl Default for SkipList {
  fn default() -> Self {
    Self::new()
  }
}

impl Indexer for SkipList {
  fn put(&self, key: Vec<u8>, pos: LogRecordPos) -> Option<LogRecordPos> {
    let old = self.skl.get(&key).map(|e| *e.value());
    self.skl.insert(key, pos);
    old
  }

  fn get(&self, key: Vec<u8>) -> Option<LogRecordPos> {
    self.skl.get(&key).map(|e| *e.value())
  }

  fn delete(&self, key: Vec<u8>) -> Option<LogRecordPos> {
    self.skl.remove(&key).map(|e| *e.value())
  }

  fn size(&self) -> usize {
    self.skl.len()
  }

  fn list_keys(&self) -> Result<Vec<Bytes>> {
    Ok(self.skl.iter().map(|e| Bytes::from(e.key().clone())).collect())
  }

  fn iterator(&self, options: IteratorOptions) -> Box<dyn IndexIterator> {
    let mut items: Vec<(Vec<u8>, LogRecordPos)> = self
      .skl
      .iter()
      .map(|e| (e.key().clone(), *e.value()))
      .collect();
    if options.reverse {
      items.reverse();
    }
    Box::new(SkipListIterator {
      items,
      cursor: 0,
      options,
    })
  }
}

/// A snapshot taken at construction time; the skiplist may keep changing
/// underneath without affecting an iterator already handed out.
pub struct SkipListIterator {
  items: Vec<(Vec<u8>, LogRecordPos)>,
  cursor: usize,
  options: IteratorOptions,
}

impl IndexIterator for SkipListIterator {
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
