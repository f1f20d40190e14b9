use bytes::Bytes;
use parking_lot::RwLock;

use crate::{
  db::Engine,
  errors::Result,
  index::IndexIterator,
  option::IteratorOptions,
};

impl Engine {
  /// Returns every live key currently in the index.
  pub fn list_keys(&self) -> Result<Vec<Bytes>> {
    self.index.list_keys()
  }

  /// Builds a snapshot iterator over the engine's data, filtered to keys
  /// starting with `options.prefix` (an empty prefix disables filtering).
  pub fn iterator(&self, options: IteratorOptions) -> Iterator {
    Iterator {
      index_iter: RwLock::new(self.index.iterator(options.clone())),
      engine: self,
      options,
    }
  }
}

/// Combines an index snapshot traversal with value lookups through the
/// engine, filtering out keys that don't match the configured prefix.
pub struct Iterator<'a> {
  index_iter: RwLock<Box<dyn IndexIterator>>,
  engine: &'a Engine,
  options: IteratorOptions,
}

impl Iterator<'_> {
  pub fn rewind(&self) {
    let mut index_iter = self.index_iter.write();
    index_iter.rewind();
    self.skip_to_next(&mut index_iter);
  }

  pub fn seek(&self, key: Vec<u8>) {
    let mut index_iter = self.index_iter.write();
    index_iter.seek(key);
    self.skip_to_next(&mut index_iter);
  }

  pub fn next(&self) {
    let mut index_iter = self.index_iter.write();
    index_iter.next();
    self.skip_to_next(&mut index_iter);
  }

  pub fn valid(&self) -> bool {
    self.index_iter.read().valid()
  }

  pub fn key(&self) -> Bytes {
    Bytes::from(self.index_iter.read().key().to_vec())
  }

  pub fn value(&self) -> Result<Bytes> {
    let index_iter = self.index_iter.read();
    let pos = index_iter.value();
    self.engine.get_value_by_position(&pos)
  }

  fn skip_to_next(&self, index_iter: &mut Box<dyn IndexIterator>) {
    let prefix_len = self.options.prefix.len();
    if prefix_len == 0 {
      return;
    }
    while index_iter.valid() {
      let key = index_iter.key();
      if key.len() >= prefix_len && key[..prefix_len] == self.options.prefix[..] {
        break;
      }
      index_iter.next();
    }
  }
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use crate::option::Options;

  use super::*;

  fn open_engine() -> (Engine, tempfile::TempDir) {
    let temp_dir = tempdir().expect("failed to create temp dir");
    let mut opts = Options::default();
    opts.dir_path = temp_dir.path().to_path_buf();
    opts.data_file_size = 64 * 1024 * 1024;
    let engine = Engine::open(opts).expect("failed to open engine");
    (engine, temp_dir)
  }

  #[test]
  fn iterates_in_ascending_order() {
    let (engine, _dir) = open_engine();
    engine.put(Bytes::from("b"), Bytes::from("2")).unwrap();
    engine.put(Bytes::from("a"), Bytes::from("1")).unwrap();
    engine.put(Bytes::from("c"), Bytes::from("3")).unwrap();

    let iter = engine.iterator(IteratorOptions::default());
    let mut keys = Vec::new();
    iter.rewind();
    while iter.valid() {
      keys.push(iter.key());
      iter.next();
    }
    assert_eq!(keys, vec![Bytes::from("a"), Bytes::from("b"), Bytes::from("c")]);
  }

  #[test]
  fn filters_by_prefix() {
    let (engine, _dir) = open_engine();
    engine.put(Bytes::from("apple"), Bytes::from("1")).unwrap();
    engine.put(Bytes::from("apricot"), Bytes::from("2")).unwrap();
    engine.put(Bytes::from("banana"), Bytes::from("3")).unwrap();

    let iter = engine.iterator(IteratorOptions {
      prefix: b"ap".to_vec(),
      reverse: false,
    });
    let mut keys = Vec::new();
    iter.rewind();
    while iter.valid() {
      keys.push(iter.key());
      iter.next();
    }
    assert_eq!(keys, vec![Bytes::from("apple"), Bytes::from("apricot")]);
  }

  #[test]
  fn value_reads_through_the_engine() {
    let (engine, _dir) = open_engine();
    engine.put(Bytes::from("k"), Bytes::from("v")).unwrap();

    let iter = engine.iterator(IteratorOptions::default());
    iter.rewind();
    assert!(iter.valid());
    assert_eq!(iter.value().unwrap(), Bytes::from("v"));
  }
}
