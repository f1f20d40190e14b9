pub mod btree;
pub mod skiplist;

use bytes::Bytes;

use crate::{
  data::log_record::LogRecordPos,
  errors::Result,
  option::{IndexType, IteratorOptions},
};

pub trait Indexer: Sync + Send {
  fn put(&self, key: Vec<u8>, pos: LogRecordPos) -> Option<LogRecordPos>;

  /// Retrieves a key's position from the index.
  fn get(&self, key: Vec<u8>) -> Option<LogRecordPos>;

  /// Deletes a key's position from the index.
  fn delete(&self, key: Vec<u8>) -> Option<LogRecordPos>;

  fn size(&self) -> usize;

  fn list_keys(&self) -> Result<Vec<Bytes>>;

  /// Creates an iterator for the index with the specified options.
  /// * `options` - Configuration options for the iterator
  fn iterator(&self, options: IteratorOptions) -> Box<dyn IndexIterator>;
}

/// Creates a new indexer based on the specified index type.
pub fn new_indexer(index_type: &IndexType) -> Box<dyn Indexer> {
  match *index_type {
    IndexType::BTree => Box::new(btree::BTree::new()),
    IndexType::SkipList => Box::new(skiplist::SkipList::new()),
  }
}

/// A snapshot traversal over the index, taken under the index's shared
/// lock and released before the first advance so writers stay unblocked
/// (spec §9 "concurrent-iterator snapshot").
pub trait IndexIterator: Sync + Send {
  /// Resets the cursor to the first entry (ascending, or descending if
  /// the iterator was constructed in reverse).
  fn rewind(&mut self);

  /// Positions the cursor at the first key >= `key` (or <= if reverse).
  fn seek(&mut self, key: Vec<u8>);

  /// Advances the cursor by one entry.
  fn next(&mut self);

  /// Whether the cursor currently refers to a live entry.
  fn valid(&self) -> bool;

  /// The raw key at the cursor. Panics if `!valid()`.
  fn key(&self) -> &[u8];

  /// The record location at the cursor. Panics if `!valid()`.
  fn value(&self) -> LogRecordPos;
}
