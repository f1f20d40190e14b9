//! caskdb: an embedded, persistent key-value store built on the Bitcask
//! log-structured model.
//!
//! Writes are appended to a sequence of immutable data files; an in-memory
//! index maps each key to its most recent record location. The index is
//! rebuilt from the log on every open, with an optional hint-file fast path
//! after a merge. Space is reclaimed by merging live records into a fresh
//! set of data files and retiring the old ones.
//!
//! # Features
//!
//! * Fast reads and writes with minimal disk I/O
//! * Durable storage with configurable sync options
//! * Atomic write batches for transactional operations
//! * Efficient space reclamation through compaction (merge)
//! * Multiple index implementations for different performance needs
//! * Memory-mapped I/O support for improved read performance
//!
//! # Basic Usage
//!
//! ```
//! use bytes::Bytes;
//! use caskdb::{db::Engine, option::Options};
//!
//! let opts = Options::default();
//! let engine = Engine::open(opts).expect("failed to open caskdb engine");
//!
//! let key = Bytes::from(b"hello".to_vec());
//! let value = Bytes::from(b"world".to_vec());
//! engine.put(key.clone(), value.clone()).expect("failed to put");
//!
//! let retrieved = engine.get(key.clone()).expect("failed to get");
//! assert_eq!(retrieved, value);
//!
//! engine.delete(key).expect("failed to delete");
//! ```

mod data;

mod fio;
mod index;
mod iterator;

pub mod batch;
pub mod db;
pub mod errors;
pub mod merge;
pub mod option;
pub mod util;
