use thiserror::Error;

pub type Result<T> = std::result::Result<T, Errors>;

/// Every failure mode the core engine can surface to a caller.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Errors {
  #[error("the key is empty")]
  KeyIsEmpty,

  #[error("cannot find key")]
  KeyNotFound,

  #[error("cannot find data file")]
  DataFileNotFound,

  #[error("database directory is corrupted")]
  DatabaseDirectoryCorrupted,

  #[error("invalid crc value, log record may be corrupted")]
  InvalidLogRecordCrc,

  #[error("exceeded the max batch num")]
  ExceedMaxBatchNum,

  #[error("merge is already in process")]
  MergeInProgress,

  #[error("failed to update index")]
  IndexUpdateFailed,

  #[error("database dir path can't be empty")]
  DirPathIsEmpty,

  #[error("database data file size must be greater than 0")]
  DataFileSizeTooSmall,

  #[error("invalid merge threshold, must be between 0 and 1")]
  InvalidMergeThreshold,

  #[error("failed to create database directory")]
  FailedToCreateDatabaseDir,

  #[error("failed to read database directory")]
  FailedToReadDatabaseDir,

  #[error("failed to open data file")]
  FailedToOpenDataFile,

  #[error("the database directory is being used by another process")]
  DatabaseIsUsing,

  #[error("read data file to EOF")]
  ReadDataFileEOF,

  #[error("failed to copy database directory")]
  FailedToCopyDirectory,

  #[error("merge ratio does not reach the configured threshold")]
  MergeThresholdUnreached,

  #[error("not enough free disk space to perform a merge")]
  MergeNoEnoughSpace,

  #[error("unexpected I/O error: {0}")]
  Io(String),
}

impl From<std::io::Error> for Errors {
  fn from(e: std::io::Error) -> Self {
    Errors::Io(e.to_string())
  }
}
