use bytes::BytesMut;
use parking_lot::RwLock;
use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use super::log_record::{
  decode_header, max_log_record_header_size, verify_crc, HeaderDecode, LogRecord, LogRecordPos,
  LogRecordType, ReadLogRecord,
};
use crate::{
  errors::{Errors, Result},
  fio::{new_io_manager, IOManager},
  option::IOManagerType,
};

pub const DATA_FILE_NAME_SUFFIX: &str = ".data";
pub const HINT_FILE_NAME: &str = "hint-index";
pub const MERGE_FINISHED_FILE_NAME: &str = "merge-finished";

#[macro_export]
macro_rules! new_data_file {
  () => {
      pub fn new<P: AsRef<std::path::Path>>(dir_path: P, file_id: u32, io_type: IOManagerType) -> Result<Self> {
          let file_name = get_data_file_name(&dir_path, file_id);
          let io_manager = new_io_manager(&file_name, &io_type)?;
          Ok(Self {
              file_id: std::sync::Arc::new(parking_lot::RwLock::new(file_id)),
              write_off: std::sync::Arc::new(parking_lot::RwLock::new(0)),
              io_manager,
          })
      }
  };
  ($($name:ident, $file_id:expr, $io_type:expr, $file_name:expr);*;) => {
      $(
          pub fn $name<P: AsRef<std::path::Path>>(dir_path: P) -> Result<Self> {
              let file_name = $file_name.map_or_else(
                  || panic!("file name must be provided"),
                  |name| dir_path.as_ref().join(name),
              );
              let io_manager = new_io_manager(&file_name, &$io_type)?;
              Ok(Self {
                  file_id: std::sync::Arc::new(parking_lot::RwLock::new($file_id)),
                  write_off: std::sync::Arc::new(parking_lot::RwLock::new(0)),
                  io_manager,
              })
          }
      )*
  };
}

/// A sequentially appendable, randomly readable numbered data file.
pub struct DataFile {
  file_id: Arc<RwLock<u32>>,      // data file id
  write_off: Arc<RwLock<u64>>, // current write offset, used for recording appending write position
  io_manager: Box<dyn IOManager>, // IO manager interface
}

impl DataFile {
  // create or open a new data file
  new_data_file!();

  // create or open hint file and merge finished file
  new_data_file!(
    new_hint_file,
    0,
    IOManagerType::StandardFileIO,
    Some(HINT_FILE_NAME);
    new_merge_fin_file,
    0,
    IOManagerType::StandardFileIO,
    Some(MERGE_FINISHED_FILE_NAME);
  );

  pub fn file_size(&self) -> u64 {
    self.io_manager.size()
  }

  pub fn get_write_off(&self) -> u64 {
    let read_guard = self.write_off.read();
    *read_guard
  }

  pub fn set_write_off(&self, offset: u64) {
    let mut write_guard = self.write_off.write();
    *write_guard = offset;
  }

  pub fn get_file_id(&self) -> u32 {
    let read_guard = self.file_id.read();
    *read_guard
  }

  /// Reads one record starting at `offset`. Clamps the header read to
  /// the file's remaining bytes so a final, shorter-than-max-header
  /// record at EOF never trips a short-read error.
  pub fn read_log_record(&self, offset: u64) -> Result<ReadLogRecord> {
    let file_size = self.io_manager.size();
    if offset >= file_size {
      return Err(Errors::ReadDataFileEOF);
    }

    let max_header = max_log_record_header_size() as u64;
    let header_read_len = std::cmp::min(max_header, file_size - offset) as usize;
    let mut header_buf = BytesMut::zeroed(header_read_len);
    self.io_manager.read(&mut header_buf, offset)?;

    let (header, header_len) = match decode_header(&header_buf) {
      HeaderDecode::TooShort => return Err(Errors::ReadDataFileEOF),
      HeaderDecode::EndOfStream => return Err(Errors::ReadDataFileEOF),
      HeaderDecode::Header(header, header_len) => (header, header_len),
    };

    let kv_len = header.key_len + header.val_len;
    let mut kv_buf = BytesMut::zeroed(kv_len);
    if kv_len > 0 {
      self.io_manager.read(&mut kv_buf, offset + header_len as u64)?;
    }

    let key = kv_buf[..header.key_len].to_vec();
    let value = kv_buf[header.key_len..].to_vec();

    let rec_type = LogRecordType::from_u8(header.rec_type).ok_or(Errors::InvalidLogRecordCrc)?;

    let residual_header = &header_buf[4..header_len];
    if verify_crc(residual_header, &key, &value) != header.crc {
      return Err(Errors::InvalidLogRecordCrc);
    }

    Ok(ReadLogRecord {
      record: LogRecord {
        key,
        value,
        rec_type,
      },
      size: header_len + kv_len,
    })
  }

  pub fn write(&self, buf: &[u8]) -> Result<usize> {
    let n_bytes = self.io_manager.write(buf)?;

    //update write_off
    let mut write_off = self.write_off.write();
    *write_off += n_bytes as u64;

    Ok(n_bytes)
  }

  // write hint record into hint file
  pub fn write_hint_record(&self, key: Vec<u8>, pos: LogRecordPos) -> Result<()> {
    let hint_record = LogRecord {
      key,
      value: pos.encode(),
      rec_type: LogRecordType::Normal,
    };
    let enc_record = hint_record.encode();
    self.write(&enc_record)?;
    Ok(())
  }

  pub fn sync(&self) -> Result<()> {
    self.io_manager.sync()
  }

  pub fn set_io_manager<P>(&mut self, dir_path: P, io_type: IOManagerType) -> Result<()>
  where
    P: AsRef<Path>,
  {
    self.io_manager = new_io_manager(&get_data_file_name(dir_path, self.get_file_id()), &io_type)?;
    Ok(())
  }
}

/// get filename
pub fn get_data_file_name<P>(dir_path: P, file_id: u32) -> PathBuf
where
  P: AsRef<Path>,
{
  let name = format!("{file_id:09}") + DATA_FILE_NAME_SUFFIX;
  dir_path.as_ref().join(name)
}
