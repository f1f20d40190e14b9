use std::{
  fs::{File, OpenOptions},
  io::Write as _,
  os::unix::fs::FileExt,
  path::Path,
  sync::Arc,
};

use log::error;
use parking_lot::Mutex;

use crate::errors::{Errors, Result};

use super::IOManager;

/// Standard file IO: a single append-mode file descriptor, guarded by a
/// mutex so concurrent appends don't interleave.
pub struct FileIO {
  fd: Arc<Mutex<File>>,
}

impl FileIO {
  pub fn new<P>(file_name: P) -> Result<Self>
  where
    P: AsRef<Path>,
  {
    match OpenOptions::new()
      .create(true)
      .read(true)
      .write(true)
      .append(true)
      .open(file_name)
    {
      Ok(file) => Ok(FileIO {
        fd: Arc::new(Mutex::new(file)),
      }),
      Err(e) => {
        error!("failed to open data file error: {e}");
        Err(Errors::FailedToOpenDataFile)
      }
    }
  }
}

impl IOManager for FileIO {
  fn read(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
    let fd = self.fd.lock();
    Ok(fd.read_at(buf, offset)?)
  }

  fn write(&self, buf: &[u8]) -> Result<usize> {
    let mut fd = self.fd.lock();
    Ok(fd.write(buf)?)
  }

  fn sync(&self) -> Result<()> {
    let fd = self.fd.lock();
    fd.sync_all()?;
    Ok(())
  }

  fn size(&self) -> u64 {
    let fd = self.fd.lock();
    fd.metadata().map(|m| m.len()).unwrap_or(0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_file_io_write_and_read() {
    let dir_path = std::env::temp_dir();
    let path = dir_path.join("caskdb-file-io-test.data");
    let _ = std::fs::remove_file(&path);

    let fio = FileIO::new(&path).unwrap();
    assert_eq!(fio.write(b"hello").unwrap(), 5);
    assert_eq!(fio.write(b" world").unwrap(), 6);
    assert_eq!(fio.size(), 11);

    let mut buf = [0u8; 5];
    fio.read(&mut buf, 0).unwrap();
    assert_eq!(&buf, b"hello");

    let mut buf2 = [0u8; 6];
    fio.read(&mut buf2, 5).unwrap();
    assert_eq!(&buf2, b" world");

    assert!(fio.sync().is_ok());
    let _ = std::fs::remove_file(&path);
  }
}
