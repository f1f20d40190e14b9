use std::path::Path;

use fs2::available_space;
use fs_extra::dir::{self, CopyOptions};
use log::warn;

/// Total size, in bytes, of every regular file directly inside `dir_path`.
/// Used to compute the reclaimable-space ratio that gates a merge.
pub fn dir_disk_size<P>(dir_path: P) -> u64
where
  P: AsRef<Path>,
{
  let mut size: u64 = 0;
  let entries = match std::fs::read_dir(&dir_path) {
    Ok(entries) => entries,
    Err(e) => {
      warn!("failed to read directory for size accounting: {e}");
      return 0;
    }
  };
  for entry in entries.flatten() {
    if let Ok(meta) = entry.metadata() {
      if meta.is_file() {
        size += meta.len();
      }
    }
  }
  size
}

/// Free space remaining on the filesystem backing the current directory,
/// used to guard a merge from running the disk out of space.
pub fn available_disk_space() -> u64 {
  match available_space(".") {
    Ok(size) => size,
    Err(e) => {
      warn!("failed to probe available disk space: {e}");
      0
    }
  }
}

/// Recursively copies `src` into `dst`, skipping any top-level entry whose
/// name appears in `exclude` (used to keep the process file lock out of a
/// backup).
pub fn copy_dir<P>(src: P, dst: P, exclude: &[&str]) -> Result<(), fs_extra::error::Error>
where
  P: AsRef<Path>,
{
  if !dst.as_ref().exists() {
    std::fs::create_dir_all(&dst)?;
  }

  for entry in std::fs::read_dir(&src)?.flatten() {
    let file_name = entry.file_name();
    let name = file_name.to_string_lossy();
    if exclude.iter().any(|e| *e == name) {
      continue;
    }

    let path = entry.path();
    if path.is_dir() {
      let options = CopyOptions::new().copy_inside(true);
      dir::copy(&path, dst.as_ref(), &options)?;
    } else {
      std::fs::copy(&path, dst.as_ref().join(file_name))?;
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn dir_disk_size_sums_regular_files() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("a"), b"hello").unwrap();
    std::fs::write(dir.path().join("b"), b"world!").unwrap();
    assert_eq!(dir_disk_size(dir.path()), 11);
  }

  #[test]
  fn copy_dir_excludes_named_entries() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    std::fs::write(src.path().join("keep.data"), b"data").unwrap();
    std::fs::write(src.path().join("flock"), b"").unwrap();

    copy_dir(src.path(), dst.path(), &["flock"]).unwrap();

    assert!(dst.path().join("keep.data").is_file());
    assert!(!dst.path().join("flock").exists());
  }
}
