//! Append-only disk log of compiled shader artifacts.
//!
//! # File layout
//!
//! ```text
//! header  : magic "MPSC" | format version (u32 LE)
//! record* : key length (u32 LE) | key bytes | value length (u32 LE) | value bytes
//! ```
//!
//! The log is read completely once when opened and then only ever appended
//! to. Every append is followed by a data sync so an artifact compiled in
//! this session survives a crash before the next one.
//!
//! Corruption is handled locally:
//! - a foreign or outdated header discards the file contents;
//! - a torn final record (crash mid-append) ends the read and is cut off so
//!   later appends remain reachable.
//!
//! Per-record validation of the key is up to the reader callback.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::{Result, ShaderCacheError};

/// Magic bytes identifying a shader cache log.
const LOG_MAGIC: [u8; 4] = *b"MPSC";

/// Current log format version. Increment on breaking layout changes.
const LOG_FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 8;

/// Handle to an open disk log.
pub struct DiskLog {
    path: PathBuf,
    file: Option<File>,
    records_written: usize,
}

impl DiskLog {
    /// Opens (or creates) the log at `path` and feeds every complete record
    /// to `reader` as `(key, value)`.
    ///
    /// Creates the parent directory if needed. Returns the open log and the
    /// number of records read.
    pub fn open_and_read<F>(path: &Path, mut reader: F) -> Result<(Self, usize)>
    where
        F: FnMut(&[u8], &[u8]),
    {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ShaderCacheError::io(parent, e))?;
        }

        let contents = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(ShaderCacheError::io(path, e)),
        };

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(|e| ShaderCacheError::io(path, e))?;

        let mut log = Self {
            path: path.to_path_buf(),
            file: Some(file),
            records_written: 0,
        };

        if contents.is_empty() {
            log.reset()?;
            return Ok((log, 0));
        }

        if let Err(e) = check_header(path, &contents) {
            log::warn!("Discarding shader cache: {e}");
            log.reset()?;
            return Ok((log, 0));
        }

        let mut offset = HEADER_LEN;
        let mut read_items = 0;
        while offset < contents.len() {
            let Some((key, value, next)) = parse_record(&contents, offset) else {
                log::warn!(
                    "Truncated record at byte {offset} in {}, dropping {} trailing bytes",
                    path.display(),
                    contents.len() - offset
                );
                log.truncate(offset as u64)?;
                break;
            };
            reader(key, value);
            read_items += 1;
            offset = next;
        }

        Ok((log, read_items))
    }

    /// Appends one record and syncs it to stable storage.
    pub fn append(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let key_len = record_len(&self.path, key.len())?;
        let value_len = record_len(&self.path, value.len())?;

        let mut record = Vec::with_capacity(8 + key.len() + value.len());
        record.extend_from_slice(&key_len.to_le_bytes());
        record.extend_from_slice(key);
        record.extend_from_slice(&value_len.to_le_bytes());
        record.extend_from_slice(value);

        let file = self.file.as_mut().ok_or(ShaderCacheError::LogClosed)?;
        file.write_all(&record)
            .map_err(|e| ShaderCacheError::io(&self.path, e))?;
        self.records_written += 1;
        self.sync()
    }

    /// Flushes written data to disk.
    pub fn sync(&mut self) -> Result<()> {
        let file = self.file.as_mut().ok_or(ShaderCacheError::LogClosed)?;
        file.flush()
            .and_then(|()| file.sync_data())
            .map_err(|e| ShaderCacheError::io(&self.path, e))
    }

    /// Syncs and releases the file handle. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.file.is_none() {
            return Ok(());
        }
        let result = self.sync();
        self.file = None;
        result
    }

    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended since the log was opened.
    #[inline]
    #[must_use]
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Empties the file and writes a fresh header.
    fn reset(&mut self) -> Result<()> {
        self.truncate(0)?;
        let mut header = [0u8; HEADER_LEN];
        header[..4].copy_from_slice(&LOG_MAGIC);
        header[4..].copy_from_slice(&LOG_FORMAT_VERSION.to_le_bytes());
        let file = self.file.as_mut().ok_or(ShaderCacheError::LogClosed)?;
        file.write_all(&header)
            .map_err(|e| ShaderCacheError::io(&self.path, e))?;
        self.sync()
    }

    fn truncate(&mut self, len: u64) -> Result<()> {
        let file = self.file.as_mut().ok_or(ShaderCacheError::LogClosed)?;
        file.set_len(len)
            .map_err(|e| ShaderCacheError::io(&self.path, e))
    }
}

impl Drop for DiskLog {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Failed to close shader cache: {e}");
        }
    }
}

fn check_header(path: &Path, contents: &[u8]) -> Result<()> {
    if contents.len() < HEADER_LEN {
        return Err(ShaderCacheError::InvalidHeader {
            path: path.to_path_buf(),
            reason: format!("file is only {} bytes", contents.len()),
        });
    }
    if contents[..4] != LOG_MAGIC {
        return Err(ShaderCacheError::InvalidHeader {
            path: path.to_path_buf(),
            reason: "missing magic bytes".to_string(),
        });
    }
    let version = read_u32(contents, 4).unwrap_or_default();
    if version != LOG_FORMAT_VERSION {
        return Err(ShaderCacheError::VersionMismatch {
            path: path.to_path_buf(),
            expected: LOG_FORMAT_VERSION,
            actual: version,
        });
    }
    Ok(())
}

/// Parses the record at `offset`, returning `(key, value, next_offset)`, or
/// `None` if the record runs past the end of the buffer.
fn parse_record(contents: &[u8], offset: usize) -> Option<(&[u8], &[u8], usize)> {
    let key_len = read_u32(contents, offset)? as usize;
    let key_start = offset + 4;
    let key_end = key_start.checked_add(key_len)?;
    let value_len = read_u32(contents, key_end)? as usize;
    let value_start = key_end + 4;
    let value_end = value_start.checked_add(value_len)?;
    if value_end > contents.len() {
        return None;
    }
    Some((
        &contents[key_start..key_end],
        &contents[value_start..value_end],
        value_end,
    ))
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    let raw: [u8; 4] = bytes.get(offset..end)?.try_into().ok()?;
    Some(u32::from_le_bytes(raw))
}

fn record_len(path: &Path, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        ShaderCacheError::io(
            path,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("record field of {len} bytes exceeds the log format limit"),
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(path: &Path) -> (DiskLog, Vec<(Vec<u8>, Vec<u8>)>) {
        let mut records = Vec::new();
        let (log, count) =
            DiskLog::open_and_read(path, |k, v| records.push((k.to_vec(), v.to_vec()))).unwrap();
        assert_eq!(count, records.len());
        (log, records)
    }

    #[test]
    fn creates_directory_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/ShaderCache/dx9-test-ps.cache");
        let (log, records) = collect(&path);
        assert!(records.is_empty());
        assert!(log.is_open());
        drop(log);

        let raw = std::fs::read(&path).unwrap();
        assert_eq!(raw.len(), HEADER_LEN);
        assert_eq!(&raw[..4], b"MPSC");
    }

    #[test]
    fn appended_records_are_read_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.cache");
        {
            let (mut log, _) = collect(&path);
            log.append(b"key-one!", b"bytecode 1").unwrap();
            log.append(b"key-two!", b"").unwrap();
            assert_eq!(log.records_written(), 2);
            log.close().unwrap();
        }

        let (_log, records) = collect(&path);
        assert_eq!(
            records,
            vec![
                (b"key-one!".to_vec(), b"bytecode 1".to_vec()),
                (b"key-two!".to_vec(), Vec::new()),
            ]
        );
    }

    #[test]
    fn torn_tail_is_truncated_and_appends_stay_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.cache");
        {
            let (mut log, _) = collect(&path);
            log.append(b"key-one!", b"good").unwrap();
        }
        let good_len = std::fs::metadata(&path).unwrap().len();

        // Simulate a crash in the middle of the second record.
        let mut raw = std::fs::read(&path).unwrap();
        raw.extend_from_slice(&8u32.to_le_bytes());
        raw.extend_from_slice(b"key-");
        std::fs::write(&path, &raw).unwrap();

        {
            let (mut log, records) = collect(&path);
            assert_eq!(records.len(), 1);
            assert_eq!(std::fs::metadata(&path).unwrap().len(), good_len);
            log.append(b"key-two!", b"also good").unwrap();
        }

        let (_log, records) = collect(&path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].1, b"also good");
    }

    #[test]
    fn foreign_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.cache");
        std::fs::write(&path, b"garbage that is not a shader log").unwrap();

        let (_log, records) = collect(&path);
        assert!(records.is_empty());
        assert_eq!(std::fs::read(&path).unwrap().len(), HEADER_LEN);
    }

    #[test]
    fn version_mismatch_is_detected() {
        let mut raw = LOG_MAGIC.to_vec();
        raw.extend_from_slice(&99u32.to_le_bytes());
        let err = check_header(Path::new("old.cache"), &raw).unwrap_err();
        assert!(matches!(
            err,
            ShaderCacheError::VersionMismatch { actual: 99, .. }
        ));
    }

    #[test]
    fn append_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (mut log, _) = collect(&dir.path().join("log.cache"));
        log.close().unwrap();
        log.close().unwrap();
        assert!(matches!(
            log.append(b"k", b"v"),
            Err(ShaderCacheError::LogClosed)
        ));
    }

    #[test]
    fn parse_record_rejects_oversized_lengths() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&u32::MAX.to_le_bytes());
        raw.extend_from_slice(b"tiny");
        assert!(parse_record(&raw, 0).is_none());
    }
}
