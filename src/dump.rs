//! Diagnostic shader dumps.
//!
//! Writes generated sources to the dump directory as numbered text files:
//! `ps_0000.txt`, `ps_0001.txt`, … for every generated shader and
//! `BADps_0000.txt`, … for shaders that failed to compile. Each series has
//! its own counter, which only ever increases for the lifetime of the dumper.

use std::path::{Path, PathBuf};

use crate::errors::{Result, ShaderCacheError};

/// Numbered file writer for generated shader sources.
#[derive(Debug)]
pub struct ShaderDumper {
    dir: PathBuf,
    next_generated: u32,
    next_failed: u32,
}

impl ShaderDumper {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next_generated: 0,
            next_failed: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes a generated source. Returns the file written.
    pub fn dump_generated(&mut self, source: &str) -> Result<PathBuf> {
        let name = format!("ps_{:04}.txt", self.next_generated);
        self.next_generated += 1;
        self.write(&name, source)
    }

    /// Writes a source that failed to compile. Returns the file written.
    pub fn dump_failed(&mut self, source: &str) -> Result<PathBuf> {
        let name = format!("BADps_{:04}.txt", self.next_failed);
        self.next_failed += 1;
        self.write(&name, source)
    }

    fn write(&self, name: &str, source: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| ShaderCacheError::io(&self.dir, e))?;
        let path = self.dir.join(name);
        std::fs::write(&path, source).map_err(|e| ShaderCacheError::io(&path, e))?;
        Ok(path)
    }
}
