//! Error Types
//!
//! This module defines the error types used throughout the shader cache.
//!
//! # Overview
//!
//! Binding a shader never returns an error: a failed generation, compile or
//! load is reported as "no shader bound" and memoized per key. The
//! [`ShaderCacheError`] enum covers the remaining failure modes:
//! - Disk log I/O (creating the cache directory, opening, appending, syncing)
//! - Disk log format problems (foreign or outdated file header)
//! - Constant register indices outside the memo table
//!
//! # Usage
//!
//! All fallible APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, ShaderCacheError>`.
//!
//! ```rust,ignore
//! use myth_shader_cache::errors::Result;
//!
//! fn open_cache() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for the shader cache.
#[derive(Error, Debug)]
pub enum ShaderCacheError {
    // ========================================================================
    // Disk Log Errors
    // ========================================================================
    /// An I/O error occurred while touching a cache or dump file.
    #[error("Shader cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The disk log exists but does not start with a recognised header.
    #[error("Invalid shader cache header in {path}: {reason}")]
    InvalidHeader {
        /// The disk log path.
        path: PathBuf,
        /// Description of the header problem.
        reason: String,
    },

    /// The disk log was written by an incompatible format version.
    #[error("Shader cache version mismatch in {path}: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The disk log path.
        path: PathBuf,
        /// The format version this build writes.
        expected: u32,
        /// The format version found in the file.
        actual: u32,
    },

    /// An append was attempted on a log that has already been closed.
    #[error("Shader cache log is closed")]
    LogClosed,

    // ========================================================================
    // Constant Upload Errors
    // ========================================================================
    /// A constant upload addressed registers past the end of the memo table.
    #[error("Constant registers {first}..{end} out of range (capacity {capacity})")]
    ConstantOutOfRange {
        /// First register of the upload.
        first: usize,
        /// One past the last register of the upload.
        end: usize,
        /// Number of registers tracked by the memo table.
        capacity: usize,
    },
}

impl ShaderCacheError {
    /// Wraps an I/O error with the path it happened on.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Alias for `Result<T, ShaderCacheError>`.
pub type Result<T> = std::result::Result<T, ShaderCacheError>;
