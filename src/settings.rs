//! Shader Cache Settings
//!
//! Runtime configuration for [`ShaderCacheManager`](crate::ShaderCacheManager).
//!
//! Diagnostic behaviour (dumping generated sources, keeping source text in
//! cache entries) is controlled here at runtime rather than through build
//! configuration, so every code path is reachable from tests.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_shader_cache::{ShaderCacheSettings, ShaderTarget};
//!
//! let settings = ShaderCacheSettings {
//!     cache_dir: "user/ShaderCache".into(),
//!     unique_id: "GALE01".into(),
//!     dump_failed_shaders: true,
//!     ..Default::default()
//! };
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default number of pixel shader constant registers tracked by the
/// constant upload memo.
pub const DEFAULT_CONSTANT_REGISTERS: usize = 224;

// ---------------------------------------------------------------------------
// ShaderTarget
// ---------------------------------------------------------------------------

/// The backend API a generated shader is written for.
///
/// Passed through to the source generator and used to name the disk log, so
/// artifacts compiled for one backend are never loaded by another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderTarget {
    /// Direct3D 9 pixel shaders (HLSL, `ps_2_0`+ bytecode).
    #[default]
    Dx9,
    /// Direct3D 11 pixel shaders.
    Dx11,
    /// OpenGL fragment programs.
    OpenGl,
}

impl ShaderTarget {
    /// Short name used in disk log file names.
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dx9 => "dx9",
            Self::Dx11 => "dx11",
            Self::OpenGl => "ogl",
        }
    }
}

impl std::fmt::Display for ShaderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ShaderCacheSettings
// ---------------------------------------------------------------------------

/// Configuration for a shader cache session.
///
/// Every field has a default, so partial JSON documents deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderCacheSettings {
    /// Directory holding the persistent disk logs. Created at init if absent.
    pub cache_dir: PathBuf,

    /// Directory receiving diagnostic shader dumps.
    pub dump_dir: PathBuf,

    /// Content/session identifier (e.g. a game id) used in the log file name.
    pub unique_id: String,

    /// Whether to open a disk log at init. When `false` the cache lives in
    /// memory only.
    pub use_disk_cache: bool,

    /// Write every generated source to `dump_dir/ps_NNNN.txt`.
    pub dump_shaders: bool,

    /// Log failing sources and write them to `dump_dir/BADps_NNNN.txt`.
    pub dump_failed_shaders: bool,

    /// Retain generated source text in cache entries.
    pub keep_source: bool,

    /// Number of constant registers tracked by the constant upload memo.
    pub constant_registers: usize,
}

impl Default for ShaderCacheSettings {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("ShaderCache"),
            dump_dir: PathBuf::from("Dump"),
            unique_id: "default".to_string(),
            use_disk_cache: true,
            dump_shaders: false,
            dump_failed_shaders: false,
            keep_source: false,
            constant_registers: DEFAULT_CONSTANT_REGISTERS,
        }
    }
}

impl ShaderCacheSettings {
    /// Returns the disk log path for the given backend:
    /// `<cache_dir>/<backend>-<unique_id>-ps.cache`.
    #[must_use]
    pub fn disk_cache_path(&self, backend_name: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{backend_name}-{}-ps.cache", self.unique_id))
    }

    /// Returns the directory used for diagnostic dumps.
    #[inline]
    #[must_use]
    pub fn dump_dir(&self) -> &Path {
        &self.dump_dir
    }

    /// Whether any diagnostics sink is enabled.
    #[inline]
    #[must_use]
    pub fn diagnostics_enabled(&self) -> bool {
        self.dump_shaders || self.dump_failed_shaders
    }
}
