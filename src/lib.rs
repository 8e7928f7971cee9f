//! # Myth Shader Cache
//!
//! Persistent pixel shader artifact cache for Myth rendering backends.
//!
//! Given the pixel pipeline state of a draw, [`ShaderCacheManager`] binds a
//! compiled program while avoiding redundant source generation, redundant
//! compilation and redundant backend calls:
//!
//! - a single-entry fast path skips repeated binds within a frame;
//! - an in-memory table keyed by [`ShaderKey`] holds every compiled program
//!   and remembers failures so they are not retried every frame;
//! - an append-only [`DiskLog`] carries compiled bytecode across runs.
//!
//! A fixed set of [`UtilityPrograms`] (clear, color copy and matrix
//! resolves) is built alongside the table for the host's framebuffer work.
//!
//! Shader source generation and the native compiler are supplied by the host
//! through [`ShaderGenerator`] and [`ShaderBackend`].
//!
//! ```rust,ignore
//! use myth_shader_cache::{PixelRenderState, ShaderCacheManager, ShaderCacheSettings};
//!
//! let mut cache = ShaderCacheManager::init(ShaderCacheSettings::default(), generator, backend)?;
//! for frame in 0.. {
//!     for draw in draws {
//!         if !cache.set_shader(&draw.pixel_state, frame) {
//!             continue; // no usable shader, skip the draw
//!         }
//!         // issue draw
//!     }
//! }
//! let (generator, backend) = cache.shutdown();
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod backend;
pub mod constants;
pub mod disk_log;
pub mod dump;
pub mod errors;
pub mod key;
pub mod manager;
pub mod registry;
pub mod settings;
pub mod stats;
pub mod table;
pub mod utility;

pub use backend::{CompileError, ShaderBackend, ShaderGenerator};
pub use constants::ConstantCache;
pub use disk_log::DiskLog;
pub use errors::{Result, ShaderCacheError};
pub use key::{KEY_SIZE, KeyFlags, PixelRenderState, ShaderKey, TextureStages};
pub use manager::{BindState, NO_SHADER_SOURCE, ShaderCacheManager};
pub use registry::UniqueContentRegistry;
pub use settings::{ShaderCacheSettings, ShaderTarget};
pub use stats::ShaderCacheStats;
pub use table::{CacheEntry, ShaderTable};
pub use utility::{SAMPLE_VARIANTS, UtilityProgram, UtilityPrograms};
