//! Collaborator boundaries.
//!
//! The cache neither writes shader code nor talks to a graphics API itself.
//! Both sides are supplied by the host renderer through these traits:
//!
//! | Trait | Responsibility |
//! |-------|----------------|
//! | [`ShaderGenerator`] | render state → shader source text |
//! | [`ShaderBackend`]   | source → bytecode → native handle; binding; constant uploads |
//!
//! Native handles are owned by the cache once [`ShaderBackend::load`] returns
//! them and are handed back exactly once through [`ShaderBackend::release`].

use thiserror::Error;

use crate::settings::ShaderTarget;
use crate::utility::UtilityProgram;

/// Produces pixel shader source for a key's parameters.
pub trait ShaderGenerator {
    /// Generates source for the given texture stage mask and destination
    /// alpha switch. An empty string means generation failed.
    fn generate(&mut self, texture_mask: u32, dst_alpha: bool, target: ShaderTarget) -> String;

    /// Source for a built-in utility program taking `samples` texture
    /// samples per pixel. The default supplies none, leaving every utility
    /// slot empty.
    fn utility_source(
        &mut self,
        program: UtilityProgram,
        samples: u32,
        target: ShaderTarget,
    ) -> String {
        let _ = (program, samples, target);
        String::new()
    }
}

/// Rejection reported by [`ShaderBackend::compile`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Shader compilation failed: {message}")]
pub struct CompileError {
    /// Compiler diagnostics.
    pub message: String,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Native compiler and pipeline binding for one graphics API.
pub trait ShaderBackend {
    /// Activatable program object.
    type Handle;

    /// The API this backend compiles for. Also names the disk log.
    fn target(&self) -> ShaderTarget;

    /// Compiles source text to backend bytecode.
    fn compile(&mut self, source: &str) -> Result<Vec<u8>, CompileError>;

    /// Creates a native program from bytecode. `None` when the backend cannot
    /// allocate one.
    fn load(&mut self, bytecode: &[u8]) -> Option<Self::Handle>;

    /// Binds the program for subsequent draws.
    fn activate(&mut self, handle: &Self::Handle);

    /// Destroys a native program.
    fn release(&mut self, handle: Self::Handle);

    /// Uploads `values` to consecutive constant registers starting at
    /// `first_register`.
    fn upload_constants(&mut self, first_register: usize, values: &[[f32; 4]]);
}
