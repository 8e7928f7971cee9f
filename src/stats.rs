//! Shader cache statistics.
//!
//! Counters updated as side effects of cache operations and read by whatever
//! statistics overlay the host renderer shows.

/// Snapshot of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShaderCacheStats {
    /// Native programs created since the last reset, disk loads included.
    pub artifacts_created: usize,
    /// Native programs currently held by the cache.
    pub artifacts_alive: usize,
    /// Textually distinct sources generated since the last reset.
    pub unique_artifacts_generated: usize,
    /// Keys whose generation or compilation failed since the last reset.
    pub compile_failures: usize,
}

impl ShaderCacheStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl std::fmt::Display for ShaderCacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pixel shaders: {} created, {} alive, {} unique, {} failed",
            self.artifacts_created,
            self.artifacts_alive,
            self.unique_artifacts_generated,
            self.compile_failures
        )
    }
}
