//! Built-in utility programs.
//!
//! Besides the keyed table, a session owns a fixed set of helper programs
//! used by the host for framebuffer work: a clear program and, in one
//! variant per supersampling level, color copy, color matrix and depth
//! matrix programs. They are compiled once at init from sources supplied by
//! the [`ShaderGenerator`], live outside the table (so [`clear`] leaves them
//! alone) and are released at shutdown.
//!
//! Supersampling variants are selected by `ssaa_mode % 3`:
//!
//! | Variant | Samples |
//! |---------|---------|
//! | 0 | 1 |
//! | 1 | 4 |
//! | 2 | 9 |
//!
//! [`clear`]: crate::ShaderCacheManager::clear

use std::fmt;

use crate::backend::{ShaderBackend, ShaderGenerator};

/// Number of supersampling variants per multi-sample utility program.
pub const SAMPLE_VARIANTS: usize = 3;

/// Texture samples taken by each supersampling variant.
pub const VARIANT_SAMPLES: [u32; SAMPLE_VARIANTS] = [1, 4, 9];

/// The kinds of built-in utility program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UtilityProgram {
    /// Outputs the interpolated vertex color. Single variant.
    Clear,
    /// Copies or resolves the color buffer.
    ColorCopy,
    /// Resolves color and applies the color matrix.
    ColorMatrix,
    /// Resolves and re-encodes depth, then applies the color matrix.
    DepthMatrix,
}

impl UtilityProgram {
    pub const ALL: [Self; 4] = [
        Self::Clear,
        Self::ColorCopy,
        Self::ColorMatrix,
        Self::DepthMatrix,
    ];

    /// Number of supersampling variants compiled for this program.
    #[must_use]
    pub fn variant_count(self) -> usize {
        match self {
            Self::Clear => 1,
            Self::ColorCopy | Self::ColorMatrix | Self::DepthMatrix => SAMPLE_VARIANTS,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::ColorCopy => "color copy",
            Self::ColorMatrix => "color matrix",
            Self::DepthMatrix => "depth matrix",
        }
    }
}

impl fmt::Display for UtilityProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiled utility programs. Slots whose source was empty or failed to
/// build stay empty.
#[derive(Debug)]
pub struct UtilityPrograms<H> {
    clear: Option<H>,
    color_copy: [Option<H>; SAMPLE_VARIANTS],
    color_matrix: [Option<H>; SAMPLE_VARIANTS],
    depth_matrix: [Option<H>; SAMPLE_VARIANTS],
}

impl<H> Default for UtilityPrograms<H> {
    fn default() -> Self {
        Self {
            clear: None,
            color_copy: [None, None, None],
            color_matrix: [None, None, None],
            depth_matrix: [None, None, None],
        }
    }
}

impl<H> UtilityPrograms<H> {
    /// Compiles and loads every utility program variant.
    ///
    /// Failures are logged and leave the slot empty; they never abort.
    pub fn build<G, B>(generator: &mut G, backend: &mut B) -> Self
    where
        G: ShaderGenerator,
        B: ShaderBackend<Handle = H>,
    {
        let mut programs = Self::default();
        let target = backend.target();

        for program in UtilityProgram::ALL {
            for variant in 0..program.variant_count() {
                let samples = VARIANT_SAMPLES[variant];
                let source = generator.utility_source(program, samples, target);
                if source.is_empty() {
                    continue;
                }
                let handle = match backend.compile(&source) {
                    Ok(bytecode) => backend.load(&bytecode),
                    Err(e) => {
                        log::warn!("Failed to compile {program} program ({samples} samples): {e}");
                        continue;
                    }
                };
                if handle.is_none() {
                    log::warn!("Backend could not create {program} program ({samples} samples)");
                }
                *programs.slot_mut(program, variant) = handle;
            }
        }

        log::debug!("Built {} utility pixel programs", programs.loaded_count());
        programs
    }

    /// The program of the given kind for a supersampling mode. The mode
    /// wraps modulo [`SAMPLE_VARIANTS`]; it is ignored for
    /// [`UtilityProgram::Clear`].
    #[must_use]
    pub fn get(&self, program: UtilityProgram, ssaa_mode: usize) -> Option<&H> {
        let variant = ssaa_mode % SAMPLE_VARIANTS;
        match program {
            UtilityProgram::Clear => self.clear.as_ref(),
            UtilityProgram::ColorCopy => self.color_copy[variant].as_ref(),
            UtilityProgram::ColorMatrix => self.color_matrix[variant].as_ref(),
            UtilityProgram::DepthMatrix => self.depth_matrix[variant].as_ref(),
        }
    }

    /// Number of slots holding a native program.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        std::iter::once(&self.clear)
            .chain(&self.color_copy)
            .chain(&self.color_matrix)
            .chain(&self.depth_matrix)
            .filter(|slot| slot.is_some())
            .count()
    }

    /// Hands every program to `release` and empties all slots. Returns the
    /// number released.
    pub fn release_all(&mut self, mut release: impl FnMut(H)) -> usize {
        let mut released = 0;
        let slots = std::iter::once(&mut self.clear)
            .chain(&mut self.color_copy)
            .chain(&mut self.color_matrix)
            .chain(&mut self.depth_matrix);
        for slot in slots {
            if let Some(handle) = slot.take() {
                release(handle);
                released += 1;
            }
        }
        released
    }

    fn slot_mut(&mut self, program: UtilityProgram, variant: usize) -> &mut Option<H> {
        match program {
            UtilityProgram::Clear => &mut self.clear,
            UtilityProgram::ColorCopy => &mut self.color_copy[variant],
            UtilityProgram::ColorMatrix => &mut self.color_matrix[variant],
            UtilityProgram::DepthMatrix => &mut self.depth_matrix[variant],
        }
    }
}
