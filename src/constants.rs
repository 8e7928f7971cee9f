//! Pixel shader constant upload memo.
//!
//! Keeps the last value written to every constant register and drops
//! uploads that would not change anything. Comparisons are bit-exact
//! (`-0.0` differs from `0.0`, identical NaN payloads compare equal), so a
//! skipped upload is always indistinguishable from a performed one.
//!
//! Batched uploads are all-or-nothing: a batch is skipped only if the whole
//! register range already holds the requested values.

use crate::errors::{Result, ShaderCacheError};

/// Value every slot holds after a reset. Chosen so that realistic first
/// uploads never match it.
pub const CONSTANT_SENTINEL: f32 = -100_000_000.0;

/// Write-through cache of constant register contents.
#[derive(Debug, Clone)]
pub struct ConstantCache {
    registers: Vec<[f32; 4]>,
}

impl ConstantCache {
    #[must_use]
    pub fn new(register_count: usize) -> Self {
        Self {
            registers: vec![[CONSTANT_SENTINEL; 4]; register_count],
        }
    }

    /// Number of tracked registers.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.registers.len()
    }

    /// Forgets every stored value.
    pub fn reset(&mut self) {
        self.registers.fill([CONSTANT_SENTINEL; 4]);
    }

    /// Last value recorded for `register`.
    #[must_use]
    pub fn get(&self, register: usize) -> Option<[f32; 4]> {
        self.registers.get(register).copied()
    }

    /// Records a single-register upload.
    ///
    /// Calls `upload` and returns `true` when the value differs from the
    /// stored one; returns `false` without calling it otherwise.
    pub fn set(
        &mut self,
        register: usize,
        value: [f32; 4],
        upload: impl FnOnce(usize, &[[f32; 4]]),
    ) -> Result<bool> {
        self.set_range(register, std::slice::from_ref(&value), upload)
    }

    /// Records a batched upload starting at `first`.
    ///
    /// The batch is uploaded in full unless every register in the range
    /// already holds the requested value.
    pub fn set_range(
        &mut self,
        first: usize,
        values: &[[f32; 4]],
        upload: impl FnOnce(usize, &[[f32; 4]]),
    ) -> Result<bool> {
        let capacity = self.capacity();
        let end = first.saturating_add(values.len());
        let Some(slots) = self.registers.get_mut(first..end) else {
            return Err(ShaderCacheError::ConstantOutOfRange {
                first,
                end,
                capacity,
            });
        };

        if bits_equal(slots, values) {
            return Ok(false);
        }

        slots.copy_from_slice(values);
        upload(first, values);
        Ok(true)
    }
}

fn bits_equal(a: &[[f32; 4]], b: &[[f32; 4]]) -> bool {
    bytemuck::cast_slice::<[f32; 4], u8>(a) == bytemuck::cast_slice::<[f32; 4], u8>(b)
}
