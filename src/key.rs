//! Shader cache keys.
//!
//! A [`ShaderKey`] is the structural fingerprint of the render state that
//! determines which pixel shader is generated. It is a fixed-size `Pod`
//! value: equality, hashing and the on-disk representation are all plain
//! byte comparisons, so identical keys always resolve to the identical
//! compiled artifact, in this process and in the next.
//!
//! Only state that changes the generated *code* belongs in the key. Values
//! uploaded through constant registers ([`PixelRenderState::color_constants`])
//! are deliberately excluded.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

bitflags! {
    /// Texture stages sampled by the pixel pipeline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextureStages: u8 {
        const STAGE0 = 1 << 0;
        const STAGE1 = 1 << 1;
        const STAGE2 = 1 << 2;
        const STAGE3 = 1 << 3;
        const STAGE4 = 1 << 4;
        const STAGE5 = 1 << 5;
        const STAGE6 = 1 << 6;
        const STAGE7 = 1 << 7;
    }
}

bitflags! {
    /// Boolean pipeline switches folded into the key.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyFlags: u32 {
        /// The shader writes destination alpha.
        const DST_ALPHA = 1 << 0;
    }
}

/// Size in bytes of a serialized [`ShaderKey`].
pub const KEY_SIZE: usize = std::mem::size_of::<ShaderKey>();

/// Fixed-size structural fingerprint of the pixel pipeline state.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct ShaderKey {
    texture_mask: u32,
    flags: u32,
}

impl ShaderKey {
    /// A value no key builder can produce: every bit set, including bits
    /// outside [`TextureStages`] and [`KeyFlags`].
    pub const SENTINEL: Self = Self {
        texture_mask: u32::MAX,
        flags: u32::MAX,
    };

    #[inline]
    #[must_use]
    pub fn new(stages: TextureStages, dst_alpha: bool) -> Self {
        let mut flags = KeyFlags::empty();
        flags.set(KeyFlags::DST_ALPHA, dst_alpha);
        Self {
            texture_mask: u32::from(stages.bits()),
            flags: flags.bits(),
        }
    }

    /// Builds the key for the given render state.
    ///
    /// Total and deterministic; reads only the texture stage mask and the
    /// destination alpha switch.
    #[inline]
    #[must_use]
    pub fn from_state(state: &PixelRenderState) -> Self {
        Self::new(state.texture_stages, state.dst_alpha)
    }

    /// Texture stage mask, as passed to the source generator.
    #[inline]
    #[must_use]
    pub fn texture_mask(&self) -> u32 {
        self.texture_mask
    }

    #[inline]
    #[must_use]
    pub fn dst_alpha(&self) -> bool {
        KeyFlags::from_bits_retain(self.flags).contains(KeyFlags::DST_ALPHA)
    }

    /// Whether this key could have come out of the key builder.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.texture_mask <= u32::from(TextureStages::all().bits())
            && KeyFlags::from_bits(self.flags).is_some()
    }

    /// Raw bytes as persisted in the disk log.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Decodes a persisted key.
    ///
    /// Returns `None` when the length is not [`KEY_SIZE`] or the bytes do not
    /// describe a valid key.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != KEY_SIZE {
            return None;
        }
        let key: Self = bytemuck::try_pod_read_unaligned(bytes).ok()?;
        key.is_valid().then_some(key)
    }
}

/// The slice of pixel pipeline state the cache is consulted with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PixelRenderState {
    /// Texture stages enabled for the current draw.
    pub texture_stages: TextureStages,
    /// Whether the draw writes destination alpha.
    pub dst_alpha: bool,
    /// Per-draw color constants. Uploaded through constant registers and
    /// never part of the key.
    pub color_constants: [[f32; 4]; 4],
}
