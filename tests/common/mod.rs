//! Shared test doubles for the shader cache integration tests.

#![allow(dead_code)]

use std::path::Path;

use myth_shader_cache::{
    CompileError, PixelRenderState, ShaderBackend, ShaderCacheSettings, ShaderGenerator,
    ShaderTarget, TextureStages, UtilityProgram,
};
use rustc_hash::FxHashSet;

/// Native program stand-in. Deliberately not `Clone`: the cache must own it.
#[derive(Debug, PartialEq, Eq)]
pub struct MockProgram(pub u32);

/// Backend that "compiles" by prefixing the source and records every call.
#[derive(Debug, Default)]
pub struct MockBackend {
    pub compiles: usize,
    pub loads: usize,
    pub activations: Vec<u32>,
    pub released: Vec<u32>,
    pub uploads: Vec<(usize, usize)>,
    pub live: FxHashSet<u32>,
    pub fail_loads: bool,
    pub next_handle: u32,
}

const BYTECODE_PREFIX: &[u8] = b"BC:";

impl ShaderBackend for MockBackend {
    type Handle = MockProgram;

    fn target(&self) -> ShaderTarget {
        ShaderTarget::Dx9
    }

    fn compile(&mut self, source: &str) -> Result<Vec<u8>, CompileError> {
        self.compiles += 1;
        if source.contains("#error") {
            return Err(CompileError::new("X3000: syntax error"));
        }
        let mut bytecode = BYTECODE_PREFIX.to_vec();
        bytecode.extend_from_slice(source.as_bytes());
        Ok(bytecode)
    }

    fn load(&mut self, bytecode: &[u8]) -> Option<MockProgram> {
        self.loads += 1;
        if self.fail_loads || !bytecode.starts_with(BYTECODE_PREFIX) {
            return None;
        }
        self.next_handle += 1;
        self.live.insert(self.next_handle);
        Some(MockProgram(self.next_handle))
    }

    fn activate(&mut self, handle: &MockProgram) {
        self.activations.push(handle.0);
    }

    fn release(&mut self, handle: MockProgram) {
        assert!(self.live.remove(&handle.0), "double release of {}", handle.0);
        self.released.push(handle.0);
    }

    fn upload_constants(&mut self, first_register: usize, values: &[[f32; 4]]) {
        self.uploads.push((first_register, values.len()));
    }
}

/// Generator producing a deterministic source per key, with knobs for the
/// failure and deduplication scenarios.
#[derive(Debug, Default)]
pub struct MockGenerator {
    pub calls: usize,
    /// Texture masks for which no source is produced.
    pub empty_masks: FxHashSet<u32>,
    /// Texture masks for which the source does not compile.
    pub broken_masks: FxHashSet<u32>,
    /// Ignore the destination alpha switch, so keys differing only in it
    /// generate identical text.
    pub ignore_dst_alpha: bool,
    /// Supply sources for the built-in utility programs.
    pub utility_programs: bool,
}

impl ShaderGenerator for MockGenerator {
    fn generate(&mut self, texture_mask: u32, dst_alpha: bool, target: ShaderTarget) -> String {
        self.calls += 1;
        if self.empty_masks.contains(&texture_mask) {
            return String::new();
        }
        let dst_alpha = dst_alpha && !self.ignore_dst_alpha;
        let mut source = format!("// {target} pixel shader\n");
        source.push_str(&format!("// stages {texture_mask:#04x} dst_alpha {dst_alpha}\n"));
        if self.broken_masks.contains(&texture_mask) {
            source.push_str("#error unsupported stage combination\n");
        }
        source.push_str("void main(out float4 ocol0 : COLOR0) { ocol0 = 0; }\n");
        source
    }

    fn utility_source(&mut self, program: UtilityProgram, samples: u32, target: ShaderTarget) -> String {
        if !self.utility_programs {
            return String::new();
        }
        format!("// {target} {program} program, {samples} samples\nvoid main() {{}}\n")
    }
}

/// Routes `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn settings(dir: &Path) -> ShaderCacheSettings {
    ShaderCacheSettings {
        cache_dir: dir.join("ShaderCache"),
        dump_dir: dir.join("Dump"),
        unique_id: "TEST01".to_string(),
        ..Default::default()
    }
}

pub fn state(mask: u8, dst_alpha: bool) -> PixelRenderState {
    PixelRenderState {
        texture_stages: TextureStages::from_bits_truncate(mask),
        dst_alpha,
        ..Default::default()
    }
}
