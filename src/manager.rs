//! Pixel Shader Cache Manager
//!
//! Owns the whole cache session: the in-memory [`ShaderTable`], the
//! [`DiskLog`], the unique-content registry, the constant upload memo and the
//! statistics counters, together with the host's [`ShaderGenerator`] and
//! [`ShaderBackend`].
//!
//! ## Binding a shader
//!
//! [`ShaderCacheManager::set_shader`] is called once per draw and walks the
//! tiers from cheapest to most expensive:
//!
//! | Tier | Condition | Cost |
//! |------|-----------|------|
//! | fast path | same key already bound on this frame | key build + compare |
//! | table hit | entry with a handle | hash lookup + activate |
//! | remembered failure | entry without a handle | hash lookup |
//! | miss | no entry | generate + compile + disk append + activate |
//!
//! The fast path requires the bind to have happened on the *current* frame:
//! other code may rebind the pipeline between frames.
//!
//! ## Session lifecycle
//!
//! [`ShaderCacheManager::init`] starts a session, builds the
//! [`UtilityPrograms`] and reloads every artifact from the disk log without
//! binding any of them. A disk log that cannot be opened is logged and the
//! session runs memory-only. [`ShaderCacheManager::shutdown`] releases every
//! native handle, closes the log and hands the collaborators back so a new
//! session can be started with them.

use crate::backend::{ShaderBackend, ShaderGenerator};
use crate::constants::ConstantCache;
use crate::disk_log::DiskLog;
use crate::dump::ShaderDumper;
use crate::errors::Result;
use crate::key::{KEY_SIZE, PixelRenderState, ShaderKey};
use crate::registry::UniqueContentRegistry;
use crate::settings::ShaderCacheSettings;
use crate::stats::ShaderCacheStats;
use crate::table::{CacheEntry, ShaderTable};
use crate::utility::{UtilityProgram, UtilityPrograms};

/// What [`ShaderCacheManager::current_shader_source`] reports when no
/// source is available.
pub const NO_SHADER_SOURCE: &str = "(no shader)";

/// Binding state as seen by the fast path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindState {
    /// No shader has been bound since the last init or clear, or the last
    /// request failed.
    Unbound,
    /// `key` was bound on `frame`.
    Bound { key: ShaderKey, frame: u64 },
}

/// Single-entry memo of the last requested key, kept outside the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FastPathMemo {
    key: ShaderKey,
    bound_frame: Option<u64>,
}

impl FastPathMemo {
    const RESET: Self = Self {
        key: ShaderKey::SENTINEL,
        bound_frame: None,
    };

    #[inline]
    fn matches(&self, key: &ShaderKey, frame: u64) -> bool {
        self.key == *key && self.bound_frame == Some(frame)
    }
}

/// Pixel shader artifact cache for one backend.
pub struct ShaderCacheManager<G, B>
where
    G: ShaderGenerator,
    B: ShaderBackend,
{
    settings: ShaderCacheSettings,
    generator: G,
    backend: B,

    table: ShaderTable<B::Handle>,
    utility: UtilityPrograms<B::Handle>,
    registry: UniqueContentRegistry,
    disk_log: Option<DiskLog>,
    memo: FastPathMemo,

    constants: ConstantCache,
    dumper: ShaderDumper,
    stats: ShaderCacheStats,
}

impl<G, B> ShaderCacheManager<G, B>
where
    G: ShaderGenerator,
    B: ShaderBackend,
{
    /// Starts a cache session.
    ///
    /// Builds the utility programs. When the disk cache is enabled, creates
    /// the cache directory if needed and loads every persisted artifact into
    /// the table. Loaded entries are not bound and do not touch the fast
    /// path. Disk cache I/O failures are logged, never returned.
    pub fn init(settings: ShaderCacheSettings, mut generator: G, mut backend: B) -> Result<Self> {
        let utility = UtilityPrograms::build(&mut generator, &mut backend);
        let mut manager = Self {
            constants: ConstantCache::new(settings.constant_registers),
            dumper: ShaderDumper::new(settings.dump_dir.clone()),
            settings,
            generator,
            backend,
            table: ShaderTable::new(),
            utility,
            registry: UniqueContentRegistry::new(),
            disk_log: None,
            memo: FastPathMemo::RESET,
            stats: ShaderCacheStats::default(),
        };

        if manager.settings.use_disk_cache {
            let path = manager
                .settings
                .disk_cache_path(manager.backend.target().as_str());
            match DiskLog::open_and_read(&path, |key, bytecode| manager.load_record(key, bytecode)) {
                Ok((disk_log, read_items)) => {
                    log::info!(
                        "Loaded {read_items} pixel shader records from {} ({} usable)",
                        path.display(),
                        manager.stats.artifacts_alive
                    );
                    manager.disk_log = Some(disk_log);
                }
                Err(e) => log::warn!("Pixel shader disk cache unavailable, running memory-only: {e}"),
            }
        }

        if manager.settings.diagnostics_enabled() {
            log::info!(
                "Dumping pixel shaders to {}",
                manager.settings.dump_dir().display()
            );
        }

        Ok(manager)
    }

    /// Binds the pixel shader for `state` on `frame`.
    ///
    /// Returns `false` when no shader could be bound; the failure is
    /// remembered per key and not retried until [`clear`](Self::clear).
    pub fn set_shader(&mut self, state: &PixelRenderState, frame: u64) -> bool {
        let key = ShaderKey::from_state(state);

        if self.memo.matches(&key, frame) {
            return true;
        }

        self.memo = FastPathMemo {
            key,
            bound_frame: None,
        };

        if let Some(entry) = self.table.lookup_mut(&key) {
            if !entry.is_valid() {
                return false;
            }
            entry.stamp(frame);
            if let Some(handle) = entry.handle() {
                self.backend.activate(handle);
            }
            self.memo.bound_frame = Some(frame);
            return true;
        }

        self.compile_and_insert(key, frame)
    }

    /// Creates a native program from `bytecode` and stores it under `key`,
    /// replacing (and releasing) any previous entry.
    ///
    /// With `activate_on = Some(frame)` the program is also bound and becomes
    /// the fast-path memo. Returns whether a live handle resulted; a failed
    /// load is stored as a remembered failure.
    pub fn insert_bytecode(
        &mut self,
        key: ShaderKey,
        bytecode: &[u8],
        activate_on: Option<u64>,
    ) -> bool {
        let handle = self.backend.load(bytecode);
        self.store(key, handle, None, activate_on)
    }

    /// Releases every native handle and resets all session state: table,
    /// unique-content registry, fast-path memo, constant memo and counters.
    ///
    /// The disk log stays open; keys compiled before the clear are
    /// regenerated on their next request.
    pub fn clear(&mut self) {
        let backend = &mut self.backend;
        let released = self.table.clear(|handle| backend.release(handle));
        self.registry.clear();
        self.memo = FastPathMemo::RESET;
        self.constants.reset();
        self.stats.reset();
        log::debug!("Pixel shader cache cleared, {released} programs released");
    }

    /// Ends the session: releases every native handle (utility programs
    /// included), syncs and closes the disk log and returns the collaborators.
    ///
    /// Dropping the manager instead drops stored handles without passing them
    /// to [`ShaderBackend::release`].
    pub fn shutdown(mut self) -> (G, B) {
        log::info!("Pixel shader cache shutdown: {}", self.stats);
        self.clear();
        let backend = &mut self.backend;
        self.utility.release_all(|handle| backend.release(handle));
        if let Some(mut disk_log) = self.disk_log.take()
            && let Err(e) = disk_log.close()
        {
            log::warn!("Failed to close pixel shader cache: {e}");
        }
        (self.generator, self.backend)
    }

    // ── Constant uploads ────────────────────────────────────────────────────

    /// Uploads one constant register unless it already holds `value`.
    /// Returns whether the backend was called.
    pub fn set_constant4f(&mut self, register: usize, value: [f32; 4]) -> Result<bool> {
        let backend = &mut self.backend;
        self.constants
            .set(register, value, |first, values| backend.upload_constants(first, values))
    }

    /// Uploads a batch of constant registers unless the whole range already
    /// holds `values`. Returns whether the backend was called.
    pub fn set_multi_constant4fv(&mut self, first: usize, values: &[[f32; 4]]) -> Result<bool> {
        let backend = &mut self.backend;
        self.constants
            .set_range(first, values, |first, values| backend.upload_constants(first, values))
    }

    // ── Utility programs ────────────────────────────────────────────────────

    /// Built-in utility program for a supersampling mode (wrapped modulo 3).
    #[inline]
    #[must_use]
    pub fn utility_program(&self, program: UtilityProgram, ssaa_mode: usize) -> Option<&B::Handle> {
        self.utility.get(program, ssaa_mode)
    }

    #[inline]
    #[must_use]
    pub fn clear_program(&self) -> Option<&B::Handle> {
        self.utility.get(UtilityProgram::Clear, 0)
    }

    #[inline]
    #[must_use]
    pub fn color_copy_program(&self, ssaa_mode: usize) -> Option<&B::Handle> {
        self.utility.get(UtilityProgram::ColorCopy, ssaa_mode)
    }

    #[inline]
    #[must_use]
    pub fn color_matrix_program(&self, ssaa_mode: usize) -> Option<&B::Handle> {
        self.utility.get(UtilityProgram::ColorMatrix, ssaa_mode)
    }

    #[inline]
    #[must_use]
    pub fn depth_matrix_program(&self, ssaa_mode: usize) -> Option<&B::Handle> {
        self.utility.get(UtilityProgram::DepthMatrix, ssaa_mode)
    }

    /// Binds a utility program. Returns `false` if it was not built.
    ///
    /// The keyed shader is no longer bound afterwards, so the next
    /// [`set_shader`](Self::set_shader) rebinds even on the same frame.
    pub fn activate_utility(&mut self, program: UtilityProgram, ssaa_mode: usize) -> bool {
        let Some(handle) = self.utility.get(program, ssaa_mode) else {
            return false;
        };
        self.backend.activate(handle);
        self.memo.bound_frame = None;
        true
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn stats(&self) -> &ShaderCacheStats {
        &self.stats
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ShaderCacheSettings {
        &self.settings
    }

    #[must_use]
    pub fn bind_state(&self) -> BindState {
        match self.memo.bound_frame {
            Some(frame) => BindState::Bound {
                key: self.memo.key,
                frame,
            },
            None => BindState::Unbound,
        }
    }

    #[inline]
    #[must_use]
    pub fn lookup(&self, key: &ShaderKey) -> Option<&CacheEntry<B::Handle>> {
        self.table.lookup(key)
    }

    /// Number of table entries, remembered failures included.
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.table.len()
    }

    /// Source of the most recently requested shader, if it was retained.
    #[must_use]
    pub fn current_shader_source(&self) -> &str {
        self.table
            .lookup(&self.memo.key)
            .and_then(CacheEntry::source)
            .unwrap_or(NO_SHADER_SOURCE)
    }

    #[inline]
    #[must_use]
    pub fn disk_log(&self) -> Option<&DiskLog> {
        self.disk_log.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn generator(&self) -> &G {
        &self.generator
    }

    #[inline]
    pub fn generator_mut(&mut self) -> &mut G {
        &mut self.generator
    }

    #[inline]
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    // ── Internal helpers ────────────────────────────────────────────────────

    fn compile_and_insert(&mut self, key: ShaderKey, frame: u64) -> bool {
        let target = self.backend.target();
        let source = self
            .generator
            .generate(key.texture_mask(), key.dst_alpha(), target);

        if source.is_empty() {
            log::warn!("Pixel shader generation produced no code for {key:?}");
            return self.remember_failure(key, None);
        }

        self.registry.register(&source);
        self.stats.unique_artifacts_generated = self.registry.len();

        if self.settings.dump_shaders
            && let Err(e) = self.dumper.dump_generated(&source)
        {
            log::warn!("Failed to dump pixel shader: {e}");
        }

        let bytecode = match self.backend.compile(&source) {
            Ok(bytecode) => bytecode,
            Err(e) => {
                if self.settings.dump_failed_shaders {
                    log::error!("Failed to compile pixel shader {key:?}: {e}\n\n{source}");
                    if let Err(e) = self.dumper.dump_failed(&source) {
                        log::warn!("Failed to dump pixel shader: {e}");
                    }
                } else {
                    log::warn!("Failed to compile pixel shader {key:?}: {e}");
                }
                return self.remember_failure(key, Some(source));
            }
        };

        if let Some(disk_log) = self.disk_log.as_mut()
            && let Err(e) = disk_log.append(key.as_bytes(), &bytecode)
        {
            log::warn!("Failed to persist pixel shader {key:?}: {e}");
        }

        let handle = self.backend.load(&bytecode);
        if handle.is_none() {
            log::warn!(
                "Backend could not create pixel shader {key:?} from {} bytes of bytecode",
                bytecode.len()
            );
            self.stats.compile_failures += 1;
        }
        let source = self.settings.keep_source.then_some(source);
        self.store(key, handle, source, Some(frame))
    }

    fn remember_failure(&mut self, key: ShaderKey, source: Option<String>) -> bool {
        let source = source.filter(|_| self.settings.keep_source);
        self.stats.compile_failures += 1;
        self.store(key, None, source, None)
    }

    /// Single insertion point into the table; keeps counters, activation and
    /// the fast-path memo consistent.
    fn store(
        &mut self,
        key: ShaderKey,
        handle: Option<B::Handle>,
        source: Option<String>,
        activate_on: Option<u64>,
    ) -> bool {
        let valid = handle.is_some();
        let backend = &mut self.backend;
        let mut replaced = false;

        let entry = self.table.insert(
            key,
            handle,
            source,
            activate_on.filter(|_| valid),
            |old| {
                backend.release(old);
                replaced = true;
            },
        );

        if valid {
            self.stats.artifacts_created += 1;
            self.stats.artifacts_alive += 1;
        }
        if replaced {
            self.stats.artifacts_alive -= 1;
        }

        if let (Some(frame), Some(handle)) = (activate_on, entry.handle()) {
            backend.activate(handle);
            self.memo = FastPathMemo {
                key,
                bound_frame: Some(frame),
            };
        } else if self.memo.key == key {
            // The bound program for this key was just replaced.
            self.memo.bound_frame = None;
        }

        debug_assert_eq!(self.table.live_count(), self.stats.artifacts_alive);
        valid
    }

    fn load_record(&mut self, key_bytes: &[u8], bytecode: &[u8]) {
        let Some(key) = ShaderKey::from_bytes(key_bytes) else {
            log::warn!(
                "Skipping pixel shader cache record with a malformed key ({} bytes, expected {KEY_SIZE})",
                key_bytes.len()
            );
            return;
        };
        match self.backend.load(bytecode) {
            Some(handle) => {
                self.store(key, Some(handle), None, None);
            }
            None => log::warn!("Skipping pixel shader cache record {key:?}: bytecode rejected"),
        }
    }
}
