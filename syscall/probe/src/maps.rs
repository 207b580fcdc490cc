//! Shared tables of the probe
//!
//! Every table is a sharded concurrent map: single-key operations are
//! atomic, the last writer wins on a key, and readers never block on a
//! global lock.

use ahash::RandomState;
use dashmap::{mapref::entry::Entry, DashMap};
use hijack_common::{
    HookCtxKey, HookCtxValue, TraceObjectKey, TraceObjectValue, TracingConfig,
    MAX_HOOK_CONTEXTS, MAX_TRACED_PROCESSES, MAX_TRACE_OBJECTS,
};
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-process tracing config
///
/// Key: tgid
/// Value: TracingConfig
///
/// Written by the control surface, read on every observation.
pub struct ConfigMap {
    inner: DashMap<u32, TracingConfig, RandomState>,
}

impl ConfigMap {
    pub fn new() -> Self {
        Self {
            inner: DashMap::with_capacity_and_hasher(MAX_TRACED_PROCESSES, RandomState::new()),
        }
    }

    pub fn get(&self, tgid: u32) -> Option<TracingConfig> {
        self.inner.get(&tgid).map(|cfg| *cfg)
    }

    pub fn insert(&self, tgid: u32, config: TracingConfig) {
        self.inner.insert(tgid, config);
    }

    pub fn remove(&self, tgid: u32) -> Option<TracingConfig> {
        self.inner.remove(&tgid).map(|(_, cfg)| cfg)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for ConfigMap {
    fn default() -> Self {
        Self::new()
    }
}

/// In-flight syscall invocations
///
/// Key: HookCtxKey (function, tgid, pid)
/// Value: HookCtxValue captured on enter
///
/// One slot per key. An enter overwrites any unmatched context for the
/// same key, an exit takes the context out.
pub struct HookCtxMap {
    inner: DashMap<HookCtxKey, HookCtxValue, RandomState>,
}

impl HookCtxMap {
    pub fn new() -> Self {
        Self {
            inner: DashMap::with_capacity_and_hasher(MAX_HOOK_CONTEXTS, RandomState::new()),
        }
    }

    /// Store a context, returning the one it replaced
    pub fn update(&self, key: HookCtxKey, value: HookCtxValue) -> Option<HookCtxValue> {
        self.inner.insert(key, value)
    }

    pub fn lookup(&self, key: &HookCtxKey) -> Option<HookCtxValue> {
        self.inner.get(key).map(|value| *value)
    }

    /// Remove and return the context of a key
    pub fn take(&self, key: &HookCtxKey) -> Option<HookCtxValue> {
        self.inner.remove(key).map(|(_, value)| value)
    }

    pub fn remove_process(&self, tgid: u32) {
        self.inner.retain(|key, _| key.tgid != tgid);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for HookCtxMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Trace flows
///
/// Key: TraceObjectKey (tgid, coroutine or thread)
/// Value: TraceObjectValue (trace id, direction of the last socket op)
///
/// Entries live until `remove_process`; nothing expires them.
pub struct TraceObjectMap {
    inner: DashMap<TraceObjectKey, TraceObjectValue, RandomState>,
}

impl TraceObjectMap {
    pub fn new() -> Self {
        Self {
            inner: DashMap::with_capacity_and_hasher(MAX_TRACE_OBJECTS, RandomState::new()),
        }
    }

    pub fn lookup(&self, key: &TraceObjectKey) -> Option<TraceObjectValue> {
        self.inner.get(key).map(|value| *value)
    }

    /// Entry of a flow, holding its shard write lock until dropped
    pub(crate) fn entry(
        &self,
        key: TraceObjectKey,
    ) -> Entry<'_, TraceObjectKey, TraceObjectValue, RandomState> {
        self.inner.entry(key)
    }

    pub fn remove_process(&self, tgid: u32) {
        self.inner.retain(|key, _| key.tgid != tgid);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for TraceObjectMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-CPU "currently in syscall" slot
///
/// Index: cpu id
/// Value: pid_tgid of the thread inside a syscall on that CPU, 0 if none
pub struct SyscallProcMap {
    slots: Vec<AtomicU64>,
}

impl SyscallProcMap {
    pub fn new(cpus: usize) -> Self {
        Self {
            slots: (0..cpus.max(1)).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    /// Record a value for a CPU. Out-of-range CPUs are ignored.
    pub fn update(&self, cpu: u32, value: u64) {
        if let Some(slot) = self.slots.get(cpu as usize) {
            slot.store(value, Ordering::Relaxed);
        }
    }

    pub fn clear(&self, cpu: u32) {
        self.update(cpu, 0);
    }

    pub fn get(&self, cpu: u32) -> Option<u64> {
        self.slots
            .get(cpu as usize)
            .map(|slot| slot.load(Ordering::Relaxed))
    }

    pub fn cpus(&self) -> usize {
        self.slots.len()
    }
}

/// All tables of one probe instance
pub struct ProbeMaps {
    pub configs: ConfigMap,
    pub hook_ctx: HookCtxMap,
    pub trace_objects: TraceObjectMap,
    pub syscall_proc: SyscallProcMap,
}

impl ProbeMaps {
    pub fn new(cpus: usize) -> Self {
        Self {
            configs: ConfigMap::new(),
            hook_ctx: HookCtxMap::new(),
            trace_objects: TraceObjectMap::new(),
            syscall_proc: SyscallProcMap::new(cpus),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hijack_common::{Func, HookArgs};

    fn key(func: Func, pid: u32) -> HookCtxKey {
        HookCtxKey {
            func,
            tgid: 100,
            pid,
        }
    }

    fn value(fd: u32, nsec: u64) -> HookCtxValue {
        HookCtxValue {
            fd,
            args: HookArgs::Empty,
            nsec,
        }
    }

    #[test]
    fn test_hook_ctx_last_writer_wins() {
        let map = HookCtxMap::new();
        assert_eq!(map.update(key(Func::Read, 101), value(3, 10)), None);
        assert_eq!(map.update(key(Func::Read, 101), value(4, 20)), Some(value(3, 10)));
        assert_eq!(map.len(), 1);

        assert_eq!(map.take(&key(Func::Read, 101)), Some(value(4, 20)));
        assert_eq!(map.take(&key(Func::Read, 101)), None);
        assert!(map.is_empty());
    }

    #[test]
    fn test_hook_ctx_keys_are_per_function_and_thread() {
        let map = HookCtxMap::new();
        map.update(key(Func::Read, 101), value(3, 10));
        map.update(key(Func::Write, 101), value(3, 11));
        map.update(key(Func::Read, 102), value(3, 12));
        assert_eq!(map.len(), 3);
        assert_eq!(map.lookup(&key(Func::Write, 101)), Some(value(3, 11)));
    }

    #[test]
    fn test_remove_process() {
        let map = HookCtxMap::new();
        map.update(key(Func::Read, 101), value(3, 10));
        map.update(
            HookCtxKey {
                func: Func::Read,
                tgid: 200,
                pid: 201,
            },
            value(3, 10),
        );
        map.remove_process(100);
        assert_eq!(map.len(), 1);

        let flows = TraceObjectMap::new();
        if let Entry::Vacant(entry) = flows.entry(TraceObjectKey::new(100, 101, 0)) {
            entry.insert(TraceObjectValue::default());
        }
        flows.remove_process(100);
        assert!(flows.is_empty());
    }

    #[test]
    fn test_syscall_proc_slots() {
        let slots = SyscallProcMap::new(2);
        slots.update(1, 42);
        assert_eq!(slots.get(1), Some(42));
        slots.clear(1);
        assert_eq!(slots.get(1), Some(0));

        slots.update(7, 42);
        assert_eq!(slots.get(7), None);
        assert_eq!(SyscallProcMap::new(0).cpus(), 1);
    }
}
