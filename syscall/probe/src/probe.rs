//! Probe instance
//!
//! Bundles the shared tables, the health counters and the three host
//! capabilities (descriptor resolution, execution-context helpers, event
//! output). Every handler takes `&self`, so one probe can be shared by all
//! observing threads behind an `Arc`.

use crate::{
    maps::{ConfigMap, ProbeMaps},
    stats::Stats,
};

pub struct Probe<R, H, S> {
    pub(crate) maps: ProbeMaps,
    pub(crate) stats: Stats,
    pub(crate) resolver: R,
    pub(crate) helpers: H,
    pub(crate) sink: S,
}

impl<R, H, S> Probe<R, H, S> {
    /// Create a probe with empty tables
    ///
    /// # Arguments
    /// * `resolver` - Looks up what a `(tgid, fd)` refers to
    /// * `helpers` - Clock, CPU id and coroutine id
    /// * `sink` - Receives every emitted event
    /// * `cpus` - Number of per-CPU syscall slots
    pub fn new(resolver: R, helpers: H, sink: S, cpus: usize) -> Self {
        Self {
            maps: ProbeMaps::new(cpus),
            stats: Stats::new(),
            resolver,
            helpers,
            sink,
        }
    }

    /// Per-process config store
    pub fn configs(&self) -> &ConfigMap {
        &self.maps.configs
    }

    pub fn maps(&self) -> &ProbeMaps {
        &self.maps
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn helpers(&self) -> &H {
        &self.helpers
    }

    /// Drop all state of a process
    ///
    /// Removes its config, its in-flight contexts and its trace flows.
    /// Other processes are untouched.
    pub fn forget_process(&self, tgid: u32) {
        self.maps.configs.remove(tgid);
        self.maps.hook_ctx.remove_process(tgid);
        self.maps.trace_objects.remove_process(tgid);
    }
}
