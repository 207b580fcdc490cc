//! Helper capabilities the probe needs from its host
//!
//! Mirrors the BPF helpers the handlers would call in kernel space:
//! a boot-time clock, the current CPU, and the coroutine resolver.

use std::sync::Arc;

/// Execution-context helpers
pub trait ProbeHelpers {
    /// Boot-time clock in nanoseconds
    fn boot_time_ns(&self) -> u64;

    /// CPU the current observation runs on
    fn current_cpu_id(&self) -> u32;

    /// Coroutine id of the current execution context, 0 if none
    fn ancestor_coroutine_id(&self, tgid: u32, pid: u32) -> u64;
}

impl<T: ProbeHelpers + ?Sized> ProbeHelpers for Arc<T> {
    fn boot_time_ns(&self) -> u64 {
        (**self).boot_time_ns()
    }

    fn current_cpu_id(&self) -> u32 {
        (**self).current_cpu_id()
    }

    fn ancestor_coroutine_id(&self, tgid: u32, pid: u32) -> u64 {
        (**self).ancestor_coroutine_id(tgid, pid)
    }
}

/// Combine ids the way `bpf_get_current_pid_tgid` does
#[inline(always)]
pub fn pid_tgid(tgid: u32, pid: u32) -> u64 {
    ((tgid as u64) << 32) | pid as u64
}

/// Elapsed time between enter and exit
///
/// A clock that went backwards yields 0.
#[inline(always)]
pub fn latency_ns(start_ns: u64, now_ns: u64) -> u64 {
    now_ns.saturating_sub(start_ns)
}
