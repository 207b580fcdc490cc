//! Shared types and constants for the hijack syscall correlator
//!
//! This crate holds the records exchanged between the probe and the
//! userspace daemon: the per-process tracing config, the keys and values
//! of the correlation tables, the raw syscall observations and the
//! monitored-function ids. It stays `no_std` so the same layouts can back
//! BPF maps.

#![cfg_attr(not(test), no_std)]

pub mod constants;
pub mod syscalls;
pub mod types;

// Re-export commonly used types
pub use constants::*;
pub use types::{
    pack_trace_id, truncate_name, Func, HookArgs, HookCtxKey, HookCtxValue, RawSysEnter,
    RawSysExit, TraceObjectKey, TraceObjectValue, TracingConfig,
};
