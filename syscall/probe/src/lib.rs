//! hijack syscall probe
//!
//! Correlates raw syscall enter/exit observations of traced processes into
//! classified I/O and lock-wait events, and stitches socket traffic on a
//! process' listen port into trace ids.
//!
//! ## Architecture
//!
//! ```text
//! on_enter() -> config gate -> capture args into HOOK_CTX (func, tgid, pid)
//!                               |
//!                               v
//! on_exit()  -> config gate -> take context -> resolve fd -> classify
//!                               |
//!                               v
//!               IPv4 socket?  -> fetch_trace_id (TRACE_OBJECTS)
//!                               |
//!                               v
//!               EventSink::output(ProbeEvent)
//! ```
//!
//! The host supplies descriptor resolution ([`FdResolver`]), the clock,
//! CPU and coroutine ids ([`ProbeHelpers`]) and the event destination
//! ([`EventSink`]).

mod dispatch;
mod handlers;

pub mod events;
pub mod fd;
pub mod helpers;
pub mod maps;
pub mod probe;
pub mod socket_parser;
pub mod stats;
pub mod trace_id;

pub use events::{EventDetail, EventSink, ProbeEvent};
pub use fd::{FdDescription, FdKind, FdResolver, SocketInfo};
pub use helpers::{pid_tgid, ProbeHelpers};
pub use maps::ProbeMaps;
pub use probe::Probe;
pub use stats::{Stats, StatsSnapshot};
