//! Events produced by the probe

use serde::Serialize;
use std::{net::SocketAddrV4, sync::Arc};

/// One completed, non-suppressed syscall
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ProbeEvent {
    /// Syscall name
    pub label: &'static str,
    pub tgid: u32,
    pub pid: u32,
    /// Descriptor the call operated on (0 for lock waits)
    pub fd: u32,
    /// Syscall return value
    pub ret: i64,
    /// Time from enter to exit, nanoseconds
    pub latency_ns: u64,
    /// What the descriptor refers to
    pub detail: EventDetail,
    /// Trace id of the flow, for IPv4 sockets of a process with a listen port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<u64>,
}

/// Classification fields of an event
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventDetail {
    /// IPv4 socket
    Inet {
        local: SocketAddrV4,
        remote: SocketAddrV4,
    },
    /// Unix-domain socket, no endpoint fields
    Unix { family: u16 },
    /// Regular file with its (possibly truncated) name
    Regular { name: String },
    /// Any other descriptor, with its file type bits
    Other { mode: u32 },
    /// Blocking futex operation
    LockWait { uaddr: u64, op: u32 },
}

impl EventDetail {
    /// Short name of the variant, as serialized in `kind`
    pub fn kind(&self) -> &'static str {
        match self {
            EventDetail::Inet { .. } => "inet",
            EventDetail::Unix { .. } => "unix",
            EventDetail::Regular { .. } => "regular",
            EventDetail::Other { .. } => "other",
            EventDetail::LockWait { .. } => "lock_wait",
        }
    }
}

/// Destination of probe events
pub trait EventSink {
    fn output(&self, event: ProbeEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn output(&self, event: ProbeEvent) {
        (**self).output(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = ProbeEvent {
            label: "read",
            tgid: 100,
            pid: 101,
            fd: 5,
            ret: 128,
            latency_ns: 2_000,
            detail: EventDetail::Inet {
                local: "10.0.0.1:8080".parse().unwrap(),
                remote: "10.0.0.2:51000".parse().unwrap(),
            },
            trace_id: Some(7),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"inet\""));
        assert!(json.contains("\"local\":\"10.0.0.1:8080\""));
        assert!(json.contains("\"trace_id\":7"));
    }

    #[test]
    fn test_trace_id_omitted_when_absent() {
        let event = ProbeEvent {
            label: "write",
            tgid: 100,
            pid: 101,
            fd: 6,
            ret: 10,
            latency_ns: 0,
            detail: EventDetail::Regular {
                name: "access.log".to_string(),
            },
            trace_id: None,
        };
        assert!(!serde_json::to_string(&event).unwrap().contains("trace_id"));
        assert_eq!(event.detail.kind(), "regular");
    }
}
