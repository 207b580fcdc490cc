//! Shared data structures between the probe and userspace
//!
//! The table records are `repr(C)` to keep one layout on both sides.

use crate::{constants::FILE_NAME_LEN_MAX, syscalls};

/// Per-process tracing configuration
///
/// Owned by the control surface; the probe only reads it.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "userspace", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "userspace", serde(default))]
pub struct TracingConfig {
    /// Master switch for the process
    pub enabled: bool,
    /// Server port anchoring trace ids (0 = unset)
    pub listen_port: u16,
    pub io_event_socket_disabled: bool,
    pub io_event_regular_disabled: bool,
    pub io_event_others_enabled: bool,
    pub lock_event_enabled: bool,
}

/// Monitored syscall functions
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Func {
    Read,
    Write,
    Futex,
    FutexWaitv,
    Readv,
    Writev,
    Recvfrom,
    Recvmsg,
    Recvmmsg,
    Sendto,
    Sendmsg,
    Sendmmsg,
    Sendfile,
    Close,
}

impl Func {
    /// Map a syscall number to the function it monitors
    pub fn from_syscall_nr(nr: i64) -> Option<Self> {
        let func = match nr {
            syscalls::SYS_read => Func::Read,
            syscalls::SYS_write => Func::Write,
            syscalls::SYS_futex => Func::Futex,
            syscalls::SYS_futex_waitv => Func::FutexWaitv,
            syscalls::SYS_readv => Func::Readv,
            syscalls::SYS_writev => Func::Writev,
            syscalls::SYS_recvfrom => Func::Recvfrom,
            syscalls::SYS_recvmsg => Func::Recvmsg,
            syscalls::SYS_recvmmsg => Func::Recvmmsg,
            syscalls::SYS_sendto => Func::Sendto,
            syscalls::SYS_sendmsg => Func::Sendmsg,
            syscalls::SYS_sendmmsg => Func::Sendmmsg,
            syscalls::SYS_sendfile => Func::Sendfile,
            syscalls::SYS_close => Func::Close,
            _ => return None,
        };
        Some(func)
    }

    /// Event label, the syscall name
    pub fn label(self) -> &'static str {
        match self {
            Func::Read => "read",
            Func::Write => "write",
            Func::Futex => "futex",
            Func::FutexWaitv => "futex_waitv",
            Func::Readv => "readv",
            Func::Writev => "writev",
            Func::Recvfrom => "recvfrom",
            Func::Recvmsg => "recvmsg",
            Func::Recvmmsg => "recvmmsg",
            Func::Sendto => "sendto",
            Func::Sendmsg => "sendmsg",
            Func::Sendmmsg => "sendmmsg",
            Func::Sendfile => "sendfile",
            Func::Close => "close",
        }
    }

    /// Whether the function belongs to the read family used by trace ids
    pub fn is_read(self) -> bool {
        matches!(
            self,
            Func::Read | Func::Readv | Func::Recvfrom | Func::Recvmsg | Func::Recvmmsg
        )
    }
}

/// Key of the enter/exit correlation table
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HookCtxKey {
    pub func: Func,
    pub tgid: u32,
    pub pid: u32,
}

/// Arguments captured on enter, by function family
///
/// Pointers are user addresses and are never dereferenced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookArgs {
    /// read, write, recvfrom, sendto
    Buffer { buf: u64, count: u64 },
    /// readv, writev
    Iovec { iov: u64, iovcnt: i32 },
    /// recvmsg, sendmsg
    Message { msg: u64, flags: i32 },
    /// recvmmsg, sendmmsg
    MultiMessage { msgvec: u64, vlen: u32, flags: i32 },
    /// futex wait-type operations
    Futex { uaddr: u64, op: u32 },
    /// Nothing beyond the fd
    Empty,
}

/// Value of the enter/exit correlation table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HookCtxValue {
    pub fd: u32,
    pub args: HookArgs,
    /// Boot-time timestamp of the enter, nanoseconds
    pub nsec: u64,
}

/// Key of the trace flow table
///
/// `pid` is only set when no coroutine id is known, so every coroutine of a
/// process gets its own flow while threads without one fall back to the
/// thread id.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TraceObjectKey {
    pub tgid: u32,
    pub pid: u32,
    pub coid: u64,
}

impl TraceObjectKey {
    pub fn new(tgid: u32, pid: u32, coid: u64) -> Self {
        Self {
            tgid,
            pid: if coid == 0 { pid } else { 0 },
            coid,
        }
    }
}

/// Value of the trace flow table
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraceObjectValue {
    pub trace_id: u64,
    pub last_socket_operation_is_read: bool,
}

/// Raw syscall enter observation (raw_syscalls:sys_enter)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawSysEnter {
    pub id: i64,
    pub tgid: u32,
    pub pid: u32,
    pub args: [u64; 6],
}

/// Raw syscall exit observation (raw_syscalls:sys_exit)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawSysExit {
    pub id: i64,
    pub tgid: u32,
    pub pid: u32,
    pub ret: i64,
}

/// Pack the first trace id of a flow
///
/// Layout: bits 48-63 tgid, bits 32-47 pid + coroutine id, bits 24-31 cpu,
/// bits 0-15 boot clock. Each field keeps only its low bits.
pub fn pack_trace_id(tgid: u32, pid_coid: u64, cpu: u32, boot_ns: u64) -> u64 {
    let mut trace_id = 0u64;
    trace_id |= (tgid as u64 & 0xFFFF) << 48;
    trace_id |= (pid_coid & 0xFFFF) << 32;
    trace_id |= (cpu as u64 & 0x00FF) << 24;
    trace_id |= boot_ns & 0xFFFF;
    trace_id
}

/// Shorten a file name to what fits the event name buffer
///
/// Cuts at a character boundary at or below `FILE_NAME_LEN_MAX - 1` bytes.
pub fn truncate_name(name: &str) -> &str {
    let max = FILE_NAME_LEN_MAX - 1;
    if name.len() <= max {
        return name;
    }
    let mut end = max;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

// Compile-time layout checks
const _: () = {
    assert!(core::mem::size_of::<HookCtxKey>() == 12);
    assert!(core::mem::size_of::<RawSysEnter>() % core::mem::align_of::<RawSysEnter>() == 0);
    assert!(core::mem::size_of::<TraceObjectKey>() == 16);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_trace_id_layout() {
        let id = pack_trace_id(100, 101, 3, 0xABCD_1234);
        assert_eq!(id >> 48, 100);
        assert_eq!((id >> 32) & 0xFFFF, 101);
        assert_eq!((id >> 24) & 0xFF, 3);
        assert_eq!((id >> 16) & 0xFF, 0);
        assert_eq!(id & 0xFFFF, 0x1234);
    }

    #[test]
    fn test_pack_trace_id_masks_wide_fields() {
        let id = pack_trace_id(0x0001_0064, 0x1_0000 + 7, 0x1FF, u64::MAX);
        assert_eq!(id >> 48, 0x64);
        assert_eq!((id >> 32) & 0xFFFF, 7);
        assert_eq!((id >> 24) & 0xFF, 0xFF);
        assert_eq!(id & 0xFFFF, 0xFFFF);
    }

    #[test]
    fn test_trace_object_key_aliasing() {
        let by_thread = TraceObjectKey::new(100, 101, 0);
        assert_eq!(by_thread.pid, 101);

        let a = TraceObjectKey::new(100, 101, 9);
        let b = TraceObjectKey::new(100, 102, 9);
        assert_eq!(a, b);
        assert_eq!(a.pid, 0);
    }

    #[test]
    fn test_read_family() {
        for func in [Func::Read, Func::Readv, Func::Recvfrom, Func::Recvmsg, Func::Recvmmsg] {
            assert!(func.is_read(), "{:?}", func);
        }
        for func in [Func::Write, Func::Writev, Func::Sendto, Func::Sendmsg, Func::Sendfile, Func::Close] {
            assert!(!func.is_read(), "{:?}", func);
        }
    }

    #[test]
    fn test_syscall_mapping() {
        assert_eq!(Func::from_syscall_nr(syscalls::SYS_read), Some(Func::Read));
        assert_eq!(Func::from_syscall_nr(syscalls::SYS_sendfile), Some(Func::Sendfile));
        assert_eq!(Func::from_syscall_nr(syscalls::SYS_futex_waitv), Some(Func::FutexWaitv));
        assert_eq!(Func::from_syscall_nr(-1), None);
        assert_eq!(Func::Recvmmsg.label(), "recvmmsg");
    }

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("access.log"), "access.log");

        let long = "x".repeat(FILE_NAME_LEN_MAX * 2);
        assert_eq!(truncate_name(&long).len(), FILE_NAME_LEN_MAX - 1);
        assert!(long.starts_with(truncate_name(&long)));

        // multi-byte char straddling the limit is dropped whole
        let mut name = "a".repeat(FILE_NAME_LEN_MAX - 2);
        name.push('é');
        assert_eq!(truncate_name(&name), &name[..FILE_NAME_LEN_MAX - 2]);
    }
}
