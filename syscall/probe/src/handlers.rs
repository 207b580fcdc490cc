//! Per-function syscall handlers
//!
//! Enter handlers capture arguments into the correlation table, exit
//! handlers take them back out, classify the descriptor and emit.
//! Every handler first checks the process config and does nothing at all
//! for untraced processes.

use hijack_common::{
    is_futex_wait_op, truncate_name, Func, HookArgs, HookCtxKey, HookCtxValue, RawSysEnter,
    RawSysExit, TracingConfig, STAT_CONTEXTS_OVERWRITTEN, STAT_CONTEXTS_STORED,
    STAT_EVENTS_EMITTED, STAT_EVENTS_SUPPRESSED, STAT_UNMATCHED_EXITS, STAT_UNRESOLVED_FDS,
    STAT_UNSUPPORTED_FAMILY,
};
use log::{debug, trace};

use crate::{
    events::{EventDetail, EventSink, ProbeEvent},
    fd::{FdKind, FdResolver},
    helpers::{latency_ns, ProbeHelpers},
    probe::Probe,
    socket_parser::{classify_socket, SocketClass},
    trace_id::fetch_trace_id,
};

/// Descriptor and arguments worth keeping for a function family
fn capture_args(func: Func, args: &[u64; 6]) -> (u32, HookArgs) {
    let fd = args[0] as u32;
    match func {
        Func::Read | Func::Write | Func::Recvfrom | Func::Sendto => (
            fd,
            HookArgs::Buffer {
                buf: args[1],
                count: args[2],
            },
        ),
        Func::Readv | Func::Writev => (
            fd,
            HookArgs::Iovec {
                iov: args[1],
                iovcnt: args[2] as i32,
            },
        ),
        Func::Recvmsg | Func::Sendmsg => (
            fd,
            HookArgs::Message {
                msg: args[1],
                flags: args[2] as i32,
            },
        ),
        Func::Recvmmsg | Func::Sendmmsg => (
            fd,
            HookArgs::MultiMessage {
                msgvec: args[1],
                vlen: args[2] as u32,
                flags: args[3] as i32,
            },
        ),
        // sendfile(out_fd, in_fd, ...): the input side is what gets classified
        Func::Sendfile => (args[1] as u32, HookArgs::Empty),
        Func::Futex => (
            0,
            HookArgs::Futex {
                uaddr: args[0],
                op: args[1] as u32,
            },
        ),
        Func::Close | Func::FutexWaitv => (fd, HookArgs::Empty),
    }
}

impl<R: FdResolver, H: ProbeHelpers, S: EventSink> Probe<R, H, S> {
    /// Config of a process, if it is traced at all
    #[inline(always)]
    pub(crate) fn traced_config(&self, tgid: u32) -> Option<TracingConfig> {
        self.maps.configs.get(tgid).filter(|cfg| cfg.enabled)
    }

    fn store_context(&self, key: HookCtxKey, fd: u32, args: HookArgs) {
        let value = HookCtxValue {
            fd,
            args,
            nsec: self.helpers.boot_time_ns(),
        };
        self.stats.increment(STAT_CONTEXTS_STORED);
        if self.maps.hook_ctx.update(key, value).is_some() {
            self.stats.increment(STAT_CONTEXTS_OVERWRITTEN);
        }
    }

    fn take_context(&self, key: &HookCtxKey) -> Option<HookCtxValue> {
        let value = self.maps.hook_ctx.take(key);
        if value.is_none() {
            self.stats.increment(STAT_UNMATCHED_EXITS);
        }
        value
    }

    fn emit(&self, event: ProbeEvent) {
        self.stats.increment(STAT_EVENTS_EMITTED);
        self.sink.output(event);
    }

    fn suppress(&self) {
        self.stats.increment(STAT_EVENTS_SUPPRESSED);
    }

    /// Enter of a buffer, iovec, message or sendfile call
    pub(crate) fn sys_enter_io(&self, func: Func, ctx: &RawSysEnter) {
        if self.traced_config(ctx.tgid).is_none() {
            return;
        }

        let key = HookCtxKey {
            func,
            tgid: ctx.tgid,
            pid: ctx.pid,
        };
        let (fd, args) = capture_args(func, &ctx.args);
        self.store_context(key, fd, args);
    }

    /// Exit of a buffer, iovec, message or sendfile call
    pub(crate) fn sys_exit_io(&self, func: Func, ctx: &RawSysExit) {
        let Some(cfg) = self.traced_config(ctx.tgid) else {
            return;
        };

        let key = HookCtxKey {
            func,
            tgid: ctx.tgid,
            pid: ctx.pid,
        };
        let Some(value) = self.take_context(&key) else {
            return;
        };

        let latency = latency_ns(value.nsec, self.helpers.boot_time_ns());
        self.trace_io_event_common(&cfg, &key, value.fd, ctx.ret, latency);
    }

    /// close is classified on enter; the descriptor is gone by exit
    pub(crate) fn sys_enter_close(&self, ctx: &RawSysEnter) {
        let Some(cfg) = self.traced_config(ctx.tgid) else {
            return;
        };

        let key = HookCtxKey {
            func: Func::Close,
            tgid: ctx.tgid,
            pid: ctx.pid,
        };
        let (fd, _) = capture_args(Func::Close, &ctx.args);
        self.trace_io_event_common(&cfg, &key, fd, 0, 0);
    }

    pub(crate) fn sys_enter_futex(&self, ctx: &RawSysEnter) {
        let Some(cfg) = self.traced_config(ctx.tgid) else {
            return;
        };
        if !cfg.lock_event_enabled {
            return;
        }

        let (fd, args) = capture_args(Func::Futex, &ctx.args);
        let HookArgs::Futex { op, .. } = args else {
            return;
        };
        // wake and requeue never block
        if !is_futex_wait_op(op) {
            return;
        }

        let key = HookCtxKey {
            func: Func::Futex,
            tgid: ctx.tgid,
            pid: ctx.pid,
        };
        self.store_context(key, fd, args);
    }

    pub(crate) fn sys_exit_futex(&self, ctx: &RawSysExit) {
        let Some(cfg) = self.traced_config(ctx.tgid) else {
            return;
        };
        if !cfg.lock_event_enabled {
            return;
        }

        let key = HookCtxKey {
            func: Func::Futex,
            tgid: ctx.tgid,
            pid: ctx.pid,
        };
        let Some(value) = self.take_context(&key) else {
            return;
        };
        let HookArgs::Futex { uaddr, op } = value.args else {
            return;
        };

        self.emit(ProbeEvent {
            label: Func::Futex.label(),
            tgid: ctx.tgid,
            pid: ctx.pid,
            fd: value.fd,
            ret: ctx.ret,
            latency_ns: latency_ns(value.nsec, self.helpers.boot_time_ns()),
            detail: EventDetail::LockWait { uaddr, op },
            trace_id: None,
        });
    }

    pub(crate) fn sys_enter_futex_waitv(&self, ctx: &RawSysEnter) {
        let Some(cfg) = self.traced_config(ctx.tgid) else {
            return;
        };
        if cfg.lock_event_enabled {
            debug!(
                "futex_waitv enter: tgid={} pid={} nr_futexes={}",
                ctx.tgid, ctx.pid, ctx.args[1]
            );
        }
    }

    pub(crate) fn sys_exit_futex_waitv(&self, ctx: &RawSysExit) {
        let Some(cfg) = self.traced_config(ctx.tgid) else {
            return;
        };
        if cfg.lock_event_enabled {
            debug!(
                "futex_waitv exit: tgid={} pid={} ret={}",
                ctx.tgid, ctx.pid, ctx.ret
            );
        }
    }

    /// Classify a descriptor and emit the event the config allows
    ///
    /// # Arguments
    /// * `cfg` - Config of the owning process
    /// * `key` - Function and thread of the call
    /// * `fd` - Descriptor captured for the call
    /// * `ret` - Syscall return value
    /// * `latency` - Enter-to-exit time in nanoseconds
    pub(crate) fn trace_io_event_common(
        &self,
        cfg: &TracingConfig,
        key: &HookCtxKey,
        fd: u32,
        ret: i64,
        latency: u64,
    ) {
        let Some(description) = self.resolver.describe_fd(key.tgid, fd) else {
            self.stats.increment(STAT_UNRESOLVED_FDS);
            return;
        };

        let mut trace_id = None;
        let detail = match description.kind() {
            FdKind::Socket => {
                if cfg.io_event_socket_disabled || ret <= 0 {
                    self.suppress();
                    return;
                }
                let Some(info) = description.socket else {
                    self.stats.increment(STAT_UNRESOLVED_FDS);
                    return;
                };

                match classify_socket(&info) {
                    SocketClass::Inet(endpoints) => {
                        let id = fetch_trace_id(
                            &self.maps.trace_objects,
                            &self.helpers,
                            &self.stats,
                            key,
                            cfg,
                            endpoints.local.port(),
                        );
                        trace_id = (id != 0).then_some(id);
                        EventDetail::Inet {
                            local: endpoints.local,
                            remote: endpoints.remote,
                        }
                    }
                    SocketClass::Unix => EventDetail::Unix {
                        family: info.family,
                    },
                    SocketClass::Inet6 | SocketClass::Unsupported(_) => {
                        trace!(
                            "{}: tgid={} fd={} family {} not handled",
                            key.func.label(),
                            key.tgid,
                            fd,
                            info.family
                        );
                        self.stats.increment(STAT_UNSUPPORTED_FAMILY);
                        return;
                    }
                }
            }
            FdKind::Regular => {
                if cfg.io_event_regular_disabled {
                    self.suppress();
                    return;
                }
                let name = description.name.as_deref().map(truncate_name).unwrap_or("");
                EventDetail::Regular {
                    name: name.to_string(),
                }
            }
            FdKind::Other(mode) => {
                if !cfg.io_event_others_enabled {
                    self.suppress();
                    return;
                }
                EventDetail::Other { mode }
            }
        };

        self.emit(ProbeEvent {
            label: key.func.label(),
            tgid: key.tgid,
            pid: key.pid,
            fd,
            ret,
            latency_ns: latency,
            detail,
            trace_id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_buffer_family() {
        let args = [5, 0x7fff_0000, 4096, 0, 0, 0];
        for func in [Func::Read, Func::Write, Func::Recvfrom, Func::Sendto] {
            assert_eq!(
                capture_args(func, &args),
                (
                    5,
                    HookArgs::Buffer {
                        buf: 0x7fff_0000,
                        count: 4096
                    }
                )
            );
        }
    }

    #[test]
    fn test_capture_message_families() {
        let args = [7, 0x1000, 2, 0x40, 0, 0];
        assert_eq!(
            capture_args(Func::Writev, &args),
            (7, HookArgs::Iovec { iov: 0x1000, iovcnt: 2 })
        );
        assert_eq!(
            capture_args(Func::Recvmsg, &args),
            (7, HookArgs::Message { msg: 0x1000, flags: 2 })
        );
        assert_eq!(
            capture_args(Func::Sendmmsg, &args),
            (
                7,
                HookArgs::MultiMessage {
                    msgvec: 0x1000,
                    vlen: 2,
                    flags: 0x40
                }
            )
        );
    }

    #[test]
    fn test_capture_sendfile_uses_input_fd() {
        let args = [1, 9, 0, 65536, 0, 0];
        assert_eq!(capture_args(Func::Sendfile, &args), (9, HookArgs::Empty));
    }

    #[test]
    fn test_capture_futex() {
        let args = [0xdead_0000, 128, 0, 0, 0, 0];
        assert_eq!(
            capture_args(Func::Futex, &args),
            (
                0,
                HookArgs::Futex {
                    uaddr: 0xdead_0000,
                    op: 128
                }
            )
        );
    }
}
