//! Raw syscall entry points
//!
//! `on_enter` and `on_exit` receive every raw syscall observation and route
//! the monitored ones to their handlers. They also maintain the per-CPU
//! "currently in syscall" slot, for traced and untraced processes alike.

use hijack_common::{Func, RawSysEnter, RawSysExit, STAT_ENTER_EVENTS, STAT_EXIT_EVENTS};
#[cfg(debug_assertions)]
use log::trace;

use crate::{events::EventSink, fd::FdResolver, helpers::*, probe::Probe};

impl<R: FdResolver, H: ProbeHelpers, S: EventSink> Probe<R, H, S> {
    /// Handle a raw syscall enter
    ///
    /// Always returns 0.
    pub fn on_enter(&self, ctx: &RawSysEnter) -> u32 {
        self.stats.increment(STAT_ENTER_EVENTS);

        let cpu = self.helpers.current_cpu_id();
        self.maps.syscall_proc.update(cpu, pid_tgid(ctx.tgid, ctx.pid));

        match Func::from_syscall_nr(ctx.id) {
            Some(Func::Close) => self.sys_enter_close(ctx),
            Some(Func::Futex) => self.sys_enter_futex(ctx),
            Some(Func::FutexWaitv) => self.sys_enter_futex_waitv(ctx),
            Some(func) => self.sys_enter_io(func, ctx),
            None => self.sys_enter_default(ctx),
        }

        0
    }

    /// Handle a raw syscall exit
    ///
    /// Always returns 0.
    pub fn on_exit(&self, ctx: &RawSysExit) -> u32 {
        self.stats.increment(STAT_EXIT_EVENTS);

        match Func::from_syscall_nr(ctx.id) {
            // handled on enter
            Some(Func::Close) | None => self.sys_exit_default(ctx),
            Some(Func::Futex) => self.sys_exit_futex(ctx),
            Some(Func::FutexWaitv) => self.sys_exit_futex_waitv(ctx),
            Some(func) => self.sys_exit_io(func, ctx),
        }

        let cpu = self.helpers.current_cpu_id();
        self.maps.syscall_proc.clear(cpu);

        0
    }

    #[cfg(debug_assertions)]
    fn sys_enter_default(&self, ctx: &RawSysEnter) {
        if self.traced_config(ctx.tgid).is_some() {
            trace!("sys_enter id={} tgid={} pid={}", ctx.id, ctx.tgid, ctx.pid);
        }
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn sys_enter_default(&self, _ctx: &RawSysEnter) {}

    #[cfg(debug_assertions)]
    fn sys_exit_default(&self, ctx: &RawSysExit) {
        if self.traced_config(ctx.tgid).is_some() {
            trace!(
                "sys_exit id={} tgid={} pid={} ret={}",
                ctx.id,
                ctx.tgid,
                ctx.pid,
                ctx.ret
            );
        }
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn sys_exit_default(&self, _ctx: &RawSysExit) {}
}
