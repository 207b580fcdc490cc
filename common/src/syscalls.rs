//! Syscall numbers of the monitored functions

#![allow(non_upper_case_globals)]

#[cfg(target_arch = "x86_64")]
mod arch {
    pub const SYS_read: i64 = 0;
    pub const SYS_write: i64 = 1;
    pub const SYS_close: i64 = 3;
    pub const SYS_readv: i64 = 19;
    pub const SYS_writev: i64 = 20;
    pub const SYS_sendfile: i64 = 40;
    pub const SYS_sendto: i64 = 44;
    pub const SYS_recvfrom: i64 = 45;
    pub const SYS_sendmsg: i64 = 46;
    pub const SYS_recvmsg: i64 = 47;
    pub const SYS_futex: i64 = 202;
    pub const SYS_recvmmsg: i64 = 299;
    pub const SYS_sendmmsg: i64 = 307;
    pub const SYS_futex_waitv: i64 = 449;
}

#[cfg(target_arch = "aarch64")]
mod arch {
    pub const SYS_close: i64 = 57;
    pub const SYS_read: i64 = 63;
    pub const SYS_write: i64 = 64;
    pub const SYS_readv: i64 = 65;
    pub const SYS_writev: i64 = 66;
    pub const SYS_sendfile: i64 = 71;
    pub const SYS_futex: i64 = 98;
    pub const SYS_sendto: i64 = 206;
    pub const SYS_recvfrom: i64 = 207;
    pub const SYS_sendmsg: i64 = 211;
    pub const SYS_recvmsg: i64 = 212;
    pub const SYS_recvmmsg: i64 = 243;
    pub const SYS_sendmmsg: i64 = 269;
    pub const SYS_futex_waitv: i64 = 449;
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
compile_error!("Unsupported architecture. Only aarch64 and x86_64 are supported.");

pub use arch::*;
