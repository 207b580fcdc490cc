//! File descriptor resolution
//!
//! The probe never walks a descriptor table itself. Whatever hosts it
//! implements [`FdResolver`] and hands back an [`FdDescription`] shaped
//! like the kernel objects behind the fd.

use hijack_common::{AF_INET, AF_INET6, AF_UNIX, S_IFMT, S_IFREG, S_IFSOCK};
use std::{net::SocketAddrV4, sync::Arc};

/// Classification of a descriptor target
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FdKind {
    Socket,
    Regular,
    /// Anything else, with its `S_IFMT` bits
    Other(u32),
}

impl FdKind {
    pub fn from_mode(i_mode: u32) -> Self {
        match i_mode & S_IFMT {
            S_IFSOCK => FdKind::Socket,
            S_IFREG => FdKind::Regular,
            mode => FdKind::Other(mode),
        }
    }
}

/// Connection state of a socket (partial `struct sock_common`)
///
/// Byte orders follow the kernel: addresses and the remote port are in
/// network byte order, the local port is in host byte order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SocketInfo {
    /// Address family (AF_INET, AF_INET6, AF_UNIX, ...)
    pub family: u16,
    /// skc_rcv_saddr
    pub local_addr: u32,
    /// skc_daddr
    pub remote_addr: u32,
    /// skc_num
    pub local_port: u16,
    /// skc_dport
    pub remote_port: u16,
}

impl SocketInfo {
    /// IPv4 socket connected from `local` to `remote`
    pub fn inet(local: SocketAddrV4, remote: SocketAddrV4) -> Self {
        Self {
            family: AF_INET,
            local_addr: u32::from(*local.ip()).to_be(),
            remote_addr: u32::from(*remote.ip()).to_be(),
            local_port: local.port(),
            remote_port: remote.port().to_be(),
        }
    }

    pub fn inet6() -> Self {
        Self {
            family: AF_INET6,
            ..Default::default()
        }
    }

    pub fn unix() -> Self {
        Self {
            family: AF_UNIX,
            ..Default::default()
        }
    }
}

/// What a descriptor refers to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FdDescription {
    /// Inode mode of the file behind the fd
    pub i_mode: u32,
    /// Present for sockets
    pub socket: Option<SocketInfo>,
    /// Dentry name, present for regular files
    pub name: Option<String>,
}

impl FdDescription {
    pub fn socket(info: SocketInfo) -> Self {
        Self {
            i_mode: S_IFSOCK,
            socket: Some(info),
            name: None,
        }
    }

    pub fn regular(name: impl Into<String>) -> Self {
        Self {
            i_mode: S_IFREG,
            socket: None,
            name: Some(name.into()),
        }
    }

    pub fn other(i_mode: u32) -> Self {
        Self {
            i_mode,
            socket: None,
            name: None,
        }
    }

    pub fn kind(&self) -> FdKind {
        FdKind::from_mode(self.i_mode)
    }
}

/// Resolves `(tgid, fd)` to the object behind it
pub trait FdResolver {
    fn describe_fd(&self, tgid: u32, fd: u32) -> Option<FdDescription>;
}

impl<T: FdResolver + ?Sized> FdResolver for Arc<T> {
    fn describe_fd(&self, tgid: u32, fd: u32) -> Option<FdDescription> {
        (**self).describe_fd(tgid, fd)
    }
}
