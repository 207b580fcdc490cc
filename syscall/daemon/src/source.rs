//! Recorded observations
//!
//! A recording is a JSON-lines stream, one record per line, tagged by
//! `"type"`. Besides the raw enter/exit observations it carries the state
//! the probe would otherwise ask the kernel for: descriptor tables,
//! coroutine ids and per-process configs.

use anyhow::{Context, Result};
use ahash::RandomState;
use dashmap::DashMap;
use hijack_common::{RawSysEnter, RawSysExit, TracingConfig};
use hijack_probe::{FdDescription, FdResolver, ProbeHelpers, SocketInfo};
use serde::Deserialize;
use std::{
    net::SocketAddrV4,
    sync::atomic::{AtomicU32, AtomicU64, Ordering},
};

/// One line of a recording
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayRecord {
    /// Install or replace the config of a process
    Config { tgid: u32, config: TracingConfig },
    /// Process exited
    Forget { tgid: u32 },
    /// Descriptor opened
    Fd {
        tgid: u32,
        fd: u32,
        description: FdRecord,
    },
    /// Descriptor closed
    FdClose { tgid: u32, fd: u32 },
    /// Thread now runs a coroutine (0 = none)
    Coroutine { tgid: u32, pid: u32, id: u64 },
    Enter {
        ts: u64,
        #[serde(default)]
        cpu: u32,
        tgid: u32,
        pid: u32,
        id: i64,
        #[serde(default)]
        args: Vec<u64>,
    },
    Exit {
        ts: u64,
        #[serde(default)]
        cpu: u32,
        tgid: u32,
        pid: u32,
        id: i64,
        ret: i64,
    },
}

impl ReplayRecord {
    /// Parse one recording line
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line).context("Failed to parse replay record")
    }
}

/// Serialized form of what a descriptor refers to
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FdRecord {
    Inet {
        local: SocketAddrV4,
        remote: SocketAddrV4,
    },
    Inet6,
    Unix,
    /// Socket of any other family
    Socket { family: u16 },
    Regular { name: String },
    /// Pipes, character devices, ... with their file mode
    Other { mode: u32 },
}

impl From<FdRecord> for FdDescription {
    fn from(record: FdRecord) -> Self {
        match record {
            FdRecord::Inet { local, remote } => {
                FdDescription::socket(SocketInfo::inet(local, remote))
            }
            FdRecord::Inet6 => FdDescription::socket(SocketInfo::inet6()),
            FdRecord::Unix => FdDescription::socket(SocketInfo::unix()),
            FdRecord::Socket { family } => FdDescription::socket(SocketInfo {
                family,
                ..Default::default()
            }),
            FdRecord::Regular { name } => FdDescription::regular(name),
            FdRecord::Other { mode } => FdDescription::other(mode),
        }
    }
}

/// Build the raw enter observation of a record, padding args to six
pub fn raw_enter(tgid: u32, pid: u32, id: i64, args: &[u64]) -> RawSysEnter {
    let mut raw = [0u64; 6];
    for (slot, value) in raw.iter_mut().zip(args) {
        *slot = *value;
    }
    RawSysEnter {
        id,
        tgid,
        pid,
        args: raw,
    }
}

pub fn raw_exit(tgid: u32, pid: u32, id: i64, ret: i64) -> RawSysExit {
    RawSysExit { id, tgid, pid, ret }
}

/// Descriptor tables rebuilt from `fd` / `fd_close` records
pub struct ReplayFdTable {
    table: DashMap<(u32, u32), FdDescription, RandomState>,
}

impl ReplayFdTable {
    pub fn new() -> Self {
        Self {
            table: DashMap::with_hasher(RandomState::new()),
        }
    }

    pub fn open(&self, tgid: u32, fd: u32, description: FdDescription) {
        self.table.insert((tgid, fd), description);
    }

    pub fn close(&self, tgid: u32, fd: u32) {
        self.table.remove(&(tgid, fd));
    }

    pub fn remove_process(&self, tgid: u32) {
        self.table.retain(|(owner, _), _| *owner != tgid);
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for ReplayFdTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FdResolver for ReplayFdTable {
    fn describe_fd(&self, tgid: u32, fd: u32) -> Option<FdDescription> {
        self.table.get(&(tgid, fd)).map(|entry| entry.clone())
    }
}

/// Clock, CPU and coroutine ids of the observation being replayed
///
/// `ts` and `cpu` of each enter/exit record are installed before the
/// record is handed to the probe.
pub struct ReplayHelpers {
    now: AtomicU64,
    cpu: AtomicU32,
    coroutines: DashMap<(u32, u32), u64, RandomState>,
}

impl ReplayHelpers {
    pub fn new() -> Self {
        Self {
            now: AtomicU64::new(0),
            cpu: AtomicU32::new(0),
            coroutines: DashMap::with_hasher(RandomState::new()),
        }
    }

    pub fn set_context(&self, ts: u64, cpu: u32) {
        self.now.store(ts, Ordering::Relaxed);
        self.cpu.store(cpu, Ordering::Relaxed);
    }

    pub fn set_coroutine(&self, tgid: u32, pid: u32, id: u64) {
        if id == 0 {
            self.coroutines.remove(&(tgid, pid));
        } else {
            self.coroutines.insert((tgid, pid), id);
        }
    }

    pub fn remove_process(&self, tgid: u32) {
        self.coroutines.retain(|(owner, _), _| *owner != tgid);
    }
}

impl Default for ReplayHelpers {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeHelpers for ReplayHelpers {
    fn boot_time_ns(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }

    fn current_cpu_id(&self) -> u32 {
        self.cpu.load(Ordering::Relaxed)
    }

    fn ancestor_coroutine_id(&self, tgid: u32, pid: u32) -> u64 {
        self.coroutines.get(&(tgid, pid)).map_or(0, |id| *id)
    }
}
