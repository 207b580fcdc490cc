//! Recording replayer
//!
//! Owns a probe wired to the replay descriptor table and clock, and feeds
//! it a recording line by line.

use crate::{
    events::ChannelSink,
    source::{raw_enter, raw_exit, ReplayFdTable, ReplayHelpers, ReplayRecord},
};
use anyhow::{Context, Result};
use hijack_probe::{Probe, StatsSnapshot};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub type ReplayProbe = Probe<Arc<ReplayFdTable>, Arc<ReplayHelpers>, ChannelSink>;

/// Counters of one replay run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Non-empty lines read
    pub lines: u64,
    /// Lines applied to the probe
    pub records: u64,
    /// Malformed lines skipped
    pub skipped: u64,
}

pub struct Replayer {
    probe: ReplayProbe,
    fds: Arc<ReplayFdTable>,
    helpers: Arc<ReplayHelpers>,
}

impl Replayer {
    /// Create a replayer whose probe emits into `sink`
    ///
    /// # Arguments
    ///
    /// * `sink` - Destination of probe events
    /// * `cpus` - Number of per-CPU syscall slots
    pub fn new(sink: ChannelSink, cpus: usize) -> Self {
        let fds = Arc::new(ReplayFdTable::new());
        let helpers = Arc::new(ReplayHelpers::new());
        info!("Creating probe with {} CPU slots", cpus);

        Self {
            probe: Probe::new(Arc::clone(&fds), Arc::clone(&helpers), sink, cpus),
            fds,
            helpers,
        }
    }

    pub fn probe(&self) -> &ReplayProbe {
        &self.probe
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.probe.stats().snapshot()
    }

    /// Apply one record to the probe and its replay state
    pub fn apply(&self, record: ReplayRecord) {
        match record {
            ReplayRecord::Config { tgid, config } => {
                debug!("Config for tgid {}: {:?}", tgid, config);
                self.probe.configs().insert(tgid, config);
            }
            ReplayRecord::Forget { tgid } => {
                debug!("Forgetting tgid {}", tgid);
                self.probe.forget_process(tgid);
                self.fds.remove_process(tgid);
                self.helpers.remove_process(tgid);
            }
            ReplayRecord::Fd {
                tgid,
                fd,
                description,
            } => self.fds.open(tgid, fd, description.into()),
            ReplayRecord::FdClose { tgid, fd } => self.fds.close(tgid, fd),
            ReplayRecord::Coroutine { tgid, pid, id } => self.helpers.set_coroutine(tgid, pid, id),
            ReplayRecord::Enter {
                ts,
                cpu,
                tgid,
                pid,
                id,
                args,
            } => {
                self.helpers.set_context(ts, cpu);
                self.probe.on_enter(&raw_enter(tgid, pid, id, &args));
            }
            ReplayRecord::Exit {
                ts,
                cpu,
                tgid,
                pid,
                id,
                ret,
            } => {
                self.helpers.set_context(ts, cpu);
                self.probe.on_exit(&raw_exit(tgid, pid, id, ret));
            }
        }
    }

    /// Replay a whole recording
    ///
    /// Malformed lines are logged and skipped; only read errors abort.
    pub async fn run<R: AsyncBufRead + Unpin>(&self, reader: R) -> Result<ReplaySummary> {
        let mut lines = reader.lines();
        let mut summary = ReplaySummary::default();
        let mut line_no = 0u64;

        while let Some(line) = lines
            .next_line()
            .await
            .context("Failed to read replay input")?
        {
            line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            summary.lines += 1;

            match ReplayRecord::parse(line) {
                Ok(record) => {
                    self.apply(record);
                    summary.records += 1;
                }
                Err(e) => {
                    warn!("Skipping line {}: {:#}", line_no, e);
                    summary.skipped += 1;
                }
            }
        }

        Ok(summary)
    }
}
