//! Probe health counters
//!
//! Indexed by the `STAT_*` ids from `hijack_common::constants`.

use hijack_common::{
    MAX_STATS, STAT_CONTEXTS_OVERWRITTEN, STAT_CONTEXTS_STORED, STAT_ENTER_EVENTS,
    STAT_EVENTS_EMITTED, STAT_EVENTS_SUPPRESSED, STAT_EXIT_EVENTS, STAT_TRACE_FLOWS_CREATED,
    STAT_UNMATCHED_EXITS, STAT_UNRESOLVED_FDS, STAT_UNSUPPORTED_FAMILY,
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct Stats {
    counters: [AtomicU64; MAX_STATS as usize],
}

impl Stats {
    pub fn new() -> Self {
        Self {
            counters: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    #[inline(always)]
    pub fn increment(&self, stat_id: u32) {
        if let Some(counter) = self.counters.get(stat_id as usize) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn get(&self, stat_id: u32) -> u64 {
        self.counters
            .get(stat_id as usize)
            .map_or(0, |counter| counter.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            enter_events: self.get(STAT_ENTER_EVENTS),
            exit_events: self.get(STAT_EXIT_EVENTS),
            contexts_stored: self.get(STAT_CONTEXTS_STORED),
            contexts_overwritten: self.get(STAT_CONTEXTS_OVERWRITTEN),
            unmatched_exits: self.get(STAT_UNMATCHED_EXITS),
            events_emitted: self.get(STAT_EVENTS_EMITTED),
            events_suppressed: self.get(STAT_EVENTS_SUPPRESSED),
            unresolved_fds: self.get(STAT_UNRESOLVED_FDS),
            unsupported_family: self.get(STAT_UNSUPPORTED_FAMILY),
            trace_flows_created: self.get(STAT_TRACE_FLOWS_CREATED),
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters
#[derive(Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub enter_events: u64,
    pub exit_events: u64,
    pub contexts_stored: u64,
    pub contexts_overwritten: u64,
    pub unmatched_exits: u64,
    pub events_emitted: u64,
    pub events_suppressed: u64,
    pub unresolved_fds: u64,
    pub unsupported_family: u64,
    pub trace_flows_created: u64,
}
