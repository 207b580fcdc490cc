//! Metrics collection and aggregation
//!
//! Aggregates probe events and computes statistics.

use crate::types::*;
use std::collections::{BTreeMap, HashMap};

/// Metrics collector for aggregating probe events
#[derive(Default)]
pub struct MetricsCollector {
    /// All latency samples (for percentile calculation)
    all_latencies: Vec<f64>,
    /// Per-connection latency samples, keyed by (local, remote)
    connection_latencies: HashMap<String, (String, String, Vec<f64>)>,
    /// Latency histogram
    histogram: LatencyHistogram,
    /// Events per syscall label
    by_label: BTreeMap<String, u64>,
    /// Events per descriptor kind
    by_kind: BTreeMap<String, u64>,
    /// Events per regular file
    files: BTreeMap<String, u64>,
    /// Events per trace id
    trace_ids: BTreeMap<u64, u64>,
    /// Total number of events processed
    total_events: u64,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a probe event to the collector
    ///
    /// # Arguments
    ///
    /// * `event` - Event emitted by the probe
    pub fn add_event(&mut self, event: &ProbeEvent) {
        let latency_us = event.latency_ns as f64 / 1000.0;

        self.all_latencies.push(latency_us);
        self.histogram.add_sample(latency_us);

        *self.by_label.entry(event.label.to_string()).or_insert(0) += 1;
        *self.by_kind.entry(event.detail.kind().to_string()).or_insert(0) += 1;

        match &event.detail {
            EventDetail::Inet { local, remote } => {
                let (_, _, samples) = self
                    .connection_latencies
                    .entry(connection_to_string(local, remote))
                    .or_insert_with(|| (local.to_string(), remote.to_string(), Vec::new()));
                samples.push(latency_us);
            }
            EventDetail::Regular { name } => {
                *self.files.entry(name.clone()).or_insert(0) += 1;
            }
            _ => {}
        }

        if let Some(trace_id) = event.trace_id {
            *self.trace_ids.entry(trace_id).or_insert(0) += 1;
        }

        self.total_events += 1;
    }

    /// Generate aggregated metrics
    ///
    /// # Arguments
    ///
    /// * `elapsed_secs` - Duration of the replay in seconds
    /// * `probe_stats` - Probe counters to include in the report
    ///
    /// # Returns
    ///
    /// IoMetrics with aggregated statistics
    pub fn generate_metrics(&self, elapsed_secs: u64, probe_stats: StatsSnapshot) -> IoMetrics {
        let percentiles = calculate_percentiles(self.all_latencies.clone());

        let connections: HashMap<String, ConnectionMetrics> = self
            .connection_latencies
            .iter()
            .map(|(key, (local, remote, samples))| {
                let sum: f64 = samples.iter().sum();
                let avg = sum / samples.len() as f64;
                let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

                (
                    key.clone(),
                    ConnectionMetrics {
                        local: local.clone(),
                        remote: remote.clone(),
                        events: samples.len() as u64,
                        min_latency_us: min,
                        max_latency_us: max,
                        avg_latency_us: avg,
                        std_dev_us: calculate_std_dev(samples, avg),
                    },
                )
            })
            .collect();

        let traces = TraceStats {
            traced_events: self.trace_ids.values().sum(),
            distinct_ids: self.trace_ids.len() as u64,
            events_per_id: self
                .trace_ids
                .iter()
                .map(|(id, count)| (format!("{:#018x}", id), *count))
                .collect(),
        };

        IoMetrics {
            timestamp: chrono::Utc::now().to_rfc3339(),
            duration_seconds: elapsed_secs,
            total_events: self.total_events,
            events_by_label: self.by_label.clone(),
            events_by_kind: self.by_kind.clone(),
            connections,
            files: self.files.clone(),
            traces,
            histogram: self.histogram.clone(),
            percentiles,
            probe_stats,
        }
    }

    /// Get current event count
    pub fn event_count(&self) -> u64 {
        self.total_events
    }

    /// Get number of unique connections
    pub fn connection_count(&self) -> usize {
        self.connection_latencies.len()
    }

    /// Get number of distinct trace ids
    pub fn trace_count(&self) -> usize {
        self.trace_ids.len()
    }

    /// Get histogram reference
    pub fn histogram(&self) -> &LatencyHistogram {
        &self.histogram
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inet_event(label: &'static str, latency_ns: u64, trace_id: Option<u64>) -> ProbeEvent {
        ProbeEvent {
            label,
            tgid: 100,
            pid: 101,
            fd: 5,
            ret: 64,
            latency_ns,
            detail: EventDetail::Inet {
                local: "10.0.0.1:8080".parse().unwrap(),
                remote: "10.0.0.2:51000".parse().unwrap(),
            },
            trace_id,
        }
    }

    #[test]
    fn test_collector_basic() {
        let mut collector = MetricsCollector::new();
        collector.add_event(&inet_event("read", 500_000, Some(0x10)));

        assert_eq!(collector.event_count(), 1);
        assert_eq!(collector.connection_count(), 1);
        assert_eq!(collector.trace_count(), 1);
    }

    #[test]
    fn test_breakdowns() {
        let mut collector = MetricsCollector::new();
        collector.add_event(&inet_event("read", 1_000, Some(0x10)));
        collector.add_event(&inet_event("write", 3_000, Some(0x10)));
        collector.add_event(&inet_event("read", 2_000, Some(0x11)));
        collector.add_event(&ProbeEvent {
            label: "write",
            tgid: 100,
            pid: 101,
            fd: 6,
            ret: 12,
            latency_ns: 40_000,
            detail: EventDetail::Regular {
                name: "app.log".to_string(),
            },
            trace_id: None,
        });

        let metrics = collector.generate_metrics(5, StatsSnapshot::default());
        assert_eq!(metrics.total_events, 4);
        assert_eq!(metrics.events_by_label["read"], 2);
        assert_eq!(metrics.events_by_label["write"], 2);
        assert_eq!(metrics.events_by_kind["inet"], 3);
        assert_eq!(metrics.events_by_kind["regular"], 1);
        assert_eq!(metrics.files["app.log"], 1);

        assert_eq!(metrics.traces.traced_events, 3);
        assert_eq!(metrics.traces.distinct_ids, 2);
        assert_eq!(metrics.traces.events_per_id["0x0000000000000010"], 2);

        let connection = &metrics.connections["10.0.0.1:8080 -> 10.0.0.2:51000"];
        assert_eq!(connection.events, 3);
        assert_eq!(connection.min_latency_us, 1.0);
        assert_eq!(connection.max_latency_us, 3.0);
        assert_eq!(connection.avg_latency_us, 2.0);
    }

    #[test]
    fn test_histogram() {
        let mut collector = MetricsCollector::new();

        // in microseconds
        let latencies = vec![5, 50, 500, 5_000, 50_000, 150_000];
        for latency_us in latencies {
            collector.add_event(&inet_event("read", latency_us * 1000, None));
        }

        let histogram = collector.histogram();
        assert_eq!(histogram.bucket_0_10us, 1);
        assert_eq!(histogram.bucket_10_100us, 1);
        assert_eq!(histogram.bucket_100us_1ms, 1);
        assert_eq!(histogram.bucket_1_10ms, 1);
        assert_eq!(histogram.bucket_10_100ms, 1);
        assert_eq!(histogram.bucket_100ms_plus, 1);
        assert_eq!(collector.trace_count(), 0);
    }
}
