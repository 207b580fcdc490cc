//! Metrics exporters
//!
//! Provides different exporters for metrics (JSON, Prometheus, InfluxDB)

use crate::types::IoMetrics;
use anyhow::{bail, Context, Result};
use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Trait for metrics exporters
pub trait MetricsExporter {
    /// Export metrics
    ///
    /// # Arguments
    ///
    /// * `metrics` - Aggregated metrics to export
    fn export(&self, metrics: &IoMetrics) -> Result<()>;
}

/// Export format type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExporterType {
    /// JSON format
    Json,
    /// Prometheus format
    Prometheus,
    /// InfluxDB line protocol
    Influx,
}

impl FromStr for ExporterType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExporterType::Json),
            "prometheus" | "prom" => Ok(ExporterType::Prometheus),
            "influx" | "influxdb" => Ok(ExporterType::Influx),
            _ => bail!("Unsupported format: {}. Use json, prometheus, or influx", s),
        }
    }
}

impl ExporterType {
    /// Build the exporter for this format
    pub fn exporter(self, output_path: PathBuf) -> Box<dyn MetricsExporter> {
        match self {
            ExporterType::Json => Box::new(JsonExporter::new(output_path, true)),
            ExporterType::Prometheus => Box::new(PrometheusExporter::new(output_path)),
            ExporterType::Influx => {
                Box::new(InfluxExporter::new(output_path, "hijack".to_string()))
            }
        }
    }
}

fn write_output(path: &Path, data: &str) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create output file: {:?}", path))?;

    file.write_all(data.as_bytes())
        .with_context(|| format!("Failed to write to output file: {:?}", path))?;

    Ok(())
}

/// JSON exporter
pub struct JsonExporter {
    output_path: PathBuf,
    pretty: bool,
}

impl JsonExporter {
    /// Create a new JSON exporter
    ///
    /// # Arguments
    ///
    /// * `output_path` - Path to output file
    /// * `pretty` - Enable pretty-printing
    pub fn new(output_path: PathBuf, pretty: bool) -> Self {
        Self {
            output_path,
            pretty,
        }
    }
}

impl MetricsExporter for JsonExporter {
    fn export(&self, metrics: &IoMetrics) -> Result<()> {
        let json = if self.pretty {
            serde_json::to_string_pretty(metrics)?
        } else {
            serde_json::to_string(metrics)?
        };

        write_output(&self.output_path, &json)
    }
}

/// Prometheus exporter
pub struct PrometheusExporter {
    output_path: PathBuf,
}

impl PrometheusExporter {
    /// Create a new Prometheus exporter
    ///
    /// # Arguments
    ///
    /// * `output_path` - Path to output file
    pub fn new(output_path: PathBuf) -> Self {
        Self { output_path }
    }

    /// Convert metrics to Prometheus format
    fn to_prometheus_format(metrics: &IoMetrics) -> String {
        let mut output = String::new();

        // Total events
        output.push_str("# HELP hijack_events_total Total number of syscall events\n");
        output.push_str("# TYPE hijack_events_total counter\n");
        output.push_str(&format!("hijack_events_total {}\n", metrics.total_events));
        output.push('\n');

        // Duration
        output.push_str("# HELP hijack_duration_seconds Duration of the replay\n");
        output.push_str("# TYPE hijack_duration_seconds gauge\n");
        output.push_str(&format!("hijack_duration_seconds {}\n", metrics.duration_seconds));
        output.push('\n');

        // Per syscall
        output.push_str("# HELP hijack_events_by_syscall Events broken down by syscall\n");
        output.push_str("# TYPE hijack_events_by_syscall counter\n");
        for (label, count) in &metrics.events_by_label {
            output.push_str(&format!("hijack_events_by_syscall{{syscall=\"{}\"}} {}\n", label, count));
        }
        output.push('\n');

        // Per descriptor kind
        output.push_str("# HELP hijack_events_by_kind Events broken down by descriptor kind\n");
        output.push_str("# TYPE hijack_events_by_kind counter\n");
        for (kind, count) in &metrics.events_by_kind {
            output.push_str(&format!("hijack_events_by_kind{{kind=\"{}\"}} {}\n", kind, count));
        }
        output.push('\n');

        // Percentiles
        output.push_str("# HELP hijack_latency_microseconds Latency percentiles in microseconds\n");
        output.push_str("# TYPE hijack_latency_microseconds gauge\n");
        for (quantile, value) in [
            ("0.50", metrics.percentiles.p50),
            ("0.75", metrics.percentiles.p75),
            ("0.90", metrics.percentiles.p90),
            ("0.95", metrics.percentiles.p95),
            ("0.99", metrics.percentiles.p99),
            ("0.999", metrics.percentiles.p999),
        ] {
            output.push_str(&format!(
                "hijack_latency_microseconds{{percentile=\"{}\"}} {}\n",
                quantile, value
            ));
        }
        output.push('\n');

        // Histogram
        output.push_str("# HELP hijack_histogram_bucket Latency histogram buckets\n");
        output.push_str("# TYPE hijack_histogram_bucket gauge\n");
        output.push_str(&format!("hijack_histogram_bucket{{le=\"10\"}} {}\n", metrics.histogram.bucket_0_10us));
        output.push_str(&format!("hijack_histogram_bucket{{le=\"100\"}} {}\n", metrics.histogram.bucket_10_100us));
        output.push_str(&format!("hijack_histogram_bucket{{le=\"1000\"}} {}\n", metrics.histogram.bucket_100us_1ms));
        output.push_str(&format!("hijack_histogram_bucket{{le=\"10000\"}} {}\n", metrics.histogram.bucket_1_10ms));
        output.push_str(&format!("hijack_histogram_bucket{{le=\"100000\"}} {}\n", metrics.histogram.bucket_10_100ms));
        output.push_str(&format!("hijack_histogram_bucket{{le=\"+Inf\"}} {}\n", metrics.histogram.bucket_100ms_plus));
        output.push('\n');

        // Connections and traces
        output.push_str("# HELP hijack_connections_total Total number of unique IPv4 connections\n");
        output.push_str("# TYPE hijack_connections_total gauge\n");
        output.push_str(&format!("hijack_connections_total {}\n", metrics.connections.len()));
        output.push('\n');

        output.push_str("# HELP hijack_trace_ids_total Distinct trace ids observed\n");
        output.push_str("# TYPE hijack_trace_ids_total gauge\n");
        output.push_str(&format!("hijack_trace_ids_total {}\n", metrics.traces.distinct_ids));
        output.push('\n');

        // Probe counters
        let stats = &metrics.probe_stats;
        output.push_str("# HELP hijack_probe_counter Probe health counters\n");
        output.push_str("# TYPE hijack_probe_counter counter\n");
        for (name, value) in [
            ("enter_events", stats.enter_events),
            ("exit_events", stats.exit_events),
            ("contexts_stored", stats.contexts_stored),
            ("contexts_overwritten", stats.contexts_overwritten),
            ("unmatched_exits", stats.unmatched_exits),
            ("events_emitted", stats.events_emitted),
            ("events_suppressed", stats.events_suppressed),
            ("unresolved_fds", stats.unresolved_fds),
            ("unsupported_family", stats.unsupported_family),
            ("trace_flows_created", stats.trace_flows_created),
        ] {
            output.push_str(&format!("hijack_probe_counter{{name=\"{}\"}} {}\n", name, value));
        }
        output.push('\n');

        output
    }
}

impl MetricsExporter for PrometheusExporter {
    fn export(&self, metrics: &IoMetrics) -> Result<()> {
        write_output(&self.output_path, &Self::to_prometheus_format(metrics))
    }
}

/// InfluxDB line protocol exporter
pub struct InfluxExporter {
    output_path: PathBuf,
    measurement: String,
}

impl InfluxExporter {
    /// Create a new InfluxDB exporter
    ///
    /// # Arguments
    ///
    /// * `output_path` - Path to output file
    /// * `measurement` - Measurement name for InfluxDB
    pub fn new(output_path: PathBuf, measurement: String) -> Self {
        Self {
            output_path,
            measurement,
        }
    }

    /// Convert metrics to InfluxDB line protocol
    fn to_influx_format(metrics: &IoMetrics, measurement: &str) -> String {
        let mut output = String::new();
        let timestamp = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0);

        // Global metrics
        output.push_str(&format!(
            "{},type=summary total_events={}i,duration_seconds={}i,connections={}i,trace_ids={}i {}\n",
            measurement,
            metrics.total_events,
            metrics.duration_seconds,
            metrics.connections.len(),
            metrics.traces.distinct_ids,
            timestamp
        ));

        // Percentiles
        output.push_str(&format!(
            "{},type=percentiles p50={},p75={},p90={},p95={},p99={},p999={} {}\n",
            measurement,
            metrics.percentiles.p50,
            metrics.percentiles.p75,
            metrics.percentiles.p90,
            metrics.percentiles.p95,
            metrics.percentiles.p99,
            metrics.percentiles.p999,
            timestamp
        ));

        // Histogram
        output.push_str(&format!(
            "{},type=histogram bucket_0_10us={}i,bucket_10_100us={}i,bucket_100us_1ms={}i,bucket_1_10ms={}i,bucket_10_100ms={}i,bucket_100ms_plus={}i {}\n",
            measurement,
            metrics.histogram.bucket_0_10us,
            metrics.histogram.bucket_10_100us,
            metrics.histogram.bucket_100us_1ms,
            metrics.histogram.bucket_1_10ms,
            metrics.histogram.bucket_10_100ms,
            metrics.histogram.bucket_100ms_plus,
            timestamp
        ));

        // Per syscall
        for (label, count) in &metrics.events_by_label {
            output.push_str(&format!(
                "{},type=syscall,syscall={} events={}i {}\n",
                measurement, label, count, timestamp
            ));
        }

        output
    }
}

impl MetricsExporter for InfluxExporter {
    fn export(&self, metrics: &IoMetrics) -> Result<()> {
        write_output(
            &self.output_path,
            &Self::to_influx_format(metrics, &self.measurement),
        )
    }
}
