//! hijack daemon
//!
//! Replays a recording of raw syscall observations through the probe,
//! collects the emitted events, and exports metrics.
//!
//! ## Usage
//!
//! ```bash
//! # Replay a recording with a tracing config and export to JSON
//! hijack-daemon --input trace.jsonl --config processes.json --output metrics.json
//!
//! # Read the recording from stdin
//! cat trace.jsonl | hijack-daemon --config processes.json
//!
//! # Export to Prometheus format
//! hijack-daemon --input trace.jsonl --format prometheus --output metrics.prom
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use hijack_daemon::{
    collector::MetricsCollector,
    config::ConfigFile,
    events::{ChannelSink, EventProcessor},
    exporter::{ExporterType, MetricsExporter},
    replay::Replayer,
    types::IoMetrics,
};
use log::info;
use std::{path::PathBuf, sync::Arc};
use tokio::{
    fs::File,
    io::{self, AsyncBufRead, BufReader},
    signal,
    sync::Mutex,
    time::Instant,
};

/// Syscall I/O correlator with trace id stitching
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Recording to replay (JSON lines, "-" for stdin)
    #[clap(short, long, default_value = "-")]
    input: String,

    /// Per-process tracing config file (JSON)
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Output file for metrics
    #[clap(short, long, default_value = "hijack-metrics.json")]
    output: PathBuf,

    /// Output format (json, prometheus, influx)
    #[clap(short, long, default_value = "json")]
    format: String,

    /// Number of per-CPU syscall slots (defaults to the host CPU count)
    #[clap(long)]
    cpus: Option<usize>,

    /// Progress reporting interval in seconds
    #[clap(long, default_value_t = 10)]
    progress_interval: u64,

    /// Verbose logging
    #[clap(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    print_banner();

    let cpus = match args.cpus {
        Some(0) => anyhow::bail!("CPU count must be >= 1"),
        Some(cpus) => cpus,
        None => std::thread::available_parallelism().map_or(1, |n| n.get()),
    };
    let export_format: ExporterType = args.format.parse()?;

    info!("Starting hijack replay...");
    info!("   Input: {}", args.input);
    info!("   Output: {:?}", args.output);
    info!("   Format: {}", args.format);
    info!("   CPU slots: {}", cpus);

    // Create metrics collector and the channel the probe emits into
    let collector = Arc::new(Mutex::new(MetricsCollector::new()));
    let processor = EventProcessor::new(Arc::clone(&collector), args.verbose);
    let (sink, rx) = ChannelSink::channel();
    let collector_task = processor.spawn_collector(rx);
    let progress_task = processor.spawn_progress_reporter(args.progress_interval);

    let replayer = Replayer::new(sink, cpus);
    if let Some(path) = &args.config {
        ConfigFile::load(path)?.apply(replayer.probe().configs());
    }

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = if args.input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(&args.input)
            .await
            .with_context(|| format!("Failed to open input: {}", args.input))?;
        Box::new(BufReader::new(file))
    };

    info!("Replaying...");
    let start_time = Instant::now();

    tokio::select! {
        summary = replayer.run(reader) => {
            let summary = summary?;
            info!(
                "Replay finished: {} lines, {} records, {} skipped",
                summary.lines, summary.records, summary.skipped
            );
        }
        _ = signal::ctrl_c() => {
            info!("Interrupted, shutting down...");
        }
    }

    let elapsed = start_time.elapsed().as_secs();
    let probe_stats = replayer.stats();

    // Closing the probe closes the channel; wait for the collector to drain it
    drop(replayer);
    let processed = collector_task.await.context("Collector task failed")?;
    progress_task.abort();
    info!("Collected {} events", processed);

    info!("Generating metrics report...");

    let collector = collector.lock().await;
    let metrics = collector.generate_metrics(elapsed, probe_stats);

    export_format.exporter(args.output.clone()).export(&metrics)?;
    info!("Metrics written to {:?}", args.output);

    print_summary(&metrics);

    Ok(())
}

fn print_banner() {
    println!(
        r#"
╔═══════════════════════════════════════════════════╗
║        hijack - syscall I/O correlator            ║
║            trace id stitching replay              ║
╚═══════════════════════════════════════════════════╝
    "#
    );
}

fn print_summary(metrics: &IoMetrics) {
    info!("");
    info!("============================================");
    info!("             Summary Report");
    info!("============================================");
    info!("");
    info!("  Total events:       {}", metrics.total_events);
    info!("  Unique connections: {}", metrics.connections.len());
    info!("  Files:              {}", metrics.files.len());
    info!("  Trace ids:          {}", metrics.traces.distinct_ids);
    info!("  Duration:           {} seconds", metrics.duration_seconds);
    info!("");
    info!("  Latency Percentiles (μs):");
    info!("    p50:  {:>10.2}", metrics.percentiles.p50);
    info!("    p75:  {:>10.2}", metrics.percentiles.p75);
    info!("    p90:  {:>10.2}", metrics.percentiles.p90);
    info!("    p95:  {:>10.2}", metrics.percentiles.p95);
    info!("    p99:  {:>10.2}", metrics.percentiles.p99);
    info!("    p999: {:>10.2}", metrics.percentiles.p999);
    info!("");
    info!("  Histogram:");
    info!("    0-10us:      {:>8}", metrics.histogram.bucket_0_10us);
    info!("    10-100us:    {:>8}", metrics.histogram.bucket_10_100us);
    info!("    100us-1ms:   {:>8}", metrics.histogram.bucket_100us_1ms);
    info!("    1-10ms:      {:>8}", metrics.histogram.bucket_1_10ms);
    info!("    10-100ms:    {:>8}", metrics.histogram.bucket_10_100ms);
    info!("    100ms+:      {:>8}", metrics.histogram.bucket_100ms_plus);
    info!("");
    info!("  Events by syscall:");
    for (label, count) in &metrics.events_by_label {
        info!("    {:<12} {:>8}", label, count);
    }
    info!("");
    info!("  Probe counters:");
    info!("    contexts overwritten: {:>8}", metrics.probe_stats.contexts_overwritten);
    info!("    unmatched exits:      {:>8}", metrics.probe_stats.unmatched_exits);
    info!("    events suppressed:    {:>8}", metrics.probe_stats.events_suppressed);
    info!("");
    info!("============================================");
}
