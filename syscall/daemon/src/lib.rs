//! hijack daemon library
//!
//! Provides reusable components for replaying recorded syscall
//! observations through the probe and exporting the resulting metrics.

pub mod collector;
pub mod config;
pub mod events;
pub mod exporter;
pub mod replay;
pub mod source;
pub mod types;

pub use collector::MetricsCollector;
pub use config::ConfigFile;
pub use events::{ChannelSink, EventProcessor};
pub use exporter::{ExporterType, JsonExporter, MetricsExporter};
pub use replay::{ReplaySummary, Replayer};
pub use types::*;
