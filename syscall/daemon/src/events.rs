//! Event processing
//!
//! The probe pushes events into an unbounded channel; a collector task
//! drains it into the shared metrics collector.

use crate::collector::MetricsCollector;
use hijack_probe::{EventSink, ProbeEvent};
use log::{debug, info};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
    time::interval,
};

/// Probe sink forwarding events into a channel
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProbeEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver its events arrive on
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProbeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn output(&self, event: ProbeEvent) {
        // receiver gone means we are shutting down
        let _ = self.tx.send(event);
    }
}

/// Feeds probe events into the metrics collector
pub struct EventProcessor {
    collector: Arc<Mutex<MetricsCollector>>,
    verbose: bool,
}

impl EventProcessor {
    /// Create a new event processor
    ///
    /// # Arguments
    ///
    /// * `collector` - Shared metrics collector
    /// * `verbose` - Log every event at debug level
    pub fn new(collector: Arc<Mutex<MetricsCollector>>, verbose: bool) -> Self {
        Self { collector, verbose }
    }

    /// Spawn the collector task
    ///
    /// The task ends once every sender is dropped and the channel is
    /// drained; it returns the number of events it processed.
    pub fn spawn_collector(&self, mut rx: mpsc::UnboundedReceiver<ProbeEvent>) -> JoinHandle<u64> {
        let collector_clone = Arc::clone(&self.collector);
        let verbose = self.verbose;

        tokio::spawn(async move {
            let mut processed = 0u64;

            while let Some(event) = rx.recv().await {
                if verbose {
                    debug!(
                        "Event: {} tgid={} pid={} fd={} ret={} latency: {:.2}μs, kind: {}, trace: {:?}",
                        event.label,
                        event.tgid,
                        event.pid,
                        event.fd,
                        event.ret,
                        event.latency_ns as f64 / 1000.0,
                        event.detail.kind(),
                        event.trace_id
                    );
                }

                let mut collector = collector_clone.lock().await;
                collector.add_event(&event);
                processed += 1;
            }

            processed
        })
    }

    /// Spawn progress reporter
    ///
    /// Creates a task that periodically reports collection progress.
    ///
    /// # Arguments
    ///
    /// * `interval_secs` - Reporting interval in seconds
    pub fn spawn_progress_reporter(&self, interval_secs: u64) -> JoinHandle<()> {
        let collector_clone = Arc::clone(&self.collector);

        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
            // first tick fires immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let collector = collector_clone.lock().await;
                info!(
                    "Progress: {} events collected, {} unique connections, {} trace ids",
                    collector.event_count(),
                    collector.connection_count(),
                    collector.trace_count()
                );
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hijack_probe::EventDetail;

    fn event(fd: u32) -> ProbeEvent {
        ProbeEvent {
            label: "write",
            tgid: 100,
            pid: 101,
            fd,
            ret: 1,
            latency_ns: 1_000,
            detail: EventDetail::Regular {
                name: "app.log".to_string(),
            },
            trace_id: None,
        }
    }

    #[tokio::test]
    async fn test_collector_task_drains_channel() {
        let collector = Arc::new(Mutex::new(MetricsCollector::new()));
        let processor = EventProcessor::new(Arc::clone(&collector), true);

        let (sink, rx) = ChannelSink::channel();
        let handle = processor.spawn_collector(rx);

        for fd in 0..10 {
            sink.output(event(fd));
        }
        drop(sink);

        assert_eq!(handle.await.unwrap(), 10);
        assert_eq!(collector.lock().await.event_count(), 10);
    }

    #[tokio::test]
    async fn test_sink_survives_closed_receiver() {
        let (sink, rx) = ChannelSink::channel();
        drop(rx);
        sink.output(event(3));
    }

    #[tokio::test]
    async fn test_progress_reporter_can_be_aborted() {
        let collector = Arc::new(Mutex::new(MetricsCollector::new()));
        let processor = EventProcessor::new(collector, false);

        let handle = processor.spawn_progress_reporter(1);
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
