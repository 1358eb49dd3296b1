use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::presence::PresenceMonitor;
use crate::config::PresenceSettings;
use crate::telemetry::message::OutboundMessage;
use crate::telemetry::pipeline::TelemetrySink;
use crate::utils::error::PipelineError;

#[derive(Default)]
struct RecordingSink {
    messages: Mutex<Vec<OutboundMessage>>,
    reject: AtomicBool,
}

impl RecordingSink {
    fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().unwrap().clone()
    }
}

impl TelemetrySink for RecordingSink {
    fn enqueue(&self, message: OutboundMessage) -> Result<(), PipelineError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(PipelineError::QueueFull);
        }
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}

fn monitor(scan_timeout_secs: u64) -> (Arc<PresenceMonitor>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let monitor = Arc::new(PresenceMonitor::new(
        sink.clone(),
        "home",
        &PresenceSettings { scan_timeout_secs },
    ));
    (monitor, sink)
}

async fn wait_until(mut predicate: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if predicate() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn sighting_reports_on() {
    let (monitor, sink) = monitor(60);
    monitor.start().await;

    monitor.report_sighting();
    wait_until(|| !sink.messages().is_empty()).await;

    let messages = sink.messages();
    assert_eq!(messages[0].topic, "home/phone_present");
    assert_eq!(messages[0].payload, r#"{"state":"ON"}"#);

    monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn elapsed_window_without_sighting_reports_off() {
    let (monitor, sink) = monitor(300);
    monitor.start().await;

    tokio::time::sleep(Duration::from_secs(301)).await;
    wait_until(|| !sink.messages().is_empty()).await;

    let messages = sink.messages();
    assert_eq!(messages[0].payload, r#"{"state":"OFF"}"#);

    monitor.stop().await;
}

#[tokio::test]
async fn rejected_reading_is_dropped_and_the_loop_continues() {
    let (monitor, sink) = monitor(60);
    monitor.start().await;

    sink.reject.store(true, Ordering::SeqCst);
    monitor.report_sighting();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(sink.messages().is_empty());

    sink.reject.store(false, Ordering::SeqCst);
    monitor.report_sighting();
    wait_until(|| sink.messages().len() == 1).await;

    monitor.stop().await;
}

#[tokio::test]
async fn stop_without_start_is_safe() {
    let (monitor, _sink) = monitor(60);
    monitor.stop().await;
    assert!(!monitor.is_running());
}

#[tokio::test]
async fn second_start_is_a_noop() {
    let (monitor, _sink) = monitor(60);
    monitor.start().await;
    monitor.start().await;
    assert!(monitor.is_running());
    monitor.stop().await;
    assert!(!monitor.is_running());
}
