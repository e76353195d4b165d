//! Notification Channel: events from the pipeline to the UI.
//!
//! Emission is fire-and-forget: a sink must never block the orchestrator,
//! and a closed or slow UI never fails a pipeline.

use crate::capture::ScreenshotRef;
use crate::llm::ProblemInfo;
use serde::Serialize;
use tokio::sync::mpsc;

/// Everything the UI can be told.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum ProcessingEvent {
    OutOfCredits,
    /// Nothing to process, or processing was interrupted.
    NoScreenshots,
    SolveStarted,
    ProblemExtracted(ProblemInfo),
    SolutionSuccess(ProblemInfo),
    SolutionError(String),
    DebugStarted,
    DebugErrorExtracted(String),
    DebugSuccess(ProblemInfo),
    DebugError(String),
    CreditsUpdated(u32),
    ViewReset,
    ScreenshotTaken {
        screenshot: ScreenshotRef,
        preview: String,
    },
    ScreenshotDeleted(std::path::PathBuf),
}

impl ProcessingEvent {
    /// Wire name, e.g. `solution-success`.
    pub fn name(&self) -> &'static str {
        match self {
            ProcessingEvent::OutOfCredits => "out-of-credits",
            ProcessingEvent::NoScreenshots => "no-screenshots",
            ProcessingEvent::SolveStarted => "solve-started",
            ProcessingEvent::ProblemExtracted(_) => "problem-extracted",
            ProcessingEvent::SolutionSuccess(_) => "solution-success",
            ProcessingEvent::SolutionError(_) => "solution-error",
            ProcessingEvent::DebugStarted => "debug-started",
            ProcessingEvent::DebugErrorExtracted(_) => "debug-error-extracted",
            ProcessingEvent::DebugSuccess(_) => "debug-success",
            ProcessingEvent::DebugError(_) => "debug-error",
            ProcessingEvent::CreditsUpdated(_) => "credits-updated",
            ProcessingEvent::ViewReset => "view-reset",
            ProcessingEvent::ScreenshotTaken { .. } => "screenshot-taken",
            ProcessingEvent::ScreenshotDeleted(_) => "screenshot-deleted",
        }
    }
}

/// One-directional event outlet.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ProcessingEvent);
}

/// Sink backed by an unbounded channel; the receiver side is the UI.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProcessingEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProcessingEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: ProcessingEvent) {
        log::debug!("[EVENT] {}", event.name());
        if self.tx.send(event).is_err() {
            log::warn!("[EVENT] UI receiver closed — event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_kebab_tag() {
        let json = serde_json::to_value(ProcessingEvent::CreditsUpdated(4)).unwrap();
        assert_eq!(json["event"], "credits-updated");
        assert_eq!(json["payload"], 4);

        let json = serde_json::to_value(ProcessingEvent::ViewReset).unwrap();
        assert_eq!(json["event"], "view-reset");
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn name_matches_serialized_tag() {
        let events = [
            ProcessingEvent::NoScreenshots,
            ProcessingEvent::SolutionError("x".to_string()),
            ProcessingEvent::DebugErrorExtracted("y".to_string()),
            ProcessingEvent::ProblemExtracted(ProblemInfo::default()),
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["event"], event.name());
        }
    }

    #[test]
    fn closed_receiver_does_not_panic() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.emit(ProcessingEvent::SolveStarted);
    }

    #[tokio::test]
    async fn events_arrive_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.emit(ProcessingEvent::SolveStarted);
        sink.emit(ProcessingEvent::OutOfCredits);
        assert_eq!(rx.recv().await, Some(ProcessingEvent::SolveStarted));
        assert_eq!(rx.recv().await, Some(ProcessingEvent::OutOfCredits));
    }

    #[tokio::test]
    async fn dropping_the_sink_lets_a_reader_drain_and_finish() {
        let (sink, mut rx) = ChannelSink::new();
        let reader = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(event) = rx.recv().await {
                seen.push(event);
            }
            seen
        });
        sink.emit(ProcessingEvent::SolveStarted);
        sink.emit(ProcessingEvent::NoScreenshots);
        drop(sink);

        let seen = tokio::time::timeout(std::time::Duration::from_secs(5), reader)
            .await
            .expect("reader should finish once the sink is gone")
            .unwrap();
        assert_eq!(seen, vec![ProcessingEvent::SolveStarted, ProcessingEvent::NoScreenshots]);
    }
}
