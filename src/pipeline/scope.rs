//! Request lifecycle: one cancellation scope per pipeline kind.
//!
//! A scope holds at most one in-flight request. Opening a new one cancels
//! the previous token first; only the request that currently owns the scope
//! may commit results or close it.
//!
//! A request cancelled by a replacement is remembered as superseded so it
//! can report its own interruption when it unwinds. `cancel()` forgets
//! those: whoever calls it reports the interruption once for everything.

use serde::Serialize;
use std::collections::HashSet;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestKind {
    Solve,
    Debug,
}

/// Where a pipeline is in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineStage {
    #[default]
    Idle,
    ExtractingProblem,
    GeneratingSolution,
    ExtractingError,
    GeneratingDebug,
}

/// An in-flight Solve or Debug request.
#[derive(Debug, Clone)]
pub struct ProcessingRequest {
    pub id: u64,
    pub kind: RequestKind,
    pub token: CancellationToken,
    pub issued_at: Instant,
}

impl ProcessingRequest {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug, Default)]
pub(crate) struct CancelScope {
    active: Option<ProcessingRequest>,
    stage: PipelineStage,
    superseded: HashSet<u64>,
}

impl CancelScope {
    /// Install a fresh request, cancelling whatever was in flight.
    pub(crate) fn open(&mut self, id: u64, kind: RequestKind) -> ProcessingRequest {
        if let Some(prior) = self.active.take() {
            log::info!(
                "[PIPELINE] Superseding {:?} request #{} ({}ms old)",
                prior.kind,
                prior.id,
                prior.issued_at.elapsed().as_millis()
            );
            prior.token.cancel();
            self.superseded.insert(prior.id);
        }
        let request = ProcessingRequest {
            id,
            kind,
            token: CancellationToken::new(),
            issued_at: Instant::now(),
        };
        self.active = Some(request.clone());
        self.stage = PipelineStage::Idle;
        request
    }

    /// Cancel the active request, if any. Returns whether one was cancelled.
    pub(crate) fn cancel(&mut self) -> bool {
        self.stage = PipelineStage::Idle;
        self.superseded.clear();
        match self.active.take() {
            Some(request) => {
                request.token.cancel();
                true
            }
            None => false,
        }
    }

    /// True while `id` owns the scope and has not been cancelled.
    pub(crate) fn is_current(&self, id: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|r| r.id == id && !r.token.is_cancelled())
    }

    pub(crate) fn set_stage(&mut self, stage: PipelineStage) {
        self.stage = stage;
    }

    pub(crate) fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// True once for a request that was cancelled by a replacement.
    pub(crate) fn take_superseded(&mut self, id: u64) -> bool {
        self.superseded.remove(&id)
    }

    /// Close the scope if `id` still owns it.
    pub(crate) fn finish(&mut self, id: u64) {
        if self.active.as_ref().is_some_and(|r| r.id == id) {
            self.active = None;
            self.stage = PipelineStage::Idle;
        }
    }
}
