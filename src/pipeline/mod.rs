//! Processing Orchestrator: owns view state, the problem record, credits
//! and the two request scopes, and drives the Solve and Debug pipelines.
//!
//!   - mod.rs     state, commands (capture/delete/cancel/reset/...), shared helpers
//!   - solve.rs   screenshots → problem statement → solution
//!   - debug.rs   screenshots of a failing run → error description → fix
//!   - scope.rs   per-kind cancellation scopes
//!
//! State lives behind one `std::sync::Mutex` that is never held across an
//! await. Each pipeline kind also has an async lane, so a replacement
//! request waits for the one it cancelled to unwind before calling the model.

mod debug;
mod scope;
mod solve;

pub use scope::{PipelineStage, ProcessingRequest, RequestKind};

use crate::capture::{NoSource, QueueKind, ScreenSource, ScreenshotRef, ScreenshotStore};
use crate::config::PipelineSampling;
use crate::error::{CaptureError, PipelineError, StoreError};
use crate::events::{EventSink, ProcessingEvent};
use crate::llm::prompts::SYSTEM_PROMPT;
use crate::llm::{LlmGateway, ProblemInfo, PromptPart, RequestOptions, SamplingParams};
use crate::preferences::Preferences;
use image::DynamicImage;
use scope::CancelScope;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Which screen the UI is showing. Decides where captures go and whether
/// debugging is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewState {
    #[default]
    Queue,
    Solutions,
    Debug,
}

impl ViewState {
    /// Queue view captures problem screenshots; every later view captures
    /// debugging context.
    pub fn capture_queue(self) -> QueueKind {
        match self {
            ViewState::Queue => QueueKind::Primary,
            ViewState::Solutions | ViewState::Debug => QueueKind::Auxiliary,
        }
    }
}

/// How a `run_solve` / `run_debug` call ended. The matching event has
/// already been emitted by the time this is returned.
#[derive(Debug)]
pub enum PipelineOutcome {
    Completed,
    Cancelled,
    Failed(PipelineError),
}

impl PipelineOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PipelineOutcome::Completed)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineOutcome::Cancelled)
    }
}

/// Pipeline knobs taken from `AppConfig`.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub initial_credits: u32,
    pub sampling: PipelineSampling,
}

pub(crate) struct SessionState {
    view: ViewState,
    problem: Option<ProblemInfo>,
    /// Bumped whenever `problem` is replaced wholesale, so a Debug can tell
    /// that the problem it started from is gone.
    problem_generation: u64,
    credits: u32,
    has_debugged: bool,
    solve: CancelScope,
    debug: CancelScope,
    next_request_id: u64,
}

impl SessionState {
    fn scope_mut(&mut self, kind: RequestKind) -> &mut CancelScope {
        match kind {
            RequestKind::Solve => &mut self.solve,
            RequestKind::Debug => &mut self.debug,
        }
    }

    fn scope(&self, kind: RequestKind) -> &CancelScope {
        match kind {
            RequestKind::Solve => &self.solve,
            RequestKind::Debug => &self.debug,
        }
    }

    fn open_request(&mut self, kind: RequestKind) -> ProcessingRequest {
        self.next_request_id += 1;
        let id = self.next_request_id;
        self.scope_mut(kind).open(id, kind)
    }

    fn replace_problem(&mut self, problem: Option<ProblemInfo>) -> u64 {
        self.problem = problem;
        self.problem_generation += 1;
        self.problem_generation
    }

    /// The problem record, provided nothing has replaced it since `generation`.
    fn problem_since(&self, generation: u64) -> Result<ProblemInfo, PipelineError> {
        if self.problem_generation != generation {
            return Err(PipelineError::ProblemChanged);
        }
        self.problem.clone().ok_or(PipelineError::MissingProblemInfo)
    }

    /// Credits are checked again inside every commit that can end in a spend.
    fn ensure_credit(&self) -> Result<(), PipelineError> {
        if self.credits < 1 {
            return Err(PipelineError::OutOfCredits);
        }
        Ok(())
    }
}

pub struct Orchestrator {
    state: Mutex<SessionState>,
    store: Mutex<ScreenshotStore>,
    gateway: Arc<dyn LlmGateway>,
    sink: Arc<dyn EventSink>,
    source: Arc<dyn ScreenSource>,
    preferences: Arc<Preferences>,
    sampling: PipelineSampling,
    solve_lane: tokio::sync::Mutex<()>,
    debug_lane: tokio::sync::Mutex<()>,
}

impl Orchestrator {
    pub fn new(
        store: ScreenshotStore,
        gateway: Arc<dyn LlmGateway>,
        sink: Arc<dyn EventSink>,
        preferences: Arc<Preferences>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            state: Mutex::new(SessionState {
                view: ViewState::Queue,
                problem: None,
                problem_generation: 0,
                credits: settings.initial_credits,
                has_debugged: false,
                solve: CancelScope::default(),
                debug: CancelScope::default(),
                next_request_id: 0,
            }),
            store: Mutex::new(store),
            gateway,
            sink,
            source: Arc::new(NoSource),
            preferences,
            sampling: settings.sampling,
            solve_lane: tokio::sync::Mutex::new(()),
            debug_lane: tokio::sync::Mutex::new(()),
        }
    }

    /// Use `source` for `capture()`.
    pub fn with_source(mut self, source: Arc<dyn ScreenSource>) -> Self {
        self.source = source;
        self
    }

    // ── Reads ──────────────────────────────────────────────────────

    pub fn view(&self) -> ViewState {
        self.lock_state().view
    }

    pub fn problem(&self) -> Option<ProblemInfo> {
        self.lock_state().problem.clone()
    }

    pub fn get_credits(&self) -> u32 {
        self.lock_state().credits
    }

    pub fn has_debugged(&self) -> bool {
        self.lock_state().has_debugged
    }

    pub fn stage(&self, kind: RequestKind) -> PipelineStage {
        self.lock_state().scope(kind).stage()
    }

    pub fn is_processing(&self, kind: RequestKind) -> bool {
        self.lock_state().scope(kind).is_active()
    }

    pub fn screenshots(&self, kind: QueueKind) -> Vec<ScreenshotRef> {
        self.lock_store().list(kind)
    }

    pub fn language(&self) -> String {
        self.preferences.language()
    }

    // ── Commands ───────────────────────────────────────────────────

    /// Grab from the configured source into the queue the current view
    /// selects.
    pub fn capture(&self) -> Result<ScreenshotRef, CaptureError> {
        let image = self.source.grab()?;
        self.capture_image(&image)
    }

    /// Store an already-grabbed image into the queue the current view
    /// selects, then tell the UI about it.
    pub fn capture_image(&self, image: &DynamicImage) -> Result<ScreenshotRef, CaptureError> {
        let (screenshot, preview) = {
            let state = self.lock_state();
            let mut store = self.lock_store();
            let screenshot = store.capture(state.view.capture_queue(), image)?;
            let preview = store.preview(&screenshot.path).unwrap_or_else(|e| {
                log::warn!("[CAPTURE] Preview failed for {}: {}", screenshot.path.display(), e);
                String::new()
            });
            (screenshot, preview)
        };
        self.emit(ProcessingEvent::ScreenshotTaken {
            screenshot: screenshot.clone(),
            preview,
        });
        Ok(screenshot)
    }

    pub fn delete_screenshot(&self, path: &Path) -> Result<(), StoreError> {
        self.lock_store().delete(path)?;
        self.emit(ProcessingEvent::ScreenshotDeleted(path.to_path_buf()));
        Ok(())
    }

    pub fn set_language(&self, code: &str) {
        self.preferences.set_language(code);
    }

    /// Cancel every in-flight request. With nothing in flight this is a
    /// no-op; otherwise the problem record is dropped and the UI is sent
    /// back to waiting with a single `NoScreenshots`.
    pub fn cancel_all(&self) -> bool {
        let cancelled = {
            let mut state = self.lock_state();
            let solve = state.solve.cancel();
            let debug = state.debug.cancel();
            if solve || debug {
                state.replace_problem(None);
                state.has_debugged = false;
            }
            solve || debug
        };
        if cancelled {
            log::info!("[PIPELINE] Cancelled in-flight processing");
            self.emit(ProcessingEvent::NoScreenshots);
        }
        cancelled
    }

    /// Back to a clean Queue view: cancels requests, empties both queues,
    /// drops the problem record. Emits exactly one `ViewReset`.
    pub fn reset(&self) {
        {
            let mut state = self.lock_state();
            state.solve.cancel();
            state.debug.cancel();
            state.replace_problem(None);
            state.has_debugged = false;
            state.view = ViewState::Queue;
            self.lock_store().clear_all();
        }
        log::info!("[PIPELINE] Reset to queue view");
        self.emit(ProcessingEvent::ViewReset);
    }

    // ── Shared pipeline helpers ────────────────────────────────────

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_store(&self) -> MutexGuard<'_, ScreenshotStore> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: ProcessingEvent) {
        self.sink.emit(event);
    }

    /// Run `apply` only if `request` still owns its scope. State and store
    /// are locked together (always in that order) so a cancel cannot slip
    /// between the ownership check and the write.
    fn commit<R>(
        &self,
        request: &ProcessingRequest,
        apply: impl FnOnce(&mut SessionState, &mut ScreenshotStore) -> R,
    ) -> Result<R, PipelineError> {
        let mut state = self.lock_state();
        if !state.scope(request.kind).is_current(request.id) {
            return Err(PipelineError::cancelled());
        }
        let mut store = self.lock_store();
        Ok(apply(&mut state, &mut store))
    }

    /// Release the scope for a request that stopped because it was cancelled.
    /// A request replaced by a newer one reports its interruption here;
    /// `cancel_all` and `reset` report their own.
    fn abandon(&self, request: &ProcessingRequest) -> PipelineOutcome {
        log::info!(
            "[PIPELINE] {:?} request #{} cancelled after {}ms",
            request.kind,
            request.id,
            request.issued_at.elapsed().as_millis()
        );
        let replaced = {
            let mut state = self.lock_state();
            let scope = state.scope_mut(request.kind);
            scope.finish(request.id);
            scope.take_superseded(request.id)
        };
        if replaced {
            self.emit(ProcessingEvent::NoScreenshots);
        }
        PipelineOutcome::Cancelled
    }

    /// Report a pipeline failure with the event its cause calls for.
    fn report_failure(&self, kind: RequestKind, error: &PipelineError) {
        let event = match (error, kind) {
            (PipelineError::OutOfCredits, _) => ProcessingEvent::OutOfCredits,
            (_, RequestKind::Solve) => ProcessingEvent::SolutionError(error.user_message()),
            (_, RequestKind::Debug) => ProcessingEvent::DebugError(error.user_message()),
        };
        self.emit(event);
    }

    /// Wait for UI readiness once, then read the language preference.
    async fn await_language(&self, request: &ProcessingRequest) -> Result<String, PipelineError> {
        tokio::select! {
            biased;
            _ = request.token.cancelled() => Err(PipelineError::cancelled()),
            _ = self.preferences.wait_ready() => Ok(self.preferences.language()),
        }
    }

    /// One Gateway call. Stops waiting the moment the token fires, and never
    /// hands back data that arrived after cancellation.
    async fn call_model(
        &self,
        request: &ProcessingRequest,
        parts: Vec<PromptPart>,
        sampling: SamplingParams,
    ) -> Result<String, PipelineError> {
        let options = RequestOptions::new(sampling, SYSTEM_PROMPT);
        let start = std::time::Instant::now();
        let text = tokio::select! {
            biased;
            _ = request.token.cancelled() => return Err(PipelineError::cancelled()),
            result = self.gateway.send(parts, options, &request.token) => result?,
        };
        if request.is_cancelled() {
            return Err(PipelineError::cancelled());
        }
        log::info!(
            "[PIPELINE] {:?} #{} model call: {}ms, {} chars",
            request.kind,
            request.id,
            start.elapsed().as_millis(),
            text.len()
        );
        if text.trim().is_empty() {
            return Err(PipelineError::EmptyResponse);
        }
        Ok(text)
    }

    /// Images of the given queues, in queue order, as prompt parts.
    fn image_parts(&self, kinds: &[QueueKind]) -> Result<Vec<PromptPart>, PipelineError> {
        let refs: Vec<ScreenshotRef> = {
            let store = self.lock_store();
            kinds.iter().flat_map(|kind| store.list(*kind)).collect()
        };
        let images = ScreenshotStore::load_images(&refs)?;
        Ok(images.into_iter().map(PromptPart::Image).collect())
    }
}
