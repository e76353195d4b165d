//! Debug pipeline: screenshots of a failing run → error description → fix.

use super::{
    Orchestrator, PipelineOutcome, PipelineStage, ProcessingRequest, RequestKind, ViewState,
};
use crate::capture::QueueKind;
use crate::error::PipelineError;
use crate::events::ProcessingEvent;
use crate::llm::prompts::{build_debug_message, EXTRACT_ERROR_INSTRUCTION};
use crate::llm::{parse_debug_response, PromptPart};

impl Orchestrator {
    /// Run one Debug cycle against the current solution. Needs a solved
    /// problem and at least one Auxiliary screenshot.
    pub async fn run_debug(&self) -> PipelineOutcome {
        let opened = {
            let mut state = self.lock_state();
            let precheck = match (&state.view, &state.problem) {
                (ViewState::Queue, _) => Err(PipelineError::MissingSolution),
                (_, None) => Err(PipelineError::MissingProblemInfo),
                (_, Some(problem)) if !problem.has_solution() => {
                    Err(PipelineError::MissingSolution)
                }
                _ => state.ensure_credit().and_then(|()| {
                    if self.lock_store().is_empty(QueueKind::Auxiliary) {
                        Err(PipelineError::NoScreenshots)
                    } else {
                        Ok(())
                    }
                }),
            };
            precheck.map(|()| (state.open_request(RequestKind::Debug), state.problem_generation))
        };
        let (request, base) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                log::info!("[PIPELINE] Debug not started: {}", e);
                self.emit(match e {
                    PipelineError::OutOfCredits => ProcessingEvent::OutOfCredits,
                    PipelineError::NoScreenshots => ProcessingEvent::NoScreenshots,
                    ref other => ProcessingEvent::DebugError(other.user_message()),
                });
                return PipelineOutcome::Failed(e);
            }
        };
        log::info!("[PIPELINE] Debug request #{} opened", request.id);

        let _lane = tokio::select! {
            biased;
            _ = request.token.cancelled() => return self.abandon(&request),
            lane = self.debug_lane.lock() => lane,
        };
        if request.is_cancelled() {
            return self.abandon(&request);
        }

        self.emit(ProcessingEvent::DebugStarted);

        match self.debug_steps(&request, base).await {
            Ok(()) => {
                log::info!(
                    "[PIPELINE] Debug #{} complete in {}ms",
                    request.id,
                    request.issued_at.elapsed().as_millis()
                );
                PipelineOutcome::Completed
            }
            Err(e) if e.is_cancelled() => self.abandon(&request),
            Err(e) => {
                if self.commit(&request, |state, _| state.debug.finish(request.id)).is_err() {
                    return self.abandon(&request);
                }
                log::error!("[PIPELINE] Debug #{} failed: {}", request.id, e);
                self.report_failure(RequestKind::Debug, &e);
                PipelineOutcome::Failed(e)
            }
        }
    }

    /// `base` is the problem generation the request was opened against. A
    /// Solve that replaces the problem in the meantime fails this Debug
    /// instead of letting the fix land on a different problem.
    async fn debug_steps(
        &self,
        request: &ProcessingRequest,
        base: u64,
    ) -> Result<(), PipelineError> {
        let language = self.await_language(request).await?;

        // ── Extract the error ──
        self.commit(request, |state, _| {
            state.debug.set_stage(PipelineStage::ExtractingError)
        })?;
        let mut parts = self.image_parts(&[QueueKind::Primary, QueueKind::Auxiliary])?;
        log::info!("[PIPELINE] Extracting error from {} screenshot(s)", parts.len());
        parts.push(PromptPart::text(EXTRACT_ERROR_INSTRUCTION));
        let description = self
            .call_model(request, parts, self.sampling.extract_error)
            .await?
            .trim()
            .to_string();

        // The most recent code is what the user ran: a previous fix if there
        // is one, otherwise the original solution.
        let current = self.commit(request, |state, _| -> Result<_, PipelineError> {
            let problem = state.problem_since(base)?;
            state.ensure_credit()?;
            state.debug.set_stage(PipelineStage::GeneratingDebug);
            Ok(problem)
        })??;
        let code = current
            .debug_solution
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| current.solution.clone())
            .ok_or(PipelineError::MissingSolution)?;
        self.emit(ProcessingEvent::DebugErrorExtracted(description.clone()));

        // ── Fix ──
        let message = build_debug_message(&current, &code, &description, &language);
        let raw = self
            .call_model(request, vec![PromptPart::text(message)], self.sampling.debug)
            .await?;
        let record = parse_debug_response(&raw, &language);

        let committed = self.commit(request, |state, _| -> Result<_, PipelineError> {
            let mut debugged = state.problem_since(base)?;
            state.ensure_credit()?;
            debugged.debug_solution = Some(record.debug_solution);
            state.replace_problem(Some(debugged.clone()));
            state.view = ViewState::Debug;
            state.has_debugged = true;
            state.credits -= 1;
            state.debug.finish(request.id);
            Ok((debugged, state.credits))
        })?;
        let (debugged, credits) = committed?;

        self.emit(ProcessingEvent::DebugSuccess(debugged));
        self.emit(ProcessingEvent::CreditsUpdated(credits));
        Ok(())
    }
}
