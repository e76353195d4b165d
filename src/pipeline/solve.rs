//! Solve pipeline: Primary screenshots → problem statement → solution.

use super::{
    Orchestrator, PipelineOutcome, PipelineStage, ProcessingRequest, RequestKind, ViewState,
};
use crate::capture::QueueKind;
use crate::error::PipelineError;
use crate::events::ProcessingEvent;
use crate::llm::prompts::{build_solve_message, EXTRACT_PROBLEM_INSTRUCTION};
use crate::llm::{parse_problem, parse_solution_response, ProblemInfo, PromptPart};

impl Orchestrator {
    /// Run one Solve cycle. Exactly one terminal event is emitted. A
    /// cancelled request commits nothing and is reported as `NoScreenshots`.
    pub async fn run_solve(&self) -> PipelineOutcome {
        let opened = {
            let mut state = self.lock_state();
            if let Err(e) = state.ensure_credit() {
                Err(e)
            } else if self.lock_store().is_empty(QueueKind::Primary) {
                Err(PipelineError::NoScreenshots)
            } else {
                Ok(state.open_request(RequestKind::Solve))
            }
        };
        let request = match opened {
            Ok(request) => request,
            Err(e) => {
                log::info!("[PIPELINE] Solve not started: {}", e);
                self.emit(match e {
                    PipelineError::OutOfCredits => ProcessingEvent::OutOfCredits,
                    _ => ProcessingEvent::NoScreenshots,
                });
                return PipelineOutcome::Failed(e);
            }
        };
        log::info!("[PIPELINE] Solve request #{} opened", request.id);

        // A superseded run keeps the lane until it has unwound.
        let _lane = tokio::select! {
            biased;
            _ = request.token.cancelled() => return self.abandon(&request),
            lane = self.solve_lane.lock() => lane,
        };
        if request.is_cancelled() {
            return self.abandon(&request);
        }

        let prior_problem = self.problem();
        self.emit(ProcessingEvent::SolveStarted);

        let mut written = None;
        match self.solve_steps(&request, &mut written).await {
            Ok(()) => {
                log::info!(
                    "[PIPELINE] Solve #{} complete in {}ms",
                    request.id,
                    request.issued_at.elapsed().as_millis()
                );
                PipelineOutcome::Completed
            }
            Err(e) if e.is_cancelled() => self.abandon(&request),
            Err(e) => {
                let rolled_back = self.commit(&request, |state, _| {
                    // Only undo our own write; a Debug may have replaced it since.
                    if written.is_some_and(|generation| generation == state.problem_generation) {
                        state.replace_problem(prior_problem);
                    }
                    state.solve.finish(request.id);
                });
                if rolled_back.is_err() {
                    return self.abandon(&request);
                }
                log::error!("[PIPELINE] Solve #{} failed: {}", request.id, e);
                self.report_failure(RequestKind::Solve, &e);
                PipelineOutcome::Failed(e)
            }
        }
    }

    /// `written` receives the problem generation this request installed, so
    /// a failure can tell whether the problem record is still ours to undo.
    async fn solve_steps(
        &self,
        request: &ProcessingRequest,
        written: &mut Option<u64>,
    ) -> Result<(), PipelineError> {
        let language = self.await_language(request).await?;

        // ── Extract ──
        self.commit(request, |state, _| {
            state.solve.set_stage(PipelineStage::ExtractingProblem)
        })?;
        let mut parts = self.image_parts(&[QueueKind::Primary])?;
        log::info!("[PIPELINE] Extracting problem from {} screenshot(s)", parts.len());
        parts.push(PromptPart::text(EXTRACT_PROBLEM_INSTRUCTION));
        let raw = self
            .call_model(request, parts, self.sampling.extract_problem)
            .await?;

        let parsed = parse_problem(&raw);
        if !parsed.is_structured() {
            log::warn!("[PIPELINE] Extraction was not JSON; keeping raw text as the description");
        }
        let problem = parsed.into_problem();
        let generation = self.commit(request, |state, _| -> Result<u64, PipelineError> {
            state.ensure_credit()?;
            state.solve.set_stage(PipelineStage::GeneratingSolution);
            Ok(state.replace_problem(Some(problem.clone())))
        })??;
        *written = Some(generation);
        self.emit(ProcessingEvent::ProblemExtracted(problem.clone()));

        // ── Solve ──
        let message = build_solve_message(&problem, &language);
        let raw = self
            .call_model(request, vec![PromptPart::text(message)], self.sampling.solve)
            .await?;
        let record = parse_solution_response(&raw, &language);

        let committed = self.commit(request, |state, store| -> Result<_, PipelineError> {
            state.ensure_credit()?;
            let solved = ProblemInfo {
                solution: Some(record.solution),
                solution_language: Some(record.language),
                debug_solution: None,
                ..problem
            };
            *written = Some(state.replace_problem(Some(solved.clone())));
            store.clear_auxiliary();
            state.view = ViewState::Solutions;
            state.has_debugged = false;
            state.credits -= 1;
            state.solve.finish(request.id);
            Ok((solved, state.credits))
        })?;
        let (solved, credits) = committed?;

        self.emit(ProcessingEvent::SolutionSuccess(solved));
        self.emit(ProcessingEvent::CreditsUpdated(credits));
        Ok(())
    }
}
