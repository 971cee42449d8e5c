//! The candidate's coding workspace: editor sync, code runs and hints.

use std::sync::Arc;

use interview_core::{
    CodeExecutionResult, CodingHint, CodingProblem, ExecuteCodeRequest, InterviewBackend,
    InterviewError, InterviewResult, SessionStore, Timings,
};
use interview_realtime::{CodeUpdateDebouncer, RealtimeChannel};
use tracing::{info, warn};

pub struct CodingWorkspace {
    store: SessionStore,
    backend: Arc<dyn InterviewBackend>,
    debouncer: CodeUpdateDebouncer,
}

impl CodingWorkspace {
    /// Editor changes are pushed to `channel` once typing pauses.
    pub fn new(
        store: SessionStore,
        backend: Arc<dyn InterviewBackend>,
        channel: RealtimeChannel,
        timings: &Timings,
    ) -> Self {
        let debouncer = CodeUpdateDebouncer::for_channel(channel, timings.code_update_debounce());
        Self::with_debouncer(store, backend, debouncer)
    }

    pub fn with_debouncer(
        store: SessionStore,
        backend: Arc<dyn InterviewBackend>,
        debouncer: CodeUpdateDebouncer,
    ) -> Self {
        Self {
            store,
            backend,
            debouncer,
        }
    }

    /// Keystroke: the store updates now, the realtime `code_update` follows debounced.
    pub fn edit(&self, code: &str) {
        let language = self
            .store
            .read(|s| s.coding_problem.as_ref().map(|p| p.language.clone()));
        let Some(language) = language else {
            return;
        };
        self.store.update_current_code(code);
        self.debouncer.push(code, language);
    }

    pub async fn run_code(&self) -> InterviewResult<CodeExecutionResult> {
        self.execute(false).await
    }

    /// Run against the scored tests.
    pub async fn submit_code(&self) -> InterviewResult<CodeExecutionResult> {
        self.execute(true).await
    }

    async fn execute(&self, submit: bool) -> InterviewResult<CodeExecutionResult> {
        let (interview_id, problem) = self.active_problem()?;
        let request = ExecuteCodeRequest {
            interview_id,
            problem_id: problem.problem_id.clone(),
            code: problem.current_code,
            language: problem.language,
            submit,
        };
        match self.backend.execute_code(&request).await {
            Ok(result) => {
                info!(
                    problem_id = %request.problem_id,
                    submit,
                    passed = result.tests_passed(),
                    total = result.tests_total(),
                    "▶️ Code executed"
                );
                self.store.set_execution_result(Some(result.clone()));
                Ok(result)
            }
            Err(e) => {
                warn!(problem_id = %request.problem_id, error = %e, "code execution failed");
                self.store.set_error(Some(format!("Code execution failed: {}", e)));
                Err(e)
            }
        }
    }

    pub async fn request_hint(&self) -> InterviewResult<CodingHint> {
        let (interview_id, problem) = self.active_problem()?;
        if problem.hints_used > 0 && problem.hints_available == 0 {
            return Err(InterviewError::InvalidState("no hints remaining".to_string()));
        }
        let hint = self.backend.get_coding_hint(&interview_id, &problem.problem_id).await?;
        self.store.record_hint_used(hint.hints_remaining);
        info!(problem_id = %problem.problem_id, remaining = hint.hints_remaining, "💡 Hint used");
        Ok(hint)
    }

    fn active_problem(&self) -> InterviewResult<(String, CodingProblem)> {
        self.store.read(|s| {
            let problem = s
                .coding_problem
                .clone()
                .ok_or_else(|| {
                    InterviewError::InvalidState("no coding problem assigned".to_string())
                })?;
            let interview_id = s
                .interview_id()
                .map(str::to_string)
                .ok_or_else(|| {
                    InterviewError::InvalidState("no interview state loaded".to_string())
                })?;
            Ok((interview_id, problem))
        })
    }
}
