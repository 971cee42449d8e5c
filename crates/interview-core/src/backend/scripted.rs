//! In-memory scripted backend.
//!
//! Returns canned responses, records every call in order, and can be told to fail or hang a
//! specific operation. Used for `backend_mode = "mock"` and throughout the tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use super::{
    CallMetadata, CodingSubmission, ExecuteCodeRequest, GeneratedCodingQuestion, InterviewBackend,
    InterviewStart, ResumeRequest,
};
use crate::coding::{CodeExecutionResult, CodingEvaluation, CodingHint, ResumeContext};
use crate::error::{InterviewError, InterviewResult};
use crate::model::{InterviewStateSnapshot, RoundType};
use crate::transcript::ConversationEntry;

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    StartInterview(String),
    SaveTranscript { interview_id: String, transcript: Vec<ConversationEntry> },
    SaveCallMetadata(CallMetadata),
    GetInterviewState(String),
    InitializeInterviewState(String, RoundType),
    GenerateCodingQuestion { interview_id: String, turns: usize },
    EvaluateCodingSolution(CodingSubmission),
    BuildResumeContext(ResumeRequest),
    ExecuteCode(ExecuteCodeRequest),
    GetCodingHint { interview_id: String, problem_id: String },
}

impl BackendCall {
    pub fn op(&self) -> BackendOp {
        match self {
            BackendCall::StartInterview(_) => BackendOp::StartInterview,
            BackendCall::SaveTranscript { .. } => BackendOp::SaveTranscript,
            BackendCall::SaveCallMetadata(_) => BackendOp::SaveCallMetadata,
            BackendCall::GetInterviewState(_) => BackendOp::GetInterviewState,
            BackendCall::InitializeInterviewState(..) => BackendOp::InitializeInterviewState,
            BackendCall::GenerateCodingQuestion { .. } => BackendOp::GenerateCodingQuestion,
            BackendCall::EvaluateCodingSolution(_) => BackendOp::EvaluateCodingSolution,
            BackendCall::BuildResumeContext(_) => BackendOp::BuildResumeContext,
            BackendCall::ExecuteCode(_) => BackendOp::ExecuteCode,
            BackendCall::GetCodingHint { .. } => BackendOp::GetCodingHint,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    StartInterview,
    SaveTranscript,
    SaveCallMetadata,
    GetInterviewState,
    InitializeInterviewState,
    GenerateCodingQuestion,
    EvaluateCodingSolution,
    BuildResumeContext,
    ExecuteCode,
    GetCodingHint,
}

#[derive(Default)]
struct Script {
    calls: Vec<BackendCall>,
    failing: HashSet<BackendOp>,
    hanging: HashSet<BackendOp>,
    state: Option<InterviewStateSnapshot>,
    round_type: RoundType,
    question: Option<String>,
    evaluation: Option<CodingEvaluation>,
    execution: Option<CodeExecutionResult>,
}

/// Scripted stand-in for the interview backend.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<Script>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` return a backend error until [`ScriptedBackend::succeed`] is called.
    pub fn fail(&self, op: BackendOp) -> &Self {
        self.lock().failing.insert(op);
        self
    }

    /// Clear a scripted failure or hang for `op`. Calls already hanging stay pending.
    pub fn succeed(&self, op: BackendOp) -> &Self {
        let mut script = self.lock();
        script.failing.remove(&op);
        script.hanging.remove(&op);
        drop(script);
        self
    }

    /// Make `op` never complete.
    pub fn hang(&self, op: BackendOp) -> &Self {
        self.lock().hanging.insert(op);
        self
    }

    pub fn with_round_type(&self, round_type: RoundType) -> &Self {
        self.lock().round_type = round_type;
        self
    }

    pub fn with_question(&self, question: impl Into<String>) -> &Self {
        self.lock().question = Some(question.into());
        self
    }

    pub fn with_evaluation(&self, evaluation: CodingEvaluation) -> &Self {
        self.lock().evaluation = Some(evaluation);
        self
    }

    pub fn with_execution(&self, result: CodeExecutionResult) -> &Self {
        self.lock().execution = Some(result);
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    pub fn count(&self, op: BackendOp) -> usize {
        self.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the call, then apply the scripted failure / hang for its op.
    async fn record(&self, call: BackendCall) -> InterviewResult<()> {
        let op = call.op();
        let (fails, hangs) = {
            let mut script = self.lock();
            script.calls.push(call);
            (script.failing.contains(&op), script.hanging.contains(&op))
        };
        if hangs {
            std::future::pending::<()>().await;
        }
        if fails {
            return Err(InterviewError::Backend {
                status: 500,
                message: format!("scripted failure: {:?}", op),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl InterviewBackend for ScriptedBackend {
    async fn start_interview(&self, interview_id: &str) -> InterviewResult<InterviewStart> {
        self.record(BackendCall::StartInterview(interview_id.to_string())).await?;
        Ok(InterviewStart {
            interview_id: interview_id.to_string(),
            round_type: self.lock().round_type,
            variable_values: serde_json::json!({ "interviewId": interview_id }),
        })
    }

    async fn save_transcript(
        &self,
        interview_id: &str,
        transcript: &[ConversationEntry],
    ) -> InterviewResult<()> {
        self.record(BackendCall::SaveTranscript {
            interview_id: interview_id.to_string(),
            transcript: transcript.to_vec(),
        })
        .await?;
        info!(interview_id, entries = transcript.len(), "scripted transcript saved");
        Ok(())
    }

    async fn save_call_metadata(&self, metadata: &CallMetadata) -> InterviewResult<()> {
        self.record(BackendCall::SaveCallMetadata(metadata.clone())).await
    }

    async fn get_interview_state(
        &self,
        interview_id: &str,
    ) -> InterviewResult<Option<InterviewStateSnapshot>> {
        self.record(BackendCall::GetInterviewState(interview_id.to_string())).await?;
        Ok(self.lock().state.clone())
    }

    async fn initialize_interview_state(
        &self,
        interview_id: &str,
        round_type: RoundType,
    ) -> InterviewResult<InterviewStateSnapshot> {
        self.record(BackendCall::InitializeInterviewState(interview_id.to_string(), round_type))
            .await?;
        let snapshot = InterviewStateSnapshot::new(interview_id, round_type);
        self.lock().state = Some(snapshot.clone());
        Ok(snapshot)
    }

    async fn generate_coding_question(
        &self,
        interview_id: &str,
        conversation: &[ConversationEntry],
    ) -> InterviewResult<GeneratedCodingQuestion> {
        self.record(BackendCall::GenerateCodingQuestion {
            interview_id: interview_id.to_string(),
            turns: conversation.len(),
        })
        .await?;
        let question = self
            .lock()
            .question
            .clone()
            .unwrap_or_else(|| "Write a function that reverses a linked list.".to_string());
        Ok(GeneratedCodingQuestion {
            question,
            starter_code: Some("def solve(head):\n    pass\n".to_string()),
            language: Some("python".to_string()),
        })
    }

    async fn evaluate_coding_solution(
        &self,
        submission: &CodingSubmission,
    ) -> InterviewResult<CodingEvaluation> {
        self.record(BackendCall::EvaluateCodingSolution(submission.clone())).await?;
        Ok(self.lock().evaluation.clone().unwrap_or(CodingEvaluation {
            score: 7.0,
            passed: true,
            feedback: "Correct approach with minor edge-case gaps.".to_string(),
        }))
    }

    async fn build_resume_context(
        &self,
        request: &ResumeRequest,
    ) -> InterviewResult<ResumeContext> {
        self.record(BackendCall::BuildResumeContext(request.clone())).await?;
        Ok(ResumeContext {
            system_prompt: format!(
                "Continue the interview. The candidate scored {:.1} on the coding task: {}",
                request.evaluation.score, request.evaluation.feedback
            ),
            first_message: "Thanks for working through that problem. Let's talk about your \
                            solution."
                .to_string(),
        })
    }

    async fn execute_code(
        &self,
        request: &ExecuteCodeRequest,
    ) -> InterviewResult<CodeExecutionResult> {
        self.record(BackendCall::ExecuteCode(request.clone())).await?;
        Ok(self.lock().execution.clone().unwrap_or(CodeExecutionResult {
            success: true,
            stdout: String::new(),
            stderr: String::new(),
            execution_time_ms: 12,
            test_results: Vec::new(),
        }))
    }

    async fn get_coding_hint(
        &self,
        interview_id: &str,
        problem_id: &str,
    ) -> InterviewResult<CodingHint> {
        self.record(BackendCall::GetCodingHint {
            interview_id: interview_id.to_string(),
            problem_id: problem_id.to_string(),
        })
        .await?;
        Ok(CodingHint {
            hint: "Consider iterating with two pointers.".to_string(),
            hints_remaining: 2,
        })
    }
}
