//! Backend contract: the request/response surface the sync layer depends on.
//!
//! The backend is an external collaborator. [`HttpBackend`] talks to it over JSON/HTTP;
//! [`ScriptedBackend`] is an in-memory stand-in that records calls and can be told to fail.

mod http;
mod scripted;

pub use http::HttpBackend;
pub use scripted::{BackendCall, BackendOp, ScriptedBackend};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coding::{CodeExecutionResult, CodingEvaluation, CodingHint, ResumeContext};
use crate::error::InterviewResult;
use crate::expression::ExpressionAverages;
use crate::model::{InterviewStateSnapshot, RoundType};
use crate::transcript::ConversationEntry;

/// Response of `start_interview`: what the voice call needs to begin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewStart {
    pub interview_id: String,
    #[serde(default)]
    pub round_type: RoundType,
    /// Template variables forwarded to the voice assistant.
    #[serde(default)]
    pub variable_values: serde_json::Value,
}

/// Call metadata persisted once per call, including averaged expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallMetadata {
    pub interview_id: String,
    pub call_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: Option<i64>,
    pub expressions: ExpressionAverages,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCodingQuestion {
    pub question: String,
    #[serde(default)]
    pub starter_code: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodingSubmission {
    pub interview_id: String,
    pub question: String,
    pub solution: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRequest {
    pub interview_id: String,
    pub question: String,
    pub solution: String,
    pub evaluation: CodingEvaluation,
    pub conversation: Vec<ConversationEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCodeRequest {
    pub interview_id: String,
    pub problem_id: String,
    pub code: String,
    pub language: String,
    /// `true` scores against the hidden tests; `false` is a plain run.
    #[serde(default)]
    pub submit: bool,
}

/// All backend calls made by the sync layer.
#[async_trait]
pub trait InterviewBackend: Send + Sync {
    async fn start_interview(&self, interview_id: &str) -> InterviewResult<InterviewStart>;

    async fn save_transcript(
        &self,
        interview_id: &str,
        transcript: &[ConversationEntry],
    ) -> InterviewResult<()>;

    async fn save_call_metadata(&self, metadata: &CallMetadata) -> InterviewResult<()>;

    async fn get_interview_state(
        &self,
        interview_id: &str,
    ) -> InterviewResult<Option<InterviewStateSnapshot>>;

    async fn initialize_interview_state(
        &self,
        interview_id: &str,
        round_type: RoundType,
    ) -> InterviewResult<InterviewStateSnapshot>;

    async fn generate_coding_question(
        &self,
        interview_id: &str,
        conversation: &[ConversationEntry],
    ) -> InterviewResult<GeneratedCodingQuestion>;

    async fn evaluate_coding_solution(
        &self,
        submission: &CodingSubmission,
    ) -> InterviewResult<CodingEvaluation>;

    async fn build_resume_context(&self, request: &ResumeRequest) -> InterviewResult<ResumeContext>;

    async fn execute_code(
        &self,
        request: &ExecuteCodeRequest,
    ) -> InterviewResult<CodeExecutionResult>;

    async fn get_coding_hint(
        &self,
        interview_id: &str,
        problem_id: &str,
    ) -> InterviewResult<CodingHint>;
}
