//! Realtime event vocabulary.
//!
//! Frames on the wire are JSON objects `{"event": "<name>", "data": {...}}`. Inbound and
//! outbound vocabularies are closed enums so a new event kind is a compile-checked addition.

use serde::{Deserialize, Serialize};

use crate::coding::{CodeExecutionResult, CodingProblem};
use crate::error::InterviewResult;
use crate::expression::ExpressionFrame;
use crate::model::{AnswerEvaluation, InterviewQuestion, InterviewStateSnapshot};

/// Events pushed by the interview backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "interview:state_update")]
    StateUpdate(InterviewStateSnapshot),
    #[serde(rename = "interview:question_asked")]
    QuestionAsked(InterviewQuestion),
    #[serde(rename = "interview:answer_evaluated")]
    AnswerEvaluated(AnswerEvaluatedPayload),
    #[serde(rename = "interview:coding_problem_assigned")]
    CodingProblemAssigned(CodingProblem),
    #[serde(rename = "interview:code_executed")]
    CodeExecuted(CodeExecutionResult),
    #[serde(rename = "interview:error")]
    Error(ErrorPayload),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::StateUpdate(_) => "interview:state_update",
            ServerEvent::QuestionAsked(_) => "interview:question_asked",
            ServerEvent::AnswerEvaluated(_) => "interview:answer_evaluated",
            ServerEvent::CodingProblemAssigned(_) => "interview:coding_problem_assigned",
            ServerEvent::CodeExecuted(_) => "interview:code_executed",
            ServerEvent::Error(_) => "interview:error",
        }
    }

    pub fn from_json(raw: &str) -> InterviewResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEvaluatedPayload {
    pub evaluation: AnswerEvaluation,
    /// Candidate answer text the evaluation refers to, when the backend echoes it.
    #[serde(default)]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// Events sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "interview:join")]
    Join(RoomPayload),
    #[serde(rename = "interview:leave")]
    Leave(RoomPayload),
    #[serde(rename = "interview:code_update")]
    CodeUpdate(CodeUpdatePayload),
    #[serde(rename = "interview:expression_update")]
    ExpressionUpdate(ExpressionUpdatePayload),
}

impl ClientEvent {
    pub fn join(interview_id: impl Into<String>) -> Self {
        ClientEvent::Join(RoomPayload {
            interview_id: interview_id.into(),
        })
    }

    pub fn leave(interview_id: impl Into<String>) -> Self {
        ClientEvent::Leave(RoomPayload {
            interview_id: interview_id.into(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Join(_) => "interview:join",
            ClientEvent::Leave(_) => "interview:leave",
            ClientEvent::CodeUpdate(_) => "interview:code_update",
            ClientEvent::ExpressionUpdate(_) => "interview:expression_update",
        }
    }

    pub fn to_json(&self) -> InterviewResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPayload {
    pub interview_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeUpdatePayload {
    pub interview_id: String,
    pub code: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionUpdatePayload {
    pub interview_id: String,
    pub expressions: ExpressionFrame,
}
