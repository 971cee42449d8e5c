//! Server-authoritative interview model: phases, round types and the state snapshot.
//!
//! The client never transitions phases itself. It mirrors whatever the backend last sent in
//! [`InterviewStateSnapshot`] and derives UI behavior through [`is_coding_phase`].

use serde::{Deserialize, Serialize};

/// Interview phase as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InterviewPhase {
    #[default]
    NotStarted,
    Introduction,
    MainQuestions,
    DeepDive,
    CodingSetup,
    CodingActive,
    CodingReview,
    WrapUp,
    Completed,
}

impl InterviewPhase {
    /// Phases during which the code editor belongs on screen.
    pub fn is_coding(&self) -> bool {
        matches!(
            self,
            Self::CodingSetup | Self::CodingActive | Self::CodingReview
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Introduction => "introduction",
            Self::MainQuestions => "main_questions",
            Self::DeepDive => "deep_dive",
            Self::CodingSetup => "coding_setup",
            Self::CodingActive => "coding_active",
            Self::CodingReview => "coding_review",
            Self::WrapUp => "wrap_up",
            Self::Completed => "completed",
        }
    }
}

/// Kind of interview round. Unknown values from the backend land in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundType {
    #[default]
    Technical,
    Behavioral,
    Coding,
    SystemDesign,
    Hr,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Rolling performance metrics maintained by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    #[serde(default)]
    pub answers_evaluated: u32,
    #[serde(default)]
    pub average_score: f64,
    #[serde(default)]
    pub last_score: Option<f64>,
}

/// Backend's view of the coding portion of an interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CodingState {
    pub problem_id: Option<String>,
    #[serde(default)]
    pub hints_used: u32,
    #[serde(default)]
    pub tests_passed: u32,
    #[serde(default)]
    pub tests_total: u32,
    #[serde(default)]
    pub submitted: bool,
}

/// Latest server-authoritative snapshot of one interview. Overwritten wholesale on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewStateSnapshot {
    pub interview_id: String,
    #[serde(default)]
    pub round_type: RoundType,
    #[serde(default)]
    pub phase: InterviewPhase,
    #[serde(default)]
    pub questions_asked: u32,
    #[serde(default)]
    pub current_difficulty: Difficulty,
    #[serde(default)]
    pub performance: PerformanceMetrics,
    #[serde(default)]
    pub coding_state: Option<CodingState>,
}

impl InterviewStateSnapshot {
    pub fn new(interview_id: impl Into<String>, round_type: RoundType) -> Self {
        Self {
            interview_id: interview_id.into(),
            round_type,
            phase: InterviewPhase::NotStarted,
            questions_asked: 0,
            current_difficulty: Difficulty::Medium,
            performance: PerformanceMetrics::default(),
            coding_state: None,
        }
    }

    pub fn with_phase(mut self, phase: InterviewPhase) -> Self {
        self.phase = phase;
        self
    }
}

/// The single "is this a coding phase" predicate: explicit coding phase, or a CODING round.
pub fn is_coding_phase(snapshot: &InterviewStateSnapshot) -> bool {
    snapshot.phase.is_coding() || snapshot.round_type == RoundType::Coding
}

/// A question asked by the interviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewQuestion {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
}

/// Backend evaluation of one answer. Only valid for the question that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEvaluation {
    pub question_id: String,
    pub score: f64,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
}
