//! interview-core: shared types, the session store, the realtime event vocabulary and the
//! backend contract for the live interview sync layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   transcript    ┌──────────────┐   detection   ┌──────────────┐
//! │  Voice Call  │───────────────→ │ SessionStore │ ────────────→ │   Coding     │
//! │   Adapter    │ ←── resume ──── │   (watch)    │ ←── problem ─ │  Hand-off    │
//! └──────────────┘                 └──────────────┘               └──────────────┘
//!        ↑ SDK events                    ↑ inbound events               ↕ REST
//! ┌──────────────┐                 ┌──────────────┐               ┌──────────────┐
//! │  Voice SDK   │                 │  Realtime    │               │   Backend    │
//! └──────────────┘                 │  Channel     │               └──────────────┘
//!                                  └──────────────┘
//! ```

pub mod backend;
pub mod coding;
pub mod config;
pub mod error;
pub mod events;
pub mod expression;
pub mod guard;
pub mod model;
pub mod store;
pub mod transcript;

pub use backend::{
    BackendCall, BackendOp, CallMetadata, CodingSubmission, ExecuteCodeRequest,
    GeneratedCodingQuestion, HttpBackend, InterviewBackend, InterviewStart, ResumeRequest,
    ScriptedBackend,
};
pub use coding::{
    CodeExecutionResult, CodingEvaluation, CodingHint, CodingProblem, CodingQuestionDetected,
    ResumeContext, TestCaseResult,
};
pub use config::{BackendMode, SyncConfig, Timings};
pub use error::{InterviewError, InterviewResult};
pub use events::{ClientEvent, ServerEvent};
pub use expression::{Emotion, ExpressionAverages, ExpressionFrame};
pub use guard::OneShotGuard;
pub use model::{
    is_coding_phase, AnswerEvaluation, Difficulty, InterviewPhase, InterviewQuestion,
    InterviewStateSnapshot, RoundType,
};
pub use store::{CallStatus, SessionState, SessionStore, SliceWatch};
pub use transcript::{ConversationBuffer, ConversationEntry, Role};
