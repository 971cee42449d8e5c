//! interview-voice: the voice call side of a live interview.
//!
//! [`VoiceCallAdapter`] drives a [`VoiceSdk`] and folds its callbacks into the session store.
//! Final assistant turns are scanned by the [`TriggerDetector`]; the first hit stops the call
//! and publishes a coding hand-off. [`ExpressionAggregator`] averages camera samples for the
//! call-end metadata.

pub mod call;
pub mod expressions;
pub mod sdk;
pub mod trigger;

pub use call::{CallSnapshot, StopOutcome, VoiceCallAdapter};
pub use expressions::ExpressionAggregator;
pub use sdk::{
    CallOptions, PlaceholderSdk, SdkCall, SdkEvent, TranscriptDelta, TranscriptKind, VoiceSdk,
};
pub use trigger::{TriggerDetector, TRIGGER_PHRASES};
