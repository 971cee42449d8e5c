//! interview-coding: the coding sub-flow of a live interview.
//!
//! [`HandoffCoordinator`] moves an interview from the voice call into the code editor and back.
//! [`CodingWorkspace`] serves the editor while the problem is open.

pub mod coordinator;
pub mod workspace;

pub use coordinator::{
    CallControl, HandoffCoordinator, HandoffStage, HandoffState, PLACEHOLDER_QUESTION,
};
pub use workspace::CodingWorkspace;
