//! Client projection of the coding challenge and code execution results.

use serde::{Deserialize, Serialize};

use crate::transcript::ConversationEntry;

/// Coding problem as the client sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CodingProblem {
    pub problem_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub current_code: String,
    #[serde(default)]
    pub starter_code: String,
    #[serde(default)]
    pub hints_used: u32,
    #[serde(default)]
    pub hints_available: u32,
    #[serde(default)]
    pub tests_passed: u32,
    #[serde(default)]
    pub tests_total: u32,
}

fn default_language() -> String {
    "python".to_string()
}

impl CodingProblem {
    /// Starter code preference: `starter_code`, then `current_code`, then empty.
    pub fn normalized_starter_code(&self) -> String {
        if !self.starter_code.trim().is_empty() {
            self.starter_code.clone()
        } else if !self.current_code.trim().is_empty() {
            self.current_code.clone()
        } else {
            String::new()
        }
    }

    /// Placeholder created the instant a trigger phrase is detected; filled by generation.
    pub fn pending(problem_id: impl Into<String>) -> Self {
        Self {
            problem_id: problem_id.into(),
            language: default_language(),
            ..Default::default()
        }
    }
}

/// Outcome of one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub name: String,
    pub passed: bool,
    #[serde(default)]
    pub expected: Option<String>,
    #[serde(default)]
    pub actual: Option<String>,
}

/// Last run/submit outcome. Replaced wholesale by each execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CodeExecutionResult {
    pub success: bool,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub execution_time_ms: u64,
    #[serde(default)]
    pub test_results: Vec<TestCaseResult>,
}

impl CodeExecutionResult {
    pub fn tests_passed(&self) -> u32 {
        self.test_results.iter().filter(|t| t.passed).count() as u32
    }

    pub fn tests_total(&self) -> u32 {
        self.test_results.len() as u32
    }
}

/// Bridging record created the instant a coding trigger phrase is recognized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodingQuestionDetected {
    /// Pre-supplied question text; `None` means it must be generated from the conversation.
    pub question: Option<String>,
    pub conversation: Vec<ConversationEntry>,
}

/// Backend scoring of a hand-off solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodingEvaluation {
    pub score: f64,
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub feedback: String,
}

/// New system prompt and first message used to continue the voice call after a hand-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeContext {
    pub system_prompt: String,
    pub first_message: String,
}

/// Hint returned for the active problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodingHint {
    pub hint: String,
    #[serde(default)]
    pub hints_remaining: u32,
}
