//! Sync layer configuration. Load from TOML or env.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{InterviewError, InterviewResult};

/// Which backend implementation the binaries wire up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    #[default]
    Http,
    /// In-memory scripted backend (offline runs, demos).
    Mock,
}

/// Named delays and retry limits. All overridable so tests can inject near-zero values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Upper bound on `stop_interview` waiting for the SDK's call-end (default: 15s).
    pub stop_call_timeout_ms: u64,
    /// Pause after a coding evaluation so the user can read it (default: 5s).
    pub evaluation_pause_ms: u64,
    /// Pause between a handed-off call and its context-override restart (default: 2s).
    pub resume_pause_ms: u64,
    /// Quiet period before an editor change is emitted as `code_update` (default: 500ms).
    pub code_update_debounce_ms: u64,
    /// Fixed delay between reconnect attempts (default: 1s).
    pub reconnect_delay_ms: u64,
    /// Reconnect attempts before giving up until the channel is re-enabled (default: 5).
    pub reconnect_attempts: u32,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            stop_call_timeout_ms: 15_000,
            evaluation_pause_ms: 5_000,
            resume_pause_ms: 2_000,
            code_update_debounce_ms: 500,
            reconnect_delay_ms: 1_000,
            reconnect_attempts: 5,
        }
    }
}

impl Timings {
    /// Near-zero delays for tests.
    pub fn immediate() -> Self {
        Self {
            stop_call_timeout_ms: 50,
            evaluation_pause_ms: 1,
            resume_pause_ms: 1,
            code_update_debounce_ms: 5,
            reconnect_delay_ms: 1,
            reconnect_attempts: 5,
        }
    }

    pub fn stop_call_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_call_timeout_ms)
    }

    pub fn evaluation_pause(&self) -> Duration {
        Duration::from_millis(self.evaluation_pause_ms)
    }

    pub fn resume_pause(&self) -> Duration {
        Duration::from_millis(self.resume_pause_ms)
    }

    pub fn code_update_debounce(&self) -> Duration {
        Duration::from_millis(self.code_update_debounce_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// Top-level configuration for the sync layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the interview REST API.
    pub backend_url: String,
    /// WebSocket URL of the realtime channel.
    pub realtime_url: String,
    /// Bearer token for backend and realtime calls.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Voice assistant identifier. Required to start a call.
    #[serde(default)]
    pub assistant_id: Option<String>,
    #[serde(default)]
    pub backend_mode: BackendMode,
    #[serde(default)]
    pub timings: Timings,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            realtime_url: "ws://localhost:8000/ws".to_string(),
            api_token: None,
            assistant_id: None,
            backend_mode: BackendMode::Http,
            timings: Timings::default(),
        }
    }
}

impl SyncConfig {
    /// Load config from file and environment. Precedence: env `INTERVIEW_*` > file at
    /// `INTERVIEW_CONFIG` (default `config/interview`) > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("INTERVIEW_CONFIG").unwrap_or_else(|_| "config/interview".to_string());
        let defaults = SyncConfig::default();
        let builder = config::Config::builder()
            .set_default("backend_url", defaults.backend_url)?
            .set_default("realtime_url", defaults.realtime_url)?
            .set_default("backend_mode", "http")?;

        let path = Path::new(&config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder.add_source(config::File::with_name(&config_path).required(false))
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix("INTERVIEW")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        built.try_deserialize()
    }

    /// The assistant id, or a configuration error. Checked before any call side effect.
    pub fn require_assistant_id(&self) -> InterviewResult<&str> {
        self.assistant_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                InterviewError::Config(
                    "assistant_id is not configured (INTERVIEW_ASSISTANT_ID)".to_string(),
                )
            })
    }
}
