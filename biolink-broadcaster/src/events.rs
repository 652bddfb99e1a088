use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event types delivered to subscribers
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum BroadcastEvent {
    /// Decimated sensor sample drained from the ingestion queue
    #[serde(rename = "sample")]
    Sample {
        timestamp: f64,
        values: Value,
    },

    /// Raw event submitted by a game producer
    #[serde(rename = "game_event")]
    GameEvent {
        game_type: Option<String>,
        data: Value,
    },

    /// Recording session started
    #[serde(rename = "session_start")]
    SessionStart {
        start_time: String,
        timestamp: f64,
    },

    /// Recording session stopped
    #[serde(rename = "session_end")]
    SessionEnd {
        record_count: usize,
        artifact: Option<String>,
        timestamp: f64,
    },

    /// Daemon state changed
    #[serde(rename = "state_change")]
    StateChange {
        state: String,
        timestamp: f64,
    },
}

/// Coarse daemon state shown to live consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaemonState {
    Idle,
    Acquiring,
    Recording,
}

impl DaemonState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DaemonState::Idle => "idle",
            DaemonState::Acquiring => "acquiring",
            DaemonState::Recording => "recording",
        }
    }
}

impl std::fmt::Display for DaemonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BroadcastEvent {
    pub fn sample(timestamp: f64, values: Value) -> Self {
        Self::Sample { timestamp, values }
    }

    pub fn game_event(game_type: Option<String>, data: Value) -> Self {
        Self::GameEvent { game_type, data }
    }

    pub fn session_start(start_time: impl Into<String>) -> Self {
        Self::SessionStart {
            start_time: start_time.into(),
            timestamp: current_timestamp(),
        }
    }

    pub fn session_end(record_count: usize, artifact: Option<String>) -> Self {
        Self::SessionEnd {
            record_count,
            artifact,
            timestamp: current_timestamp(),
        }
    }

    pub fn state_change(state: DaemonState) -> Self {
        Self::StateChange {
            state: state.as_str().to_string(),
            timestamp: current_timestamp(),
        }
    }

    /// Convert event to JSON string with newline
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Wall-clock seconds since the Unix epoch
fn current_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
