//! Data models for session recording

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::error::{RecorderError, Result};

/// Artifact column order, including the empty separator column
pub const COLUMNS: [&str; 8] = [
    "received_timestamp",
    "cardIndex",
    "currentReward",
    "finalKontostand",
    "klickZeiten",
    "timestamp",
    "",
    "values",
];

/// Game variant a session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameType {
    #[serde(rename = "2D")]
    TwoD,
    #[serde(rename = "3D")]
    ThreeD,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::TwoD => "2D",
            GameType::ThreeD => "3D",
        }
    }
}

impl std::fmt::Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameType {
    type Err = RecorderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "2D" => Ok(GameType::TwoD),
            "3D" => Ok(GameType::ThreeD),
            other => Err(RecorderError::InvalidGameType(other.to_string())),
        }
    }
}

/// Card game event; every field may be absent
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardEvent {
    pub card_index: Option<Value>,
    pub current_reward: Option<Value>,
    pub final_kontostand: Option<Value>,
    pub klick_zeiten: Option<Value>,
    pub timestamp: Option<Value>,
}

/// Event carrying channel values (a mapping or a list)
#[derive(Debug, Clone, PartialEq)]
pub struct SampleEvent {
    pub values: Value,
}

/// A submitted event after shape classification
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Card(CardEvent),
    Sample(SampleEvent),
}

impl GameEvent {
    /// Classify a raw JSON event by its keys
    ///
    /// Card fields (`cardIndex` or `currentReward`) take precedence over
    /// `values`. Anything else is rejected.
    pub fn classify(raw: &Value) -> Result<Self> {
        let object = raw
            .as_object()
            .ok_or_else(|| RecorderError::UnrecognizedShape(format!("expected object, got {}", raw)))?;

        if object.contains_key("cardIndex") || object.contains_key("currentReward") {
            let card = CardEvent::deserialize(raw)
                .map_err(|e| RecorderError::UnrecognizedShape(e.to_string()))?;
            return Ok(GameEvent::Card(card));
        }

        if let Some(values) = object.get("values") {
            return Ok(GameEvent::Sample(SampleEvent {
                values: values.clone(),
            }));
        }

        let keys: Vec<&str> = object.keys().map(|k| k.as_str()).collect();
        Err(RecorderError::UnrecognizedShape(format!(
            "no card fields or values (keys: {:?})",
            keys
        )))
    }

    pub fn is_card(&self) -> bool {
        matches!(self, GameEvent::Card(_))
    }
}

/// One normalized artifact row
///
/// Every field is a rendered cell; absent fields are empty strings so all
/// rows share the same column shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionRecord {
    pub received_timestamp: String,
    #[serde(rename = "cardIndex")]
    pub card_index: String,
    #[serde(rename = "currentReward")]
    pub current_reward: String,
    #[serde(rename = "finalKontostand")]
    pub final_kontostand: String,
    #[serde(rename = "klickZeiten")]
    pub klick_zeiten: String,
    pub timestamp: String,
    #[serde(rename = "")]
    pub separator: String,
    pub values: String,
}

impl SessionRecord {
    /// Normalize an event received at `received_timestamp`
    pub fn from_event(event: &GameEvent, received_timestamp: impl Into<String>) -> Self {
        let received_timestamp = received_timestamp.into();

        match event {
            GameEvent::Card(card) => Self {
                received_timestamp,
                card_index: render_cell(card.card_index.as_ref()),
                current_reward: render_cell(card.current_reward.as_ref()),
                final_kontostand: render_cell(card.final_kontostand.as_ref()),
                klick_zeiten: render_list(card.klick_zeiten.as_ref()),
                timestamp: render_cell(card.timestamp.as_ref()),
                ..Default::default()
            },
            GameEvent::Sample(sample) => Self {
                received_timestamp,
                values: render_values(&sample.values),
                ..Default::default()
            },
        }
    }

    /// Rebuild a record from cells in [`COLUMNS`] order
    pub fn from_cells(cells: Vec<String>) -> Self {
        let mut cells = cells.into_iter();
        let mut next = || cells.next().unwrap_or_default();

        Self {
            received_timestamp: next(),
            card_index: next(),
            current_reward: next(),
            final_kontostand: next(),
            klick_zeiten: next(),
            timestamp: next(),
            separator: next(),
            values: next(),
        }
    }

    /// Normalize an event stamped with the current UTC time
    pub fn received_now(event: &GameEvent) -> Self {
        Self::from_event(event, now_timestamp())
    }
}

/// Server receive time, ISO-8601 with microseconds and UTC offset
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn join_list(items: &[Value]) -> String {
    items
        .iter()
        .map(|item| render_cell(Some(item)))
        .collect::<Vec<_>>()
        .join(";")
}

/// Lists are `;`-joined, scalars rendered as-is
fn render_list(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(items)) => join_list(items),
        other => render_cell(other),
    }
}

/// Lists are `;`-joined, anything else JSON-encoded
fn render_values(value: &Value) -> String {
    match value {
        Value::Array(items) => join_list(items),
        other => other.to_string(),
    }
}
