//! Session recorder state machine
//!
//! `Idle -> Active -> Idle`. All session state sits behind one lock that is
//! held for exactly one start/add/stop/list call.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::archive::{self, ArchiveEntry, CURRENT_SESSION};
use crate::error::{RecorderError, Result};
use crate::models::{GameEvent, GameType, SessionRecord};

/// Result of a successful `stop`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// Artifact flushed to `path`
    Written { path: PathBuf, record_count: usize },
    /// Session held no records; nothing was written
    Empty,
}

#[derive(Debug, Default)]
struct SessionState {
    active: bool,
    start_time: Option<DateTime<Utc>>,
    game_type: Option<GameType>,
    records: Vec<SessionRecord>,
}

/// Records one session at a time into `directory`
pub struct SessionRecorder {
    directory: PathBuf,
    state: Mutex<SessionState>,
}

/// `YYYYMMDD_HHMMSS[_<game type>].csv`
pub fn artifact_name(start_time: &DateTime<Utc>, game_type: Option<GameType>) -> String {
    let mut name = start_time.format("%Y%m%d_%H%M%S").to_string();
    if let Some(game_type) = game_type {
        name.push('_');
        name.push_str(game_type.as_str());
    }
    name.push_str(".csv");
    name
}

fn write_artifact(path: &Path, records: &[SessionRecord]) -> std::result::Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Drop whatever a failed flush left behind
fn discard_partial_artifact(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed partial artifact {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial artifact {}: {}", path.display(), e),
    }
}

impl SessionRecorder {
    /// Create a recorder writing artifacts into `directory` (created if missing)
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;

        Ok(Self {
            directory,
            state: Mutex::new(SessionState::default()),
        })
    }

    /// Begin a session; rejected if one is already active
    pub fn start(&self) -> Result<DateTime<Utc>> {
        let mut state = self.state.lock();
        if state.active {
            info!("A session is already running");
            return Err(RecorderError::AlreadyActive);
        }

        let start_time = Utc::now();
        *state = SessionState {
            active: true,
            start_time: Some(start_time),
            game_type: None,
            records: Vec::new(),
        };

        info!("Session started at {}", start_time.to_rfc3339());
        Ok(start_time)
    }

    /// Classify, validate and append one event; returns the new record count
    ///
    /// A declared type that differs from the session's established type is
    /// rejected and leaves the session untouched. Without a declared type, a
    /// card-shaped event in an untyped session marks it as 2D.
    pub fn add_record(&self, raw: &Value, declared: Option<GameType>) -> Result<usize> {
        let mut state = self.state.lock();
        if !state.active {
            warn!("No active session, event not recorded");
            return Err(RecorderError::NotActive);
        }

        let event = GameEvent::classify(raw).map_err(|e| {
            warn!("Event not recorded: {}", e);
            e
        })?;

        match (declared, state.game_type) {
            (Some(declared), Some(session)) if declared != session => {
                error!(
                    "Game type conflict: session {}, event {}. Event not recorded",
                    session, declared
                );
                return Err(RecorderError::TypeConflict { session, declared });
            }
            (Some(declared), None) => state.game_type = Some(declared),
            (None, None) if event.is_card() => state.game_type = Some(GameType::TwoD),
            _ => {}
        }

        let record = SessionRecord::received_now(&event);
        debug!("Record added: {:?}", record);
        state.records.push(record);

        Ok(state.records.len())
    }

    /// Flush the session and return to idle
    ///
    /// State is reset even when the artifact cannot be written.
    pub fn stop(&self) -> Result<StopOutcome> {
        let mut state = self.state.lock();
        if !state.active {
            info!("No active session to stop");
            return Err(RecorderError::NotActive);
        }

        let finished = std::mem::take(&mut *state);
        let Some(start_time) = finished.start_time else {
            return Ok(StopOutcome::Empty);
        };

        if finished.records.is_empty() {
            info!("Session stopped without records, no artifact written");
            return Ok(StopOutcome::Empty);
        }

        let path = self
            .directory
            .join(artifact_name(&start_time, finished.game_type));
        let record_count = finished.records.len();

        match write_artifact(&path, &finished.records) {
            Ok(()) => {
                info!("Session saved: {} records to {}", record_count, path.display());
                Ok(StopOutcome::Written { path, record_count })
            }
            Err(source) => {
                error!("Failed to write {}: {}", path.display(), source);
                discard_partial_artifact(&path);
                Err(RecorderError::ArtifactWrite { path, source })
            }
        }
    }

    /// Flushed artifacts in name order, then the live session if it has records
    pub fn list_archives(&self) -> Vec<ArchiveEntry> {
        let state = self.state.lock();
        let mut entries = archive::list_artifacts(&self.directory);

        if state.active && !state.records.is_empty() {
            entries.push(ArchiveEntry {
                name: CURRENT_SESSION.to_string(),
                records: state.records.clone(),
            });
        }

        entries
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn game_type(&self) -> Option<GameType> {
        self.state.lock().game_type
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.state.lock().start_time
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}
