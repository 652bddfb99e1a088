//! biolink Session Recording
//!
//! Groups samples and game events belonging to one recording session into an
//! ordered, schema-stable record set and flushes it as one CSV artifact when
//! the session stops.
//!
//! ## Features
//!
//! - **Classification**: card events vs. sample events, unknown shapes rejected
//! - **Game type tracking**: first declared (or inferred) type wins per session
//! - **Archive reading**: flushed artifacts plus the live session in one list

pub mod archive;
pub mod error;
pub mod models;
pub mod recorder;

// Re-export main types
pub use archive::{list_artifacts, read_archive, ArchiveEntry, CURRENT_SESSION};
pub use error::{RecorderError, Result};
pub use models::{CardEvent, GameEvent, GameType, SampleEvent, SessionRecord, COLUMNS};
pub use recorder::{artifact_name, SessionRecorder, StopOutcome};
