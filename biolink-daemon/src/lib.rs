//! biolink daemon library
//!
//! This module re-exports the daemon's modules for integration testing.

pub mod config;
pub mod control;
pub mod ipc;
pub mod version;

pub use config::{DaemonConfig, SourceKind};
pub use control::{ControlError, ControlSurface, SourceFactory, StatusReport};
pub use ipc::{IpcCommand, IpcServer};
