//! Cross-platform path utilities for biolink.
//!
//! Single place that decides where recordings, configuration and sockets live.
//!
//! # Platform Behavior
//!
//! | Platform | Data Directory | Socket Directory |
//! |----------|----------------|------------------|
//! | Linux    | `~/.local/share/biolink` | `$XDG_RUNTIME_DIR` or data dir |
//! | macOS    | `~/Library/Application Support/biolink` | Same as data dir |
//! | Windows  | `%APPDATA%/biolink` | Same as data dir |

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

/// Errors specific to path operations.
#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not determine data directory")]
    NoDataDirectory,

    #[error("Could not determine config directory")]
    NoConfigDirectory,
}

/// Application identifier used in path construction.
const APP_NAME: &str = "biolink";

/// Socket file name for the control surface.
const IPC_SOCKET_NAME: &str = "biolink.sock";

/// Socket file name for the live event stream.
const EVENTS_SOCKET_NAME: &str = "biolink_events.sock";

/// Name of the config file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Create `dir` (and parents) if missing, owner-only on Unix.
pub fn ensure_private_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        return Ok(());
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o700);
        fs::set_permissions(dir, perms)
            .with_context(|| format!("Failed to set permissions on {}", dir.display()))?;
    }

    Ok(())
}

/// Get the application data directory, creating it if needed.
///
/// # Platform Behavior
/// - **Linux**: `~/.local/share/biolink`
/// - **macOS**: `~/Library/Application Support/biolink`
/// - **Windows**: `%APPDATA%/biolink`
pub fn get_data_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().ok_or(PathError::NoDataDirectory)?;
    let data_dir = base_dir.join(APP_NAME);
    ensure_private_dir(&data_dir)?;
    Ok(data_dir)
}

/// Get the directory holding flushed session recordings.
///
/// - All platforms: `<data_dir>/recordings`
pub fn get_recordings_dir() -> Result<PathBuf> {
    let dir = get_data_dir()?.join("recordings");
    ensure_private_dir(&dir)?;
    Ok(dir)
}

/// Get the socket directory for IPC sockets.
///
/// On Linux `$XDG_RUNTIME_DIR` is preferred; everywhere else (and when the
/// runtime dir is missing) the data directory is used.
pub fn get_socket_dir() -> Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        if let Some(runtime_dir) = dirs::runtime_dir() {
            if runtime_dir.exists() {
                return Ok(runtime_dir);
            }
        }
    }

    get_data_dir()
}

/// Get the path to the control socket.
pub fn get_ipc_socket_path() -> Result<PathBuf> {
    Ok(get_socket_dir()?.join(IPC_SOCKET_NAME))
}

/// Get the path to the live event stream socket.
pub fn get_events_socket_path() -> Result<PathBuf> {
    Ok(get_socket_dir()?.join(EVENTS_SOCKET_NAME))
}

/// Get the configuration directory, creating it if needed.
///
/// # Platform Behavior
/// - **Linux**: `~/.config/biolink`
/// - **macOS / Windows**: config lives with data
pub fn get_config_dir() -> Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let config_base = dirs::config_dir().ok_or(PathError::NoConfigDirectory)?;
        let config_dir = config_base.join(APP_NAME);
        ensure_private_dir(&config_dir)?;
        Ok(config_dir)
    }

    #[cfg(not(target_os = "linux"))]
    {
        get_data_dir()
    }
}

/// Get the default config file path.
pub fn get_config_file_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE_NAME))
}

/// Set secure Unix socket permissions (0o600, owner read/write only).
#[cfg(unix)]
pub fn secure_socket_permissions(socket_path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if socket_path.exists() {
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(socket_path, perms).with_context(|| {
            format!(
                "Failed to set socket permissions: {}",
                socket_path.display()
            )
        })?;
    }

    Ok(())
}

#[cfg(not(unix))]
pub fn secure_socket_permissions(_socket_path: &Path) -> Result<()> {
    Ok(())
}
