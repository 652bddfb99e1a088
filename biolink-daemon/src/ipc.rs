//! Unix socket IPC server for control commands
//!
//! One command per line, one JSON object per reply:
//!
//! ```text
//! start | stop
//! acquisition start | acquisition stop
//! session start | session stop
//! poll
//! event [2D|3D] <json>
//! sessions
//! status
//! ```

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info};

use biolink_recorder::{GameType, StopOutcome};

use crate::control::{ControlError, ControlSurface};

/// IPC command
#[derive(Debug, PartialEq)]
pub enum IpcCommand {
    Start,
    Stop,
    StartAcquisition,
    StopAcquisition,
    StartSession,
    StopSession,
    Poll,
    Event {
        game_type: Option<GameType>,
        payload: Value,
    },
    Sessions,
    Status,
}

impl IpcCommand {
    pub fn parse(s: &str) -> Result<Self> {
        let line = s.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match (word.to_lowercase().as_str(), rest) {
            ("start", "") => Ok(Self::Start),
            ("stop", "") => Ok(Self::Stop),
            ("poll", "") => Ok(Self::Poll),
            ("sessions", "") => Ok(Self::Sessions),
            ("status", "") => Ok(Self::Status),
            ("acquisition", action) => match action.to_lowercase().as_str() {
                "start" => Ok(Self::StartAcquisition),
                "stop" => Ok(Self::StopAcquisition),
                _ => bail!("Usage: acquisition start|stop"),
            },
            ("session", action) => match action.to_lowercase().as_str() {
                "start" => Ok(Self::StartSession),
                "stop" => Ok(Self::StopSession),
                _ => bail!("Usage: session start|stop"),
            },
            ("event", body) => Self::parse_event(body),
            _ => bail!("Unknown command: {}", line),
        }
    }

    /// `[2D|3D] <json>`
    fn parse_event(body: &str) -> Result<Self> {
        if body.is_empty() {
            bail!("Usage: event [2D|3D] <json>");
        }

        let (game_type, json_text) = if body.starts_with('{') || body.starts_with('[') {
            (None, body)
        } else {
            let (tag, json_text) = body
                .split_once(char::is_whitespace)
                .context("Usage: event [2D|3D] <json>")?;
            (Some(tag.parse::<GameType>()?), json_text.trim())
        };

        let payload = serde_json::from_str(json_text).context("Event payload is not valid JSON")?;
        Ok(Self::Event { game_type, payload })
    }
}

fn failure(error: &ControlError) -> Value {
    json!({ "ok": false, "error": error.to_string(), "kind": error.kind() })
}

fn invalid_command(error: String) -> Value {
    json!({ "ok": false, "error": error, "kind": "InvalidCommand" })
}

fn stop_reply(outcome: StopOutcome) -> Value {
    match outcome {
        StopOutcome::Written { path, record_count } => json!({
            "ok": true,
            "artifact": path.to_string_lossy(),
            "record_count": record_count,
        }),
        StopOutcome::Empty => json!({ "ok": true, "artifact": null, "record_count": 0 }),
    }
}

/// Run one command against the control surface
pub async fn execute(command: IpcCommand, control: &ControlSurface) -> Value {
    let reply = match command {
        IpcCommand::Start => control
            .start()
            .await
            .map(|start| json!({ "ok": true, "start_time": start.to_rfc3339() })),
        IpcCommand::Stop => control.stop().await.map(stop_reply),
        IpcCommand::StartAcquisition => control
            .start_acquisition()
            .await
            .map(|()| json!({ "ok": true })),
        IpcCommand::StopAcquisition => control
            .stop_acquisition()
            .await
            .map(|()| json!({ "ok": true })),
        IpcCommand::StartSession => control
            .start_session()
            .map(|start| json!({ "ok": true, "start_time": start.to_rfc3339() })),
        IpcCommand::StopSession => control.stop_session().await.map(stop_reply),
        IpcCommand::Poll => {
            let samples = control.poll_queued_samples();
            Ok(json!({ "ok": true, "samples": samples }))
        }
        IpcCommand::Event { game_type, payload } => control
            .submit_game_event(payload, game_type)
            .map(|count| json!({ "ok": true, "record_count": count })),
        IpcCommand::Sessions => Ok(json!({
            "ok": true,
            "sessions": control.get_all_recorded_sessions(),
        })),
        IpcCommand::Status => {
            let status = control.status().await;
            Ok(json!({ "ok": true, "status": status }))
        }
    };

    reply.unwrap_or_else(|e| failure(&e))
}

/// Unix socket IPC server
pub struct IpcServer {
    listener: UnixListener,
    control: Arc<ControlSurface>,
}

impl IpcServer {
    /// Create new IPC server
    pub fn new(socket_path: &Path, control: Arc<ControlSurface>) -> Result<Self> {
        // Remove existing socket if it exists
        let _ = std::fs::remove_file(socket_path);

        let listener = UnixListener::bind(socket_path)
            .context("Failed to bind Unix socket")?;
        biolink_paths::secure_socket_permissions(socket_path)?;

        info!("IPC server listening on {}", socket_path.display());

        Ok(Self { listener, control })
    }

    /// Accept connections until the listener fails
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let (stream, _) = self.listener.accept().await
                .context("Failed to accept connection")?;

            let control = Arc::clone(&self.control);
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, control).await {
                    error!("IPC connection error: {}", e);
                }
            });
        }
    }
}

/// Serve commands from one connection until it closes
pub async fn handle_connection(stream: UnixStream, control: Arc<ControlSurface>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let reply = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => {
                debug!("Received IPC command: {}", line.trim());
                match IpcCommand::parse(line) {
                    Ok(command) => execute(command, &control).await,
                    Err(e) => invalid_command(e.to_string()),
                }
            }
            Err(_) => invalid_command("Command is not valid UTF-8".to_string()),
        };

        let mut response = serde_json::to_string(&reply)?;
        response.push('\n');
        writer.write_all(response.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}
