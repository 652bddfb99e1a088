//! Control surface
//!
//! Owns the pipeline components and sequences them: acquisition feeds the
//! ingestion queue, polling drains it into the recorder and the broadcaster,
//! and game events go straight to both.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use biolink_acquisition::{
    AcquisitionConfig, AcquisitionError, AcquisitionLoop, IngestQueue, QueueMetrics, Sample,
    StreamSource,
};
use biolink_broadcaster::{BroadcastEvent, DaemonState, EventBroadcaster, Subscription};
use biolink_recorder::{ArchiveEntry, GameType, RecorderError, SessionRecorder, StopOutcome};

/// Builds a fresh stream source for every acquisition start
pub type SourceFactory = Box<dyn Fn() -> Box<dyn StreamSource> + Send + Sync>;

#[derive(Error, Debug)]
pub enum ControlError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Recorder(#[from] RecorderError),
}

impl ControlError {
    /// Outcome name reported over IPC
    pub fn kind(&self) -> &'static str {
        match self {
            ControlError::Acquisition(e) => e.kind(),
            ControlError::Recorder(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ControlError>;

/// Snapshot returned by `status`
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub state: DaemonState,
    pub acquisition_running: bool,
    pub session_active: bool,
    pub session_start: Option<String>,
    pub game_type: Option<GameType>,
    pub record_count: usize,
    pub queue: QueueMetrics,
    pub subscribers: usize,
}

pub struct ControlSurface {
    queue: Arc<IngestQueue<Sample>>,
    acquisition: Mutex<AcquisitionLoop>,
    recorder: Arc<SessionRecorder>,
    broadcaster: Arc<EventBroadcaster>,
    source_factory: SourceFactory,
}

impl ControlSurface {
    pub fn new(
        config: AcquisitionConfig,
        recorder: Arc<SessionRecorder>,
        broadcaster: Arc<EventBroadcaster>,
        source_factory: SourceFactory,
    ) -> std::result::Result<Self, AcquisitionError> {
        let queue = Arc::new(IngestQueue::new(config.queue_capacity)?);
        let acquisition = AcquisitionLoop::new(config, Arc::clone(&queue))?;

        Ok(Self {
            queue,
            acquisition: Mutex::new(acquisition),
            recorder,
            broadcaster,
            source_factory,
        })
    }

    /// Start discovery and acquisition on a fresh loop
    pub async fn start_acquisition(&self) -> Result<()> {
        let mut acquisition = self.acquisition.lock().await;
        acquisition.start((self.source_factory)())?;
        self.publish_state(true);
        Ok(())
    }

    /// Cancel the acquisition loop and wait for it to exit
    pub async fn stop_acquisition(&self) -> Result<()> {
        let mut acquisition = self.acquisition.lock().await;
        acquisition.stop().await?;
        self.publish_state(false);
        Ok(())
    }

    pub fn start_session(&self) -> Result<DateTime<Utc>> {
        let start_time = self.recorder.start()?;
        self.broadcaster
            .publish(BroadcastEvent::session_start(start_time.to_rfc3339()));
        self.broadcaster.broadcast_state_change(DaemonState::Recording);
        Ok(start_time)
    }

    pub async fn stop_session(&self) -> Result<StopOutcome> {
        let outcome = match self.recorder.stop() {
            Ok(outcome) => outcome,
            Err(e @ RecorderError::ArtifactWrite { .. }) => {
                // Session is reset even though nothing was written
                self.broadcaster.publish(BroadcastEvent::session_end(0, None));
                self.publish_state(self.acquisition.lock().await.is_running());
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        let event = match &outcome {
            StopOutcome::Written { path, record_count } => {
                let artifact = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned());
                BroadcastEvent::session_end(*record_count, artifact)
            }
            StopOutcome::Empty => BroadcastEvent::session_end(0, None),
        };
        self.broadcaster.publish(event);

        self.publish_state(self.acquisition.lock().await.is_running());
        Ok(outcome)
    }

    /// Open a recording session, then start acquisition
    ///
    /// Acquisition that is already running is left as is.
    pub async fn start(&self) -> Result<DateTime<Utc>> {
        let start_time = self.start_session()?;

        match self.start_acquisition().await {
            Ok(()) => {}
            Err(ControlError::Acquisition(AcquisitionError::AlreadyRunning)) => {
                info!("Acquisition already running, session attached to it");
            }
            Err(e) => return Err(e),
        }

        info!("▶️ Recording started");
        Ok(start_time)
    }

    /// Stop acquisition, drain what it queued into the session, then flush
    pub async fn stop(&self) -> Result<StopOutcome> {
        match self.stop_acquisition().await {
            Ok(()) | Err(ControlError::Acquisition(AcquisitionError::NotRunning)) => {}
            Err(e) => return Err(e),
        }

        self.poll_queued_samples();
        let outcome = self.stop_session().await?;

        info!("⏸️ Recording stopped");
        Ok(outcome)
    }

    /// Drain the ingestion queue into the session and the live stream
    pub fn poll_queued_samples(&self) -> Vec<Sample> {
        let samples = self.queue.drain_all();
        if samples.is_empty() {
            return samples;
        }

        let recording = self.recorder.is_active();
        for sample in &samples {
            if recording {
                if let Err(e) = self.recorder.add_record(&sample.to_json(), None) {
                    debug!("Sample not recorded: {}", e);
                }
            }

            let values = serde_json::to_value(&sample.values).unwrap_or(Value::Null);
            self.broadcaster
                .publish(BroadcastEvent::sample(sample.timestamp, values));
        }

        debug!("Polled {} samples (recorded: {})", samples.len(), recording);
        samples
    }

    /// Record a game event and publish it to live consumers
    ///
    /// The event is published even if the recorder rejects it.
    pub fn submit_game_event(&self, raw: Value, declared: Option<GameType>) -> Result<usize> {
        let recorded = self.recorder.add_record(&raw, declared);

        let game_type = declared.map(|t| t.as_str().to_string());
        self.broadcaster
            .publish(BroadcastEvent::game_event(game_type, raw));

        Ok(recorded?)
    }

    /// Register an in-process live event subscriber
    pub fn open_live_event_stream(&self) -> Subscription {
        self.broadcaster.subscribe()
    }

    pub fn close_live_event_stream(&self, subscription: Subscription) {
        self.broadcaster.unsubscribe(subscription);
    }

    pub fn get_all_recorded_sessions(&self) -> Vec<ArchiveEntry> {
        self.recorder.list_archives()
    }

    pub async fn status(&self) -> StatusReport {
        let acquisition_running = self.acquisition.lock().await.is_running();
        let session_active = self.recorder.is_active();

        StatusReport {
            state: daemon_state(acquisition_running, session_active),
            acquisition_running,
            session_active,
            session_start: self.recorder.start_time().map(|t| t.to_rfc3339()),
            game_type: self.recorder.game_type(),
            record_count: self.recorder.record_count(),
            queue: self.queue.metrics(),
            subscribers: self.broadcaster.subscriber_count(),
        }
    }

    /// Stop acquisition and flush any active session
    pub async fn shutdown(&self) {
        if self.recorder.is_active() {
            match self.stop().await {
                Ok(StopOutcome::Written { path, .. }) => {
                    info!("Active session saved to {}", path.display())
                }
                Ok(StopOutcome::Empty) => {}
                Err(e) => warn!("Failed to flush active session: {}", e),
            }
        } else if let Err(ControlError::Acquisition(AcquisitionError::Internal(e))) =
            self.stop_acquisition().await
        {
            warn!("Acquisition task failed: {}", e);
        }
    }

    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }

    pub fn recorder(&self) -> &Arc<SessionRecorder> {
        &self.recorder
    }

    fn publish_state(&self, acquiring: bool) {
        let state = daemon_state(acquiring, self.recorder.is_active());
        self.broadcaster.broadcast_state_change(state);
    }
}

fn daemon_state(acquiring: bool, recording: bool) -> DaemonState {
    if recording {
        DaemonState::Recording
    } else if acquiring {
        DaemonState::Acquiring
    } else {
        DaemonState::Idle
    }
}
