//! Acquisition loop
//!
//! Discovers streams, opens inlets and polls them round-robin, pushing
//! decimated samples into the shared [`IngestQueue`]. The loop runs as a
//! tokio task bound to a [`CancellationToken`]; cancellation is observed on
//! every tick and during every discovery wait.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::decimator::Decimator;
use crate::error::{AcquisitionError, Result};
use crate::queue::IngestQueue;
use crate::source::{Inlet, Sample, StreamHandle, StreamSource};
use crate::AcquisitionConfig;

/// Handle on a running acquisition task
struct Worker {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the acquisition task lifecycle
pub struct AcquisitionLoop {
    config: AcquisitionConfig,
    queue: Arc<IngestQueue<Sample>>,
    worker: Option<Worker>,
}

impl AcquisitionLoop {
    /// Create a stopped loop feeding `queue`
    pub fn new(config: AcquisitionConfig, queue: Arc<IngestQueue<Sample>>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            queue,
            worker: None,
        })
    }

    /// Spawn a fresh acquisition task on the current tokio runtime
    ///
    /// Counters and inlets start from scratch on every start.
    pub fn start(&mut self, source: Box<dyn StreamSource>) -> Result<()> {
        if self.is_running() {
            return Err(AcquisitionError::AlreadyRunning);
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_acquisition(
            source,
            self.config.clone(),
            Arc::clone(&self.queue),
            cancel.clone(),
        ));

        self.worker = Some(Worker { cancel, task });
        info!(
            "Acquisition started ({} Hz -> {} Hz)",
            self.config.source_rate, self.config.target_rate
        );
        Ok(())
    }

    /// Signal cancellation and wait for the task to exit
    pub async fn stop(&mut self) -> Result<()> {
        let worker = self.worker.take().ok_or(AcquisitionError::NotRunning)?;

        worker.cancel.cancel();
        worker
            .task
            .await
            .map_err(|e| AcquisitionError::Internal(e.to_string()))?;

        info!("Acquisition stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .map(|worker| !worker.task.is_finished())
            .unwrap_or(false)
    }

    pub fn queue(&self) -> &Arc<IngestQueue<Sample>> {
        &self.queue
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }
}

impl Drop for AcquisitionLoop {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.cancel.cancel();
        }
    }
}

/// One opened inlet with its own sample counter
struct ActiveInlet {
    inlet: Box<dyn Inlet>,
    decimator: Decimator,
}

/// Sleep for `duration`; false if cancelled first
async fn pause(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Retry discovery until a stream shows up; None once cancelled
async fn discover_streams(
    source: &mut dyn StreamSource,
    config: &AcquisitionConfig,
    cancel: &CancellationToken,
) -> Option<Vec<StreamHandle>> {
    loop {
        if cancel.is_cancelled() {
            return None;
        }

        match source.discover() {
            Ok(handles) if !handles.is_empty() => return Some(handles),
            Ok(_) => {
                let err = AcquisitionError::SourceUnavailable("no streams found".to_string());
                warn!("{}, retrying in {:?}", err, config.discovery_retry);
            }
            Err(e) => warn!("Stream discovery failed: {}, retrying", e),
        }

        if !pause(cancel, config.discovery_retry).await {
            return None;
        }
    }
}

/// Open every handle, skipping the ones that fail
fn open_inlets(
    source: &mut dyn StreamSource,
    handles: &[StreamHandle],
    config: &AcquisitionConfig,
) -> Vec<ActiveInlet> {
    let mut inlets = Vec::with_capacity(handles.len());

    for handle in handles {
        let decimator = match Decimator::new(config.source_rate, config.target_rate) {
            Ok(d) => d,
            Err(e) => {
                error!("Invalid decimation settings: {}", e);
                return Vec::new();
            }
        };

        match source.open(handle) {
            Ok(inlet) => {
                info!(
                    "Connected to stream '{}' ({}): {} channels {:?} @ {} Hz nominal",
                    handle.name,
                    handle.stream_type,
                    handle.channel_names.len(),
                    handle.channel_names,
                    handle.nominal_rate
                );
                inlets.push(ActiveInlet { inlet, decimator });
            }
            Err(e) => warn!("Skipping stream '{}': {}", handle.name, e),
        }
    }

    inlets
}

async fn run_acquisition(
    mut source: Box<dyn StreamSource>,
    config: AcquisitionConfig,
    queue: Arc<IngestQueue<Sample>>,
    cancel: CancellationToken,
) {
    info!("Acquisition task started");

    let mut inlets = loop {
        let Some(handles) = discover_streams(source.as_mut(), &config, &cancel).await else {
            info!("Acquisition cancelled before any stream was opened");
            return;
        };

        let inlets = open_inlets(source.as_mut(), &handles, &config);
        if !inlets.is_empty() {
            break inlets;
        }

        warn!("None of {} discovered streams could be opened", handles.len());
        if !pause(&cancel, config.discovery_retry).await {
            return;
        }
    };

    let include = config.include_channels.as_deref();
    let mut pulled: u64 = 0;
    let mut queued: u64 = 0;

    while !cancel.is_cancelled() {
        for active in inlets.iter_mut() {
            let chunk_size = config
                .chunk_size
                .unwrap_or(active.decimator.factor() as usize);

            let chunk = match active.inlet.pull_chunk(chunk_size, Duration::ZERO) {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!("Failed to pull from '{}': {}", active.inlet.handle().name, e);
                    continue;
                }
            };

            let channel_names = &active.inlet.handle().channel_names;
            for (raw, timestamp) in chunk.samples.iter().zip(chunk.timestamps.iter()) {
                pulled += 1;
                if !active.decimator.keep() {
                    continue;
                }

                let sample = Sample::from_raw(*timestamp, channel_names, raw, include);
                if queue.push(sample).is_some() {
                    debug!("Ingestion queue full, dropped oldest sample");
                }
                queued += 1;
            }
        }

        if !pause(&cancel, config.tick_interval).await {
            break;
        }
    }

    info!(
        "Acquisition task finished: {} samples pulled, {} queued",
        pulled, queued
    );
}
