//! biolink Stream Acquisition
//!
//! Pulls timestamped biosignal vectors from an external stream source,
//! downsamples them to a target rate and buffers them for consumers.
//!
//! ## Architecture
//!
//! ```text
//! StreamSource (discover / open)
//!   │
//!   ├─> Inlet::pull_chunk (round-robin, non-blocking)
//!   │     │
//!   │     └─> Decimator (keep every Nth sample, per inlet)
//!   │
//!   └─> IngestQueue (bounded, drop-oldest) ──> drain_all()
//! ```

pub mod acquisition;
pub mod decimator;
pub mod error;
pub mod queue;
pub mod source;

pub use acquisition::AcquisitionLoop;
pub use decimator::Decimator;
pub use error::{AcquisitionError, Result};
pub use queue::{IngestQueue, QueueMetrics};
pub use source::{Chunk, Inlet, Sample, StreamHandle, StreamSource, SyntheticSource};

use std::time::Duration;

/// Nominal rate the upstream source is assumed to deliver (Hz)
pub const DEFAULT_SOURCE_RATE: f64 = 1000.0;

/// Rate samples are downsampled to before queueing (Hz)
pub const DEFAULT_TARGET_RATE: f64 = 100.0;

/// Maximum number of samples held by the ingestion queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Acquisition configuration
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Assumed source sample rate (default: 1000 Hz)
    pub source_rate: f64,
    /// Target output rate (default: 100 Hz)
    pub target_rate: f64,
    /// Ingestion queue capacity (default: 1000)
    pub queue_capacity: usize,
    /// Max samples pulled per inlet per tick (None = decimation factor)
    pub chunk_size: Option<usize>,
    /// Pause between acquisition ticks (default: 1 ms)
    pub tick_interval: Duration,
    /// Pause between discovery attempts (default: 2 s)
    pub discovery_retry: Duration,
    /// Channel names to keep (None = all channels)
    pub include_channels: Option<Vec<String>>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            source_rate: DEFAULT_SOURCE_RATE,
            target_rate: DEFAULT_TARGET_RATE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            chunk_size: None,
            tick_interval: Duration::from_millis(1),
            discovery_retry: Duration::from_secs(2),
            include_channels: None,
        }
    }
}

impl AcquisitionConfig {
    /// Reject configurations the loop cannot run with
    pub fn validate(&self) -> Result<()> {
        Decimator::new(self.source_rate, self.target_rate)?;

        if self.queue_capacity == 0 {
            return Err(AcquisitionError::invalid_config("Queue capacity cannot be zero"));
        }

        if self.chunk_size == Some(0) {
            return Err(AcquisitionError::invalid_config("Chunk size cannot be zero"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AcquisitionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.queue_capacity, 1000);
    }

    #[test]
    fn test_invalid_config() {
        let zero_capacity = AcquisitionConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(zero_capacity.validate().is_err());

        let zero_rate = AcquisitionConfig {
            target_rate: 0.0,
            ..Default::default()
        };
        assert!(zero_rate.validate().is_err());

        let zero_chunk = AcquisitionConfig {
            chunk_size: Some(0),
            ..Default::default()
        };
        assert!(zero_chunk.validate().is_err());
    }
}
