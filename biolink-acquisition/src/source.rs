//! Stream source adapter
//!
//! A [`StreamSource`] discovers streams and opens inlets on them; an
//! [`Inlet`] hands out chunks of raw channel vectors without blocking.
//! Real hardware bindings and the bundled [`SyntheticSource`] both sit
//! behind these traits.

use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::error::Result;

/// One timestamped vector of channel readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Source-clock timestamp in seconds
    pub timestamp: f64,
    /// Channel name -> reading, in channel order
    pub values: IndexMap<String, f64>,
}

impl Sample {
    /// Build a sample from a raw vector using the stream's channel names
    ///
    /// Extra values without a name are ignored. When `include` is given, only
    /// the listed channels are kept.
    pub fn from_raw(
        timestamp: f64,
        channel_names: &[String],
        raw: &[f64],
        include: Option<&[String]>,
    ) -> Self {
        let values = channel_names
            .iter()
            .zip(raw.iter())
            .filter(|(name, _)| include.map_or(true, |keep| keep.contains(*name)))
            .map(|(name, value)| (name.clone(), *value))
            .collect();

        Self { timestamp, values }
    }

    /// JSON shape understood by the session recorder: `{timestamp, values}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "timestamp": self.timestamp,
            "values": self.values,
        })
    }
}

/// Description of a discoverable stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamHandle {
    pub name: String,
    pub stream_type: String,
    pub source_id: String,
    pub channel_names: Vec<String>,
    /// Rate advertised by the stream (informational only)
    pub nominal_rate: f64,
}

/// Raw samples pulled from one inlet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    /// `samples[i]` holds one value per channel
    pub samples: Vec<Vec<f64>>,
    /// `timestamps[i]` belongs to `samples[i]`
    pub timestamps: Vec<f64>,
}

impl Chunk {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }
}

/// An open connection to one stream
pub trait Inlet: Send {
    fn handle(&self) -> &StreamHandle;

    /// Pull up to `max_samples`; a zero `timeout` must return immediately,
    /// with an empty chunk when nothing is ready.
    fn pull_chunk(&mut self, max_samples: usize, timeout: Duration) -> Result<Chunk>;
}

/// Discovers streams and opens inlets on them
pub trait StreamSource: Send {
    /// Streams currently visible; an empty list means "try again later"
    fn discover(&mut self) -> Result<Vec<StreamHandle>>;

    /// Open an inlet; fails with `AcquisitionError::Connection`
    fn open(&mut self, handle: &StreamHandle) -> Result<Box<dyn Inlet>>;
}

/// Nominal rate of the synthetic stream (Hz)
const SYNTHETIC_RATE: f64 = 1000.0;

/// Generator standing in for biosignal hardware
///
/// Publishes a single stream `FakeBio` with channels `Index`, `EDA`, `ECG`.
pub struct SyntheticSource {
    handle: StreamHandle,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self::with_rate(SYNTHETIC_RATE)
    }

    pub fn with_rate(rate: f64) -> Self {
        Self {
            handle: StreamHandle {
                name: "FakeBio".to_string(),
                stream_type: "Bio".to_string(),
                source_id: "fake_bio_stream".to_string(),
                channel_names: vec!["Index".to_string(), "EDA".to_string(), "ECG".to_string()],
                nominal_rate: rate,
            },
        }
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSource for SyntheticSource {
    fn discover(&mut self) -> Result<Vec<StreamHandle>> {
        Ok(vec![self.handle.clone()])
    }

    fn open(&mut self, handle: &StreamHandle) -> Result<Box<dyn Inlet>> {
        if handle.source_id != self.handle.source_id {
            return Err(crate::AcquisitionError::connection(
                &handle.name,
                "unknown synthetic stream",
            ));
        }
        Ok(Box::new(SyntheticInlet::new(self.handle.clone())))
    }
}

/// Inlet producing samples according to elapsed wall time
struct SyntheticInlet {
    handle: StreamHandle,
    opened_at: Instant,
    epoch_offset: f64,
    produced: u64,
}

impl SyntheticInlet {
    fn new(handle: StreamHandle) -> Self {
        let epoch_offset = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        Self {
            handle,
            opened_at: Instant::now(),
            epoch_offset,
            produced: 0,
        }
    }

    fn generate(&self, index: u64, rng: &mut impl Rng) -> (f64, Vec<f64>) {
        let t = index as f64 / self.handle.nominal_rate;

        // 0.1 Hz skin conductance wave around 2.5 µS
        let eda = 2.5 + 2.5 * (2.0 * std::f64::consts::PI * 0.1 * t).sin()
            + rng.gen_range(-0.1..0.1);
        // 1 Hz cardiac wave in mV
        let ecg = (2.0 * std::f64::consts::PI * t).sin() + rng.gen_range(-0.05..0.05);

        (
            self.epoch_offset + t,
            vec![(index + 1) as f64, round3(eda), round3(ecg)],
        )
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

impl Inlet for SyntheticInlet {
    fn handle(&self) -> &StreamHandle {
        &self.handle
    }

    fn pull_chunk(&mut self, max_samples: usize, _timeout: Duration) -> Result<Chunk> {
        let due = (self.opened_at.elapsed().as_secs_f64() * self.handle.nominal_rate) as u64;
        let ready = due.saturating_sub(self.produced).min(max_samples as u64);

        let mut rng = rand::thread_rng();
        let mut chunk = Chunk::default();
        for _ in 0..ready {
            let (timestamp, sample) = self.generate(self.produced, &mut rng);
            chunk.timestamps.push(timestamp);
            chunk.samples.push(sample);
            self.produced += 1;
        }

        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sample_from_raw_keeps_channel_order() {
        let channels = names(&["Index", "EDA", "ECG"]);
        let sample = Sample::from_raw(1.5, &channels, &[7.0, 1.2, 0.05], None);

        let keys: Vec<&str> = sample.values.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["Index", "EDA", "ECG"]);
        assert_eq!(sample.values["EDA"], 1.2);
    }

    #[test]
    fn test_sample_channel_filter() {
        let channels = names(&["Index", "EDA", "ECG"]);
        let include = names(&["EDA", "ECG"]);
        let sample = Sample::from_raw(0.0, &channels, &[1.0, 2.0, 3.0], Some(include.as_slice()));

        assert_eq!(sample.values.len(), 2);
        assert!(!sample.values.contains_key("Index"));
    }

    #[test]
    fn test_sample_json_shape() {
        let channels = names(&["EDA", "ECG"]);
        let sample = Sample::from_raw(2.0, &channels, &[1.2, 0.05], None);
        let json = sample.to_json();

        assert_eq!(json["timestamp"], 2.0);
        assert_eq!(json["values"]["EDA"], 1.2);
        assert_eq!(json["values"]["ECG"], 0.05);
    }

    #[test]
    fn test_synthetic_discovery_and_open() {
        let mut source = SyntheticSource::new();
        let handles = source.discover().unwrap();
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].channel_names, names(&["Index", "EDA", "ECG"]));

        let inlet = source.open(&handles[0]).unwrap();
        assert_eq!(inlet.handle().name, "FakeBio");
    }

    #[test]
    fn test_synthetic_open_unknown_stream() {
        let mut source = SyntheticSource::new();
        let mut handle = source.discover().unwrap().remove(0);
        handle.source_id = "other".to_string();
        assert!(source.open(&handle).is_err());
    }

    #[test]
    fn test_synthetic_pull_respects_max_and_clock() {
        let mut source = SyntheticSource::with_rate(1000.0);
        let handle = source.discover().unwrap().remove(0);
        let mut inlet = source.open(&handle).unwrap();

        std::thread::sleep(Duration::from_millis(30));

        let chunk = inlet.pull_chunk(5, Duration::ZERO).unwrap();
        assert_eq!(chunk.len(), 5);
        assert_eq!(chunk.timestamps.len(), 5);
        assert!(chunk.samples.iter().all(|s| s.len() == 3));

        // Index channel counts up, timestamps step by 1/rate
        assert_eq!(chunk.samples[0][0], 1.0);
        assert_eq!(chunk.samples[4][0], 5.0);
        assert_relative_eq!(
            chunk.timestamps[1] - chunk.timestamps[0],
            0.001,
            epsilon = 1e-5
        );

        // Next pull continues where the last one stopped
        let rest = inlet.pull_chunk(usize::MAX, Duration::ZERO).unwrap();
        if let Some(first) = rest.samples.first() {
            assert_eq!(first[0], 6.0);
        }
    }
}
