//! Fixed-ratio decimation
//!
//! Reduces a source sample rate to a target rate by keeping every Nth sample.

use crate::error::{AcquisitionError, Result};

/// Keeps sample `i` iff `i % factor == 0`
///
/// The counter advances for every sample offered, kept or not, so the
/// modulus stays correct across chunk boundaries.
#[derive(Debug, Clone)]
pub struct Decimator {
    source_rate: f64,
    target_rate: f64,
    factor: u64,
    counter: u64,
}

impl Decimator {
    /// Create new decimator
    ///
    /// # Arguments
    ///
    /// * `source_rate` - Assumed source sample rate (e.g., 1000.0)
    /// * `target_rate` - Desired output rate (e.g., 100.0)
    ///
    /// The factor is `max(1, floor(source_rate / target_rate))`.
    pub fn new(source_rate: f64, target_rate: f64) -> Result<Self> {
        if !(source_rate.is_finite() && source_rate > 0.0) {
            return Err(AcquisitionError::invalid_config(format!(
                "Source rate must be positive, got {}",
                source_rate
            )));
        }

        if !(target_rate.is_finite() && target_rate > 0.0) {
            return Err(AcquisitionError::invalid_config(format!(
                "Target rate must be positive, got {}",
                target_rate
            )));
        }

        let factor = ((source_rate / target_rate).floor() as u64).max(1);

        Ok(Self {
            source_rate,
            target_rate,
            factor,
            counter: 0,
        })
    }

    /// Decide whether the next sample is kept
    pub fn keep(&mut self) -> bool {
        let kept = self.counter % self.factor == 0;
        self.counter = self.counter.wrapping_add(1);
        kept
    }

    /// Filter a batch, preserving order of kept items
    pub fn process<T, I>(&mut self, items: I) -> Vec<T>
    where
        I: IntoIterator<Item = T>,
    {
        items.into_iter().filter(|_| self.keep()).collect()
    }

    pub fn factor(&self) -> u64 {
        self.factor
    }

    /// Number of samples offered so far
    pub fn samples_seen(&self) -> u64 {
        self.counter
    }

    pub fn source_rate(&self) -> f64 {
        self.source_rate
    }

    pub fn target_rate(&self) -> f64 {
        self.target_rate
    }

    /// Restart counting from zero
    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_calculation() {
        assert_eq!(Decimator::new(1000.0, 100.0).unwrap().factor(), 10);
        assert_eq!(Decimator::new(1000.0, 300.0).unwrap().factor(), 3);
        // Upsampling request degrades to pass-through
        assert_eq!(Decimator::new(100.0, 1000.0).unwrap().factor(), 1);
        assert_eq!(Decimator::new(250.0, 250.0).unwrap().factor(), 1);
    }

    #[test]
    fn test_one_in_factor_kept() {
        for factor in 1..=12u64 {
            let mut decimator = Decimator::new(factor as f64 * 50.0, 50.0).unwrap();
            assert_eq!(decimator.factor(), factor);

            let input: Vec<u64> = (0..factor * 20).collect();
            let kept = decimator.process(input.clone());

            // Exactly one per window of `factor` consecutive samples
            for window in input.chunks(factor as usize) {
                let in_window = kept.iter().filter(|k| window.contains(k)).count();
                assert_eq!(in_window, 1, "factor {}", factor);
            }

            // Source order preserved
            assert!(kept.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_counter_spans_chunks() {
        let mut decimator = Decimator::new(1000.0, 250.0).unwrap();

        let first = decimator.process(vec![0, 1, 2]);
        let second = decimator.process(vec![3, 4, 5, 6, 7, 8]);

        assert_eq!(first, vec![0]);
        assert_eq!(second, vec![4, 8]);
        assert_eq!(decimator.samples_seen(), 9);
    }

    #[test]
    fn test_reset() {
        let mut decimator = Decimator::new(1000.0, 500.0).unwrap();
        assert!(decimator.keep());
        assert!(!decimator.keep());

        decimator.reset();
        assert!(decimator.keep());
    }

    #[test]
    fn test_invalid_config() {
        assert!(Decimator::new(0.0, 100.0).is_err());
        assert!(Decimator::new(1000.0, 0.0).is_err());
        assert!(Decimator::new(-5.0, 100.0).is_err());
        assert!(Decimator::new(f64::NAN, 100.0).is_err());
    }
}
