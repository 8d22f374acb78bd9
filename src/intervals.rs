//! # Interval Filtering Module
//!
//! Plausibility filtering of beat-to-beat intervals and the smoothed live
//! heart rate shown while a session runs.
//!
//! Intervals are measured in samples. The accepted band comes from the
//! configured BPM limits: with 4 ms samples and 40–200 BPM it is
//! `75 < interval < 375` (300 ms to 1500 ms). Anything outside is treated
//! as noise or a double detection and silently dropped.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalBand {
    /// Exclusive lower bound in samples
    pub min_samples: u32,
    /// Exclusive upper bound in samples
    pub max_samples: u32,
}

impl IntervalBand {
    pub fn from_bpm(sample_interval_ms: u32, min_bpm: u32, max_bpm: u32) -> Self {
        let per_minute = 60_000 / sample_interval_ms.max(1);
        Self {
            min_samples: per_minute / max_bpm.max(1),
            max_samples: per_minute / min_bpm.max(1),
        }
    }

    pub fn accepts(&self, interval: u32) -> bool {
        self.min_samples < interval && interval < self.max_samples
    }

    #[allow(dead_code)]
    pub fn filter(&self, intervals: &[u32]) -> Vec<u32> {
        intervals
            .iter()
            .copied()
            .filter(|&interval| self.accepts(interval))
            .collect()
    }
}

/// Periodic BPM from the usable intervals seen in the last update period.
///
/// The period is counted in processed samples, not in intervals, so a
/// stretch without beats still advances it.
#[derive(Debug, Clone)]
pub struct RateSmoother {
    sample_interval_ms: u32,
    update_every: usize,
    processed: usize,
    window: Vec<u32>,
    bpm: Option<f64>,
}

impl RateSmoother {
    pub fn new(sample_interval_ms: u32, update_every: usize) -> Self {
        Self {
            sample_interval_ms: sample_interval_ms.max(1),
            update_every: update_every.max(1),
            processed: 0,
            window: Vec::new(),
            bpm: None,
        }
    }

    /// Add a usable interval (samples) to the current period
    pub fn push(&mut self, interval: u32) {
        self.window.push(interval);
    }

    /// Count one processed sample; returns the BPM when one is published
    pub fn on_sample(&mut self) -> Option<f64> {
        self.processed += 1;
        if self.processed < self.update_every {
            return None;
        }
        self.processed = 0;

        if self.window.is_empty() {
            return None;
        }

        let mean = self.window.iter().map(|&i| i as f64).sum::<f64>() / self.window.len() as f64;
        let bpm = 60_000.0 / self.sample_interval_ms as f64 / mean;
        self.window.clear();
        self.bpm = Some(bpm);
        Some(bpm)
    }

    /// Last published rate
    pub fn bpm(&self) -> Option<f64> {
        self.bpm
    }

    pub fn reset(&mut self) {
        self.processed = 0;
        self.window.clear();
        self.bpm = None;
    }
}
