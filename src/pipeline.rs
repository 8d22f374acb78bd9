//! # Beat Pipeline Module
//!
//! Per-sample composition of the detector stages:
//! `AdaptiveThreshold` → `PeakTracker` → `IntervalBand` → `RateSmoother`.
//! Also owns the session-lifetime set of usable intervals that feeds the
//! final statistics.

use crate::config::Config;
use crate::intervals::{IntervalBand, RateSmoother};
use crate::peaks::PeakTracker;
use crate::sensor::Sample;
use crate::threshold::AdaptiveThreshold;

/// What one sample changed
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleOutcome {
    /// A threshold window completed with this sample
    pub threshold: Option<f64>,
    /// A beat was confirmed and its interval accepted
    pub accepted_interval: Option<u32>,
    /// The live rate was republished
    pub bpm: Option<f64>,
}

pub struct BeatPipeline {
    detector: AdaptiveThreshold,
    peaks: PeakTracker,
    band: IntervalBand,
    smoother: RateSmoother,
    session_intervals: Vec<u32>,
    index: u32,
    rejected: usize,
}

impl BeatPipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            detector: AdaptiveThreshold::new(config.threshold_window_samples),
            peaks: PeakTracker::new(),
            band: config.interval_band(),
            smoother: RateSmoother::new(config.sample_interval_ms, config.rate_update_samples),
            session_intervals: Vec::new(),
            index: 0,
            rejected: 0,
        }
    }

    /// Run one sample through every stage.
    ///
    /// The sample is classified against the threshold in force before it is
    /// folded into the current window.
    pub fn process(&mut self, sample: Sample) -> SampleOutcome {
        let index = self.index;
        self.index = self.index.wrapping_add(1);
        let mut outcome = SampleOutcome::default();

        if let Some(threshold) = self.detector.threshold() {
            let beat = self.peaks.update(sample, index, threshold);
            if let Some(interval) = beat.and_then(|event| event.interval) {
                if self.band.accepts(interval) {
                    self.smoother.push(interval);
                    self.session_intervals.push(interval);
                    outcome.accepted_interval = Some(interval);
                } else {
                    self.rejected += 1;
                    log::debug!("Rejected implausible interval of {} samples", interval);
                }
            }
            outcome.bpm = self.smoother.on_sample();
        }

        if let Some(threshold) = self.detector.observe(sample) {
            self.peaks.seed(threshold);
            outcome.threshold = Some(threshold);
        }

        outcome
    }

    #[allow(dead_code)]
    pub fn is_warmed_up(&self) -> bool {
        self.detector.threshold().is_some()
    }

    pub fn bpm(&self) -> Option<f64> {
        self.smoother.bpm()
    }

    /// Usable intervals collected since the last reset, in samples
    pub fn session_intervals(&self) -> &[u32] {
        &self.session_intervals
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Samples processed since the last reset
    #[allow(dead_code)]
    pub fn samples_processed(&self) -> u32 {
        self.index
    }

    pub fn reset(&mut self) {
        self.detector.reset();
        self.peaks.reset();
        self.smoother.reset();
        self.session_intervals.clear();
        self.index = 0;
        self.rejected = 0;
    }
}
