//! # Adaptive Threshold Module
//!
//! Running min/max over fixed batches of samples. When a batch completes,
//! its midpoint becomes the beat threshold for the *next* batch, so nothing
//! has to be buffered and the threshold trails the signal by one window.

use crate::sensor::Sample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdWindow {
    pub min: Sample,
    pub max: Sample,
    pub count: usize,
}

impl ThresholdWindow {
    fn seeded(sample: Sample) -> Self {
        Self {
            min: sample,
            max: sample,
            count: 0,
        }
    }

    fn include(&mut self, sample: Sample) {
        self.min = self.min.min(sample);
        self.max = self.max.max(sample);
        self.count += 1;
    }

    fn midpoint(&self) -> f64 {
        (self.min as f64 + self.max as f64) / 2.0
    }
}

#[derive(Debug, Clone)]
pub struct AdaptiveThreshold {
    window_len: usize,
    window: Option<ThresholdWindow>,
    threshold: Option<f64>,
}

impl AdaptiveThreshold {
    pub fn new(window_len: usize) -> Self {
        Self {
            window_len: window_len.max(1),
            window: None,
            threshold: None,
        }
    }

    /// Fold `sample` into the current window.
    ///
    /// Returns the new threshold when this sample completes the window.
    pub fn observe(&mut self, sample: Sample) -> Option<f64> {
        let window = self
            .window
            .get_or_insert_with(|| ThresholdWindow::seeded(sample));
        window.include(sample);

        if window.count < self.window_len {
            return None;
        }

        let threshold = window.midpoint();
        log::debug!(
            "Threshold window complete: min={} max={} threshold={:.1}",
            window.min,
            window.max,
            threshold
        );
        *window = ThresholdWindow::seeded(sample);
        self.threshold = Some(threshold);
        Some(threshold)
    }

    /// Threshold in force; `None` until the first window completes
    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    #[allow(dead_code)]
    pub fn window(&self) -> Option<ThresholdWindow> {
        self.window
    }

    pub fn reset(&mut self) {
        self.window = None;
        self.threshold = None;
    }
}
