//! # Peak Tracking Module
//!
//! Streaming local-maximum detector. While the signal is above threshold the
//! tracker keeps the highest sample of the excursion; when the signal drops
//! back to or below threshold that sample is confirmed as a beat and the
//! distance to the previous beat (in samples) is reported.
//!
//! ## Tie-break
//! Candidates are replaced on `>=`, so when several samples of one excursion
//! share the maximum value the latest of them marks the beat.

use crate::sensor::Sample;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakCandidate {
    pub value: f64,
    /// `None` until a sample has actually been captured
    pub index: Option<u32>,
}

/// A newly confirmed beat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeakEvent {
    pub index: u32,
    /// Samples since the previous beat, absent for the first beat
    pub interval: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct PeakTracker {
    candidate: Option<PeakCandidate>,
    previous_index: Option<u32>,
}

impl PeakTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the first candidate floor once a threshold exists
    pub fn seed(&mut self, threshold: f64) {
        if self.candidate.is_none() {
            self.candidate = Some(PeakCandidate {
                value: threshold,
                index: None,
            });
        }
    }

    pub fn update(&mut self, sample: Sample, index: u32, threshold: f64) -> Option<PeakEvent> {
        let candidate = self.candidate.get_or_insert(PeakCandidate {
            value: threshold,
            index: None,
        });
        let value = sample as f64;

        if value > threshold {
            if value >= candidate.value {
                *candidate = PeakCandidate {
                    value,
                    index: Some(index),
                };
            }
            return None;
        }

        // Excursion over: confirm whatever the candidate captured
        candidate.value = threshold;
        let peak_index = candidate.index?;
        if self.previous_index == Some(peak_index) {
            return None;
        }

        let interval = self.previous_index.map(|previous| peak_index - previous);
        self.previous_index = Some(peak_index);
        log::debug!("Beat at sample {} (interval {:?})", peak_index, interval);

        Some(PeakEvent {
            index: peak_index,
            interval,
        })
    }

    #[allow(dead_code)]
    pub fn candidate(&self) -> Option<PeakCandidate> {
        self.candidate
    }

    pub fn reset(&mut self) {
        self.candidate = None;
        self.previous_index = None;
    }
}
