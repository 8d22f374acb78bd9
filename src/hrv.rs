//! # HRV Statistics Module
//!
//! Time-domain summary of a finished session's interval set:
//! mean PPI, mean heart rate, SDNN and RMSSD.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HrvSummary {
    pub n: usize,
    /// Mean peak-to-peak interval, ms
    pub mean_ppi: f64,
    /// Beats per minute
    pub mean_hr: f64,
    /// Sample standard deviation of the intervals, ms
    pub sdnn: f64,
    /// Root mean square of successive differences, ms
    pub rmssd: f64,
}

/// Convert intervals counted in samples to milliseconds
pub fn intervals_to_ms(intervals: &[u32], sample_interval_ms: u32) -> Vec<u32> {
    intervals
        .iter()
        .map(|&samples| samples * sample_interval_ms)
        .collect()
}

pub fn analyze(intervals_ms: &[u32], min_intervals: usize) -> Result<HrvSummary, AnalysisError> {
    let n = intervals_ms.len();
    if n == 0 || n < min_intervals {
        return Err(AnalysisError::InsufficientData {
            required: min_intervals.max(1),
            available: n,
        });
    }

    let values: Vec<f64> = intervals_ms.iter().map(|&ms| ms as f64).collect();
    let mean_ppi = values.iter().sum::<f64>() / n as f64;

    // Single interval: no spread, no successive differences
    let (sdnn, rmssd) = if n > 1 {
        let dof = n as f64 - 1.0;
        let sdnn = (values.iter().map(|x| (x - mean_ppi).powi(2)).sum::<f64>() / dof).sqrt();
        let rmssd = (values
            .windows(2)
            .map(|w| (w[1] - w[0]).powi(2))
            .sum::<f64>()
            / dof)
            .sqrt();
        (sdnn, rmssd)
    } else {
        (0.0, 0.0)
    };

    Ok(HrvSummary {
        n,
        mean_ppi,
        mean_hr: 60_000.0 / mean_ppi,
        sdnn,
        rmssd,
    })
}
