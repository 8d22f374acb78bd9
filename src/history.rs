//! # Session History Module
//!
//! Results of completed sessions, tagged with where they were computed.
//! The list is append-only and lives in memory; storing it anywhere else is
//! up to the display layer.

use crate::cloud::CloudAnalysis;
use crate::hrv::HrvSummary;
use chrono::{DateTime, Local};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    Cloud,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Local => write!(f, "local"),
            Origin::Cloud => write!(f, "cloud"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub id: u32,
    pub timestamp: DateTime<Local>,
    pub mean_ppi: f64,
    pub mean_hr: f64,
    pub sdnn: f64,
    pub rmssd: f64,
    pub origin: Origin,
    pub sns: Option<f64>,
    pub pns: Option<f64>,
}

impl AnalysisResult {
    pub fn local(id: u32, summary: &HrvSummary) -> Self {
        Self {
            id,
            timestamp: Local::now(),
            mean_ppi: summary.mean_ppi,
            mean_hr: summary.mean_hr,
            sdnn: summary.sdnn,
            rmssd: summary.rmssd,
            origin: Origin::Local,
            sns: None,
            pns: None,
        }
    }

    pub fn cloud(id: u32, analysis: CloudAnalysis) -> Self {
        Self {
            id,
            timestamp: Local::now(),
            mean_ppi: analysis.mean_rr_ms,
            mean_hr: analysis.mean_hr_bpm,
            sdnn: analysis.sdnn_ms,
            rmssd: analysis.rmssd_ms,
            origin: Origin::Cloud,
            sns: Some(analysis.sns_index),
            pns: Some(analysis.pns_index),
        }
    }
}

impl fmt::Display for AnalysisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} [{}] HR {:.0} bpm, PPI {:.0} ms, SDNN {:.1} ms, RMSSD {:.1} ms",
            self.id,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.origin,
            self.mean_hr,
            self.mean_ppi,
            self.sdnn,
            self.rmssd
        )?;
        if let (Some(sns), Some(pns)) = (self.sns, self.pns) {
            write!(f, ", SNS {:.2}, PNS {:.2}", sns, pns)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct History {
    entries: Vec<AnalysisResult>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: AnalysisResult) {
        log::info!("History: recorded {}", result);
        self.entries.push(result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&AnalysisResult> {
        self.entries.last()
    }
}
