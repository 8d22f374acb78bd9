//! # Cloud Analysis Module
//!
//! Sends a finished session's intervals to a remote HRV analyzer over a
//! publish/subscribe channel pair and waits for the matching reply.
//!
//! ## Protocol
//! Request (on `request_topic`):
//! ```json
//! {"id": 7, "type": "PPI", "data": [812, 796, 830], "analysis": {"type": "readiness"}}
//! ```
//! Reply (on `response_topic`):
//! ```json
//! {"id": 7, "data": {"analysis": {"mean_hr_bpm": 73.9, "mean_rr_ms": 812.7,
//!   "rmssd_ms": 27.1, "sdnn_ms": 14.0, "sns_index": 0.4, "pns_index": -0.6}}}
//! ```
//! Replies are matched on `id`; anything else arriving on the topic is
//! skipped. Only one request is in flight at a time and the wait is bounded
//! by the configured reply timeout.

use crate::config::Config;
use crate::error::CloudError;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Message channel to the analyzer. Broker mechanics live behind this.
pub trait Transport {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CloudError>;

    /// Wait up to `timeout` for the next message on `topic`
    fn receive(&mut self, topic: &str, timeout: Duration) -> Result<Option<Vec<u8>>, CloudError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisKind {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: String,
    /// Intervals in milliseconds
    pub data: Vec<u32>,
    pub analysis: AnalysisKind,
}

impl AnalysisRequest {
    pub fn readiness(id: u32, intervals_ms: &[u32]) -> Self {
        Self {
            id,
            kind: "PPI".to_string(),
            data: intervals_ms.to_vec(),
            analysis: AnalysisKind {
                kind: "readiness".to_string(),
            },
        }
    }
}

/// Analyzer output; extra fields in the reply are ignored
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CloudAnalysis {
    pub mean_hr_bpm: f64,
    pub mean_rr_ms: f64,
    pub rmssd_ms: f64,
    pub sdnn_ms: f64,
    pub sns_index: f64,
    pub pns_index: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyData {
    pub analysis: CloudAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReply {
    pub id: u32,
    pub data: ReplyData,
}

pub struct CloudAnalysisClient<T: Transport> {
    transport: T,
    request_topic: String,
    response_topic: String,
    reply_timeout: Duration,
    min_intervals: usize,
    next_id: u32,
}

impl<T: Transport> CloudAnalysisClient<T> {
    pub fn new(transport: T, config: &Config) -> Self {
        Self {
            transport,
            request_topic: config.request_topic.clone(),
            response_topic: config.response_topic.clone(),
            reply_timeout: config.reply_timeout(),
            min_intervals: config.cloud_min_intervals,
            next_id: 1,
        }
    }

    #[allow(dead_code)]
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    fn next_request_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    /// Publish `intervals_ms` and block until the matching reply or timeout
    pub fn analyze(&mut self, intervals_ms: &[u32]) -> Result<CloudAnalysis, CloudError> {
        if intervals_ms.len() < self.min_intervals {
            return Err(CloudError::InsufficientData {
                required: self.min_intervals,
                available: intervals_ms.len(),
            });
        }

        let id = self.next_request_id();
        let request = AnalysisRequest::readiness(id, intervals_ms);
        let payload = serde_json::to_vec(&request).map_err(CloudError::Encode)?;

        self.transport.publish(&self.request_topic, &payload)?;
        log::info!(
            "Cloud: request {} published with {} intervals",
            id,
            intervals_ms.len()
        );

        self.await_reply(id)
    }

    fn await_reply(&mut self, id: u32) -> Result<CloudAnalysis, CloudError> {
        let started = Instant::now();
        let deadline = started + self.reply_timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(CloudError::Timeout(self.reply_timeout));
            }

            let Some(payload) = self.transport.receive(&self.response_topic, remaining)? else {
                continue;
            };

            match serde_json::from_slice::<AnalysisReply>(&payload) {
                Ok(reply) if reply.id == id => {
                    log::info!(
                        "Cloud: reply {} received after {} ms",
                        id,
                        started.elapsed().as_millis()
                    );
                    return Ok(reply.data.analysis);
                }
                Ok(reply) => {
                    log::warn!(
                        "Cloud: skipping reply {} while waiting for {}",
                        reply.id,
                        id
                    );
                }
                Err(e) => {
                    log::warn!("Cloud: skipping malformed reply: {}", e);
                }
            }
        }
    }
}
