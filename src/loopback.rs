//! # Loopback Analyzer Module
//!
//! In-process stand-in for the remote HRV analysis service, so the cloud
//! path can run without a broker. Requests published through
//! `LoopbackTransport` are answered by `LoopbackAnalyzer` after a fixed
//! latency, on the same topic pair a real service would use.
//!
//! ## Key Components
//! - `LoopbackAnalyzer`: service loop, run on its own thread with a Tokio runtime
//! - `LoopbackTransport`: device-side `Transport` over crossbeam channels
//!
//! The SNS/PNS indices it returns are rough population-normalised scores,
//! good enough to exercise the display path, not clinical values.

use crate::cloud::{AnalysisReply, AnalysisRequest, CloudAnalysis, ReplyData, Transport};
use crate::error::CloudError;
use crate::hrv;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tokio::runtime::Runtime;

// Population reference values used for the autonomic indices
const REFERENCE_MEAN_RR_MS: f64 = 926.0;
const REFERENCE_MEAN_RR_SPREAD: f64 = 90.0;
const REFERENCE_RMSSD_MS: f64 = 42.0;
const REFERENCE_RMSSD_SPREAD: f64 = 15.0;
const REFERENCE_MEAN_HR: f64 = 66.0;
const REFERENCE_MEAN_HR_SPREAD: f64 = 9.0;

#[derive(Debug, Clone)]
pub struct Envelope {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Device side of the loopback channel pair
pub struct LoopbackTransport {
    outgoing: Sender<Envelope>,
    incoming: Receiver<Envelope>,
}

impl Transport for LoopbackTransport {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CloudError> {
        self.outgoing
            .send(Envelope {
                topic: topic.to_string(),
                payload: payload.to_vec(),
            })
            .map_err(|_| CloudError::Transport("analyzer is not running".into()))
    }

    fn receive(&mut self, topic: &str, timeout: Duration) -> Result<Option<Vec<u8>>, CloudError> {
        match self.incoming.recv_timeout(timeout) {
            Ok(envelope) if envelope.topic == topic => Ok(Some(envelope.payload)),
            Ok(envelope) => {
                log::debug!("Loopback: dropping message on unrelated topic {}", envelope.topic);
                Ok(None)
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(CloudError::Transport("analyzer disconnected".into()))
            }
        }
    }
}

/// Answers analysis requests like the remote service would.
///
/// Runs in a dedicated thread with its own Tokio runtime; each request is
/// handled on a spawned task so a slow reply does not hold up the next one.
pub struct LoopbackAnalyzer {
    requests: Receiver<Envelope>,
    replies: Sender<Envelope>,
    request_topic: String,
    response_topic: String,
    latency: Duration,
}

impl LoopbackAnalyzer {
    /// Creates the analyzer and the transport the device uses to reach it
    pub fn new(
        request_topic: &str,
        response_topic: &str,
        latency: Duration,
    ) -> (Self, LoopbackTransport) {
        let (request_tx, request_rx) = unbounded();
        let (reply_tx, reply_rx) = unbounded();

        let analyzer = LoopbackAnalyzer {
            requests: request_rx,
            replies: reply_tx,
            request_topic: request_topic.to_string(),
            response_topic: response_topic.to_string(),
            latency,
        };
        let transport = LoopbackTransport {
            outgoing: request_tx,
            incoming: reply_rx,
        };

        (analyzer, transport)
    }

    /// Runs the service loop until the device side is dropped
    pub fn run(self) {
        let rt = match Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                log::error!("Loopback analyzer: failed to create async runtime: {}", e);
                return;
            }
        };

        while let Ok(envelope) = self.requests.recv() {
            if envelope.topic != self.request_topic {
                log::debug!("Loopback analyzer: ignoring topic {}", envelope.topic);
                continue;
            }

            let request: AnalysisRequest = match serde_json::from_slice(&envelope.payload) {
                Ok(request) => request,
                Err(e) => {
                    log::warn!("Loopback analyzer: unreadable request: {}", e);
                    continue;
                }
            };
            log::info!(
                "Loopback analyzer: request {} with {} intervals",
                request.id,
                request.data.len()
            );

            let replies = self.replies.clone();
            let topic = self.response_topic.clone();
            let latency = self.latency;

            rt.spawn(async move {
                tokio::time::sleep(latency).await;

                let Some(reply) = Self::answer(&request) else {
                    log::warn!("Loopback analyzer: request {} carried no intervals", request.id);
                    return;
                };
                match serde_json::to_vec(&reply) {
                    Ok(payload) => {
                        let _ = replies.send(Envelope { topic, payload });
                    }
                    Err(e) => log::error!("Loopback analyzer: failed to encode reply: {}", e),
                }
            });
        }

        log::info!("Loopback analyzer: request channel closed, shutting down");
    }

    fn answer(request: &AnalysisRequest) -> Option<AnalysisReply> {
        let summary = hrv::analyze(&request.data, 1).ok()?;

        let pns_index = ((summary.mean_ppi - REFERENCE_MEAN_RR_MS) / REFERENCE_MEAN_RR_SPREAD
            + (summary.rmssd - REFERENCE_RMSSD_MS) / REFERENCE_RMSSD_SPREAD)
            / 2.0;
        let sns_index = ((summary.mean_hr - REFERENCE_MEAN_HR) / REFERENCE_MEAN_HR_SPREAD
            + (REFERENCE_RMSSD_MS - summary.rmssd) / REFERENCE_RMSSD_SPREAD)
            / 2.0;

        Some(AnalysisReply {
            id: request.id,
            data: ReplyData {
                analysis: CloudAnalysis {
                    mean_hr_bpm: summary.mean_hr,
                    mean_rr_ms: summary.mean_ppi,
                    rmssd_ms: summary.rmssd,
                    sdnn_ms: summary.sdnn,
                    sns_index,
                    pns_index,
                },
            },
        })
    }
}
