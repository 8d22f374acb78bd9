//! # Error Types Module
//!
//! Centralized error handling for the monitor.
//! Each stage of the engine has its own error type; the session controller
//! folds them into a single `SessionFailure` that ends the session.
//!
//! ## Error Types
//! - `ConfigError`: Configuration file I/O, parsing and validation errors
//! - `AnalysisError`: Local HRV statistics could not be computed
//! - `CloudError`: Remote analysis request failed
//! - `SessionFailure`: Terminal reason shown in the session's `Error` phase
//!
//! ## Usage Examples
//! ```rust
//! // Statistics use AnalysisError
//! pub fn analyze(intervals_ms: &[u32], min_intervals: usize) -> Result<HrvSummary, AnalysisError> { ... }
//!
//! // Cloud client uses CloudError
//! pub fn analyze(&mut self, intervals_ms: &[u32]) -> Result<CloudAnalysis, CloudError> { ... }
//! ```

use std::fmt;
use std::time::Duration;

/// Errors that can occur during configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read config file
    ReadFailed(std::io::Error),
    /// Failed to write config file
    WriteFailed(std::io::Error),
    /// Failed to parse config file
    ParseFailed(toml::de::Error),
    /// Failed to serialize config
    SerializeFailed(toml::ser::Error),
    /// Values parsed but cannot drive the engine
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ReadFailed(e) => {
                write!(f, "Failed to read config file: {}", e)
            }
            ConfigError::WriteFailed(e) => {
                write!(f, "Failed to write config file: {}", e)
            }
            ConfigError::ParseFailed(e) => {
                write!(f, "Failed to parse config file: {}", e)
            }
            ConfigError::SerializeFailed(e) => {
                write!(f, "Failed to serialize config: {}", e)
            }
            ConfigError::Invalid(reason) => {
                write!(f, "Invalid configuration: {}", reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadFailed(e) => Some(e),
            ConfigError::WriteFailed(e) => Some(e),
            ConfigError::ParseFailed(e) => Some(e),
            ConfigError::SerializeFailed(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

/// Errors from the local HRV statistics
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Too few usable intervals for the requested analysis
    InsufficientData { required: usize, available: usize },
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InsufficientData { required, available } => {
                write!(
                    f,
                    "Not enough usable intervals: {} collected, {} required",
                    available, required
                )
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

/// Errors from the remote analysis round trip
#[derive(Debug)]
pub enum CloudError {
    /// Too few intervals to send; nothing was published
    InsufficientData { required: usize, available: usize },
    /// Request payload could not be encoded
    Encode(serde_json::Error),
    /// Publish or receive on the message channel failed
    Transport(String),
    /// No matching reply arrived in time
    Timeout(Duration),
}

impl fmt::Display for CloudError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudError::InsufficientData { required, available } => {
                write!(
                    f,
                    "Not enough intervals for remote analysis: {} collected, {} required",
                    available, required
                )
            }
            CloudError::Encode(e) => {
                write!(f, "Failed to encode analysis request: {}", e)
            }
            CloudError::Transport(reason) => {
                write!(f, "Analysis service unreachable: {}", reason)
            }
            CloudError::Timeout(waited) => {
                write!(f, "No analysis reply after {:.1}s", waited.as_secs_f64())
            }
        }
    }
}

impl std::error::Error for CloudError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CloudError::Encode(e) => Some(e),
            _ => None,
        }
    }
}

/// Why a session ended in the `Error` phase
#[derive(Debug, Clone, PartialEq)]
pub enum SessionFailure {
    InsufficientData { required: usize, available: usize },
    TransportFailure(String),
    Timeout(Duration),
    /// Warm-up never produced a threshold
    SensorStall(Duration),
}

impl fmt::Display for SessionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionFailure::InsufficientData { required, available } => {
                write!(
                    f,
                    "Insufficient data: {} usable intervals, {} required",
                    available, required
                )
            }
            SessionFailure::TransportFailure(reason) => {
                write!(f, "Transport failure: {}", reason)
            }
            SessionFailure::Timeout(waited) => {
                write!(f, "Analysis timed out after {:.1}s", waited.as_secs_f64())
            }
            SessionFailure::SensorStall(waited) => {
                write!(
                    f,
                    "Sensor stalled: no signal window after {:.1}s",
                    waited.as_secs_f64()
                )
            }
        }
    }
}

impl std::error::Error for SessionFailure {}

impl From<AnalysisError> for SessionFailure {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InsufficientData { required, available } => {
                SessionFailure::InsufficientData { required, available }
            }
        }
    }
}

impl From<CloudError> for SessionFailure {
    fn from(err: CloudError) -> Self {
        match err {
            CloudError::InsufficientData { required, available } => {
                SessionFailure::InsufficientData { required, available }
            }
            CloudError::Encode(e) => SessionFailure::TransportFailure(e.to_string()),
            CloudError::Transport(reason) => SessionFailure::TransportFailure(reason),
            CloudError::Timeout(waited) => SessionFailure::Timeout(waited),
        }
    }
}
