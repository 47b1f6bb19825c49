// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the firehose pipeline.
//!
//! Errors are categorized by where they occur (broker I/O, offset
//! resolution, publishing, configuration) and include context to help
//! with debugging.
//!
//! # Error Categories
//!
//! | Error Type | Retryable | Description |
//! |------------|-----------|-------------|
//! | `Broker` | Yes | Broker read/metadata errors, timeouts, connection failures |
//! | `OffsetUnavailable` | No | Offset bounds could not be resolved (fatal for job setup) |
//! | `Publish` | No | Delivery to the destination failed (fatal per worker) |
//! | `Config` | No | Configuration invalid |
//! | `InvalidState` | No | Engine state machine violation |
//! | `Shutdown` | No | Pipeline is shutting down |
//! | `Internal` | No | Unexpected internal error |
//!
//! # Retry Behavior
//!
//! Use [`FirehoseError::is_retryable()`] to decide whether an operation
//! should be retried against the partition's error budget. Retryable
//! errors indicate transient broker trouble; non-retryable errors
//! indicate setup problems or conditions the pipeline treats as fatal
//! for the affected partition or worker.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, FirehoseError>;

/// Errors that can occur while mirroring a topic.
#[derive(Error, Debug)]
pub enum FirehoseError {
    /// Broker communication error.
    ///
    /// Read failures, metadata lookups, watermark queries. These are
    /// typically retryable (network timeouts, leader elections) and
    /// count against the partition's error budget.
    #[error("Broker error ({operation}): {message}")]
    Broker {
        operation: String,
        message: String,
        #[source]
        source: Option<rdkafka::error::KafkaError>,
    },

    /// Offset bounds could not be retrieved for a partition.
    ///
    /// The broker was unreachable or the partition holds no messages.
    /// Fatal for that partition's job setup; the caller must restart
    /// offset resolution.
    #[error("Offset unavailable for {topic}/{partition}: {message}")]
    OffsetUnavailable {
        topic: String,
        partition: i32,
        message: String,
    },

    /// Delivery to the destination cluster failed.
    ///
    /// Treated as fatal for the publishing worker; the record is
    /// surfaced as a loss metric rather than migrated to a sibling.
    #[error("Publish failed for {topic}/{partition}: {message}")]
    Publish {
        topic: String,
        partition: i32,
        message: String,
    },

    /// Invalid or missing configuration.
    ///
    /// Not retryable. Fix the configuration and restart.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Engine state machine violation.
    ///
    /// An operation was attempted in the wrong state (e.g. calling
    /// `start()` on a running pipeline). Indicates a bug in the caller.
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// Shutdown in progress.
    ///
    /// Returned when an operation is attempted after the shutdown
    /// signal fired (e.g. enqueueing onto a closed transfer queue).
    #[error("Shutdown in progress")]
    Shutdown,

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FirehoseError {
    /// Create a broker error from an underlying rdkafka error.
    pub fn broker(operation: impl Into<String>, source: rdkafka::error::KafkaError) -> Self {
        Self::Broker {
            operation: operation.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a broker error without an underlying source.
    pub fn broker_msg(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Broker {
            operation: operation.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create an offset-resolution error for a partition.
    pub fn offset_unavailable(
        topic: impl Into<String>,
        partition: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::OffsetUnavailable {
            topic: topic.into(),
            partition,
            message: message.into(),
        }
    }

    /// Create a publish error for a record's destination.
    pub fn publish(topic: impl Into<String>, partition: i32, message: impl Into<String>) -> Self {
        Self::Publish {
            topic: topic.into(),
            partition,
            message: message.into(),
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Broker { .. } => true,
            Self::OffsetUnavailable { .. } => false,
            Self::Publish { .. } => false,
            Self::Config(_) => false,
            Self::InvalidState { .. } => false,
            Self::Shutdown => false,
            Self::Internal(_) => false,
        }
    }
}

impl From<rdkafka::error::KafkaError> for FirehoseError {
    fn from(e: rdkafka::error::KafkaError) -> Self {
        Self::broker("unknown", e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable_broker() {
        let err = FirehoseError::broker_msg("fetch", "connection reset");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("fetch"));
    }

    #[test]
    fn test_not_retryable_offset_unavailable() {
        let err = FirehoseError::offset_unavailable("events", 3, "no messages");
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("events/3"));
    }

    #[test]
    fn test_not_retryable_publish() {
        let err = FirehoseError::publish("events", 7, "delivery timed out");
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("events/7"));
    }

    #[test]
    fn test_not_retryable_config() {
        let err = FirehoseError::Config("queue capacity must be non-zero".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_not_retryable_invalid_state() {
        let err = FirehoseError::InvalidState {
            expected: "Created".to_string(),
            actual: "Running".to_string(),
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("Created"));
        assert!(err.to_string().contains("Running"));
    }

    #[test]
    fn test_not_retryable_shutdown() {
        assert!(!FirehoseError::Shutdown.is_retryable());
    }

    #[test]
    fn test_not_retryable_internal() {
        let err = FirehoseError::Internal("unexpected panic".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_broker_error_formatting() {
        let err = FirehoseError::Broker {
            operation: "watermarks".to_string(),
            message: "timeout".to_string(),
            source: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("Broker error"));
        assert!(msg.contains("watermarks"));
        assert!(msg.contains("timeout"));
    }
}
