//! Error types for the section tracker and its state containers
//!
//! Tracker errors are configuration-level: once a tracker is running, platform
//! trouble degrades to "no highlighting" instead of surfacing as an error.

use thiserror::Error;

/// Errors raised while building or driving a section tracker
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrackerError {
    #[error("section layout must contain at least one section")]
    EmptyLayout,

    #[error("duplicate section id '{0}'")]
    DuplicateSection(String),

    #[error("sections '{first}' and '{second}' share navigation order {order}")]
    DuplicateOrder {
        first: String,
        second: String,
        order: u32,
    },

    #[error("unknown section '{0}'")]
    UnknownSection(String),

    #[error("invalid root margin '{0}'")]
    InvalidRootMargin(String),

    #[error("threshold {0} is outside [0, 1]")]
    InvalidThreshold(f64),

    #[error("invalid tracker configuration: {0}")]
    InvalidConfig(String),

    #[error("intersection platform error: {0}")]
    Platform(String),
}

/// Errors raised by a preference store
#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("failed to access preference file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode preferences: {0}")]
    Encode(#[from] serde_json::Error),
}
