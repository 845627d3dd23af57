// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Waypoint relay.

use thiserror::Error;

/// The primary error type used across store, agent, and relay boundaries.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration errors (missing credentials, bad URLs, unreachable database at startup).
    #[error("configuration error: {0}")]
    Config(String),

    /// A read or write against the real-time database failed.
    #[error("persistence error at `{path}`: {message}")]
    Persistence {
        path: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Reaching or talking to the remote agent failed.
    #[error("delegation error: {message}")]
    Delegation {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A stored or received document could not be decoded.
    #[error("decode error: {message}")]
    Decode {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A conversation key component violates the database key rules.
    #[error("invalid conversation key: {0}")]
    InvalidKey(String),

    /// A dotted itinerary field path could not be resolved.
    #[error("invalid field path `{path}`: {reason}")]
    InvalidFieldPath { path: String, reason: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Shorthand for a persistence error without an underlying source.
    pub fn persistence(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }
}
