//! Error types for the podgen engine.
//!
//! Most "failures" in autogeneration are classification outcomes (a policy is
//! not eligible, a rule has no action body) and are expressed as values, not
//! errors. `PodgenError` covers the genuine faults: re-marshalling a derived
//! rule, reading policy documents and loading configuration.

use thiserror::Error;

/// The unified error type for podgen.
#[derive(Debug, Error)]
pub enum PodgenError {
    /// A derived rule could not be serialized to, or read back from, its wire
    /// JSON form.
    ///
    /// Local to one rule: the assembler reports it and moves on to the next one.
    #[error("failed to convert generated rule '{rule}' for {target}: {reason}")]
    Serialization {
        rule: String,
        target: String,
        reason: String,
    },

    /// A policy document is malformed or does not match the policy schema.
    #[error("failed to parse policy: {reason}")]
    PolicyParse { reason: String },

    /// A configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A pod controller resource does not embed a pod spec where it should.
    #[error("pod spec not found in {kind} resource")]
    PodSpecNotFound { kind: String },

    /// A result could not be rendered in the requested output format.
    #[error("failed to render {format} output: {reason}")]
    Render { format: String, reason: String },

    /// A file could not be read.
    #[error("failed to read '{path}': {reason}")]
    Io { path: String, reason: String },
}

/// Convenience alias used throughout the podgen crates.
pub type PodgenResult<T> = Result<T, PodgenError>;
