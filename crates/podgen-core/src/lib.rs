//! # podgen-core
//!
//! The seams of the podgen autogeneration engine.
//!
//! This crate provides:
//! - The three collaborator traits (`PolicyObject`, `ReferenceShifter`,
//!   `DiagnosticSink`)
//! - Stock diagnostic sinks (`TracingSink`, `NullSink`, and `Vec<Diagnostic>`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use podgen_core::{traits::{DiagnosticSink, PolicyObject}, TracingSink};
//! ```

pub mod sink;
pub mod traits;

pub use sink::{NullSink, TracingSink};
