//! # podgen-contracts
//!
//! Shared types for the podgen workspace: policy and rule shapes, controller
//! kinds and selections, diagnostics and the error type.
//!
//! No business logic lives in this crate, only data definitions and the small
//! accessors the other crates share.

pub mod controller;
pub mod diagnostic;
pub mod error;
pub mod kind;
pub mod policy;
pub mod rule;
