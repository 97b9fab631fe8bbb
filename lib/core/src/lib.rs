//! Core domain types and utilities for scanstation.
//!
//! This crate provides the identifiers and client mode shared by every
//! other scanstation crate.

pub mod id;
pub mod mode;

pub use id::{ParseIdError, QueuePosition, WorkflowId};
pub use mode::{ClientMode, ParseModeError};
