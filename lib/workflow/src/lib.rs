//! Workflow models for scanstation.
//!
//! This crate provides:
//!
//! - **Workflow**: one workflow's attributes, template, validation rules and
//!   remote commands (submit, queue, capture)
//! - **Poller**: the long-poll task that keeps a saved workflow in sync
//! - **WorkflowCollection**: every workflow the server lists

pub mod attributes;
pub mod collection;
pub mod error;
pub mod model;
mod poller;

pub use attributes::{TEMPLATE_KEY, WorkflowAttributes};
pub use collection::WorkflowCollection;
pub use error::WorkflowError;
pub use model::Workflow;
