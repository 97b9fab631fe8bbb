//! Client for the scanstation workflow server.
//!
//! [`WorkflowApi`] is the request surface models are written against.
//! [`HttpApi`] implements it over reqwest, [`MockApi`] in memory.

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod mock;

pub use api::{JsonObject, WorkflowApi};
pub use self::config::{ClientConfig, PollSettings};
pub use error::ApiError;
pub use http::HttpApi;
pub use mock::{ApiCall, Endpoint, MockApi, poll_timeout};
