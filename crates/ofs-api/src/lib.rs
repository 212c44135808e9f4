//! OFS API Library
//!
//! This crate provides the HTTP handlers, application state and setup for the file
//! persistence service.

mod api_doc;
mod handlers;
mod telemetry;

pub mod error;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
