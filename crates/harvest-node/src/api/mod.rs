//! HTTP API.

pub mod error;
pub mod health;
pub mod requests;
