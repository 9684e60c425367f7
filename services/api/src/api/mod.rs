//! HTTP API handlers and shared payload types.
pub mod admin;
pub mod error;
pub mod me;
pub mod openapi;
pub mod records;
pub mod system;
pub mod types;
