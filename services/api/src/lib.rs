//! Trellis API service library crate.
//!
//! # Purpose
//! Exposes the HTTP API surface, the access middleware pipeline, session
//! verification, configuration, and storage backends for use by the binary
//! and integration tests.
//!
//! # Notes
//! Row-level filtering rules live in `trellis-access`; this crate decides
//! when they run and what happens to their results.
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod middleware;
pub mod model;
pub mod observability;
pub mod store;
