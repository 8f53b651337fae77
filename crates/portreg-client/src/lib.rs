//! Portreg Client - HTTP client for the port registry backend
//!
//! - [`api`] - REST client implementing [`portreg_core::PortBackend`]
//!
//! # Overview
//!
//! The client owns the naming boundary: records are snake_case on the wire
//! and camelCase in the core crate, and every translation happens here.

pub mod api;

pub use api::{PortApiClient, WirePort};
