//! Mailroom server library.
//!
//! The JSON API for the webmail account portal, exposed as a library so the
//! integration tests and the CLI can reuse its repositories and services.
//!
//! # Layers
//!
//! - [`routes`] - thin axum handlers, one per endpoint
//! - [`middleware`] - sessions, caller extractors, request ids, rate limiting
//! - [`services`] - lifecycle, quota, sending limits, auth, audit
//! - [`db`] - `PostgreSQL` repositories
//! - [`models`] - rows serialized as JSON

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
