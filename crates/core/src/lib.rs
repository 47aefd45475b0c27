//! Mailroom Core - Shared domain types.
//!
//! This crate provides the types shared by the Mailroom components:
//! - `server` - JSON API for the end-user dashboard and the admin console
//! - `cli` - Command-line tools for migrations and operator bootstrap
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP. Status transition tables, quota arithmetic and partial
//! update semantics live here so they can be tested without a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, statuses, audit tags, quota math, patches

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
