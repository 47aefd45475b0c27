//! Core types for Mailroom.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod audit;
pub mod email;
pub mod id;
pub mod patch;
pub mod quota;
pub mod status;

pub use audit::{AuditAction, BulkAction};
pub use email::{Email, EmailError};
pub use id::*;
pub use patch::{Patch, PatchError};
pub use quota::{
    BYTES_PER_MB, DEFAULT_QUOTA_BYTES, MailboxUsage, QuotaError, bytes_to_mb, mb_to_bytes,
};
pub use status::*;
