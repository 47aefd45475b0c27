//! Mailbox quota arithmetic.
//!
//! Quotas are stored in bytes and entered or displayed in megabytes
//! (1 MB = 1 048 576 bytes).

use serde::Serialize;

/// Bytes in one megabyte as used for quotas.
pub const BYTES_PER_MB: i64 = 1_048_576;

/// Quota given to a mailbox that has no metadata row yet (5 GiB).
pub const DEFAULT_QUOTA_BYTES: i64 = 5 * 1024 * BYTES_PER_MB;

/// Invalid quota input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QuotaError {
    #[error("quota cannot be negative")]
    Negative,
    #[error("quota is too large")]
    Overflow,
}

/// Convert a megabyte quota to bytes.
///
/// # Errors
///
/// Returns `QuotaError::Negative` for negative input and
/// `QuotaError::Overflow` if the byte count does not fit in an `i64`.
pub const fn mb_to_bytes(mb: i64) -> Result<i64, QuotaError> {
    if mb < 0 {
        return Err(QuotaError::Negative);
    }
    match mb.checked_mul(BYTES_PER_MB) {
        Some(bytes) => Ok(bytes),
        None => Err(QuotaError::Overflow),
    }
}

/// Convert bytes to whole megabytes, rounding to nearest.
#[must_use]
pub const fn bytes_to_mb(bytes: i64) -> i64 {
    let whole = bytes / BYTES_PER_MB;
    let rest = bytes % BYTES_PER_MB;
    if rest * 2 >= BYTES_PER_MB {
        whole + 1
    } else {
        whole
    }
}

/// Mailbox usage report returned to end users and admins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MailboxUsage {
    pub quota_bytes: i64,
    pub used_bytes: i64,
    pub quota_mb: i64,
    pub used_mb: i64,
    /// `used / quota × 100`, or 0 when the quota is 0.
    pub percentage: f64,
}

impl MailboxUsage {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(quota_bytes: i64, used_bytes: i64) -> Self {
        let percentage = if quota_bytes > 0 {
            used_bytes as f64 / quota_bytes as f64 * 100.0
        } else {
            0.0
        };

        Self {
            quota_bytes,
            used_bytes,
            quota_mb: bytes_to_mb(quota_bytes),
            used_mb: bytes_to_mb(used_bytes),
            percentage,
        }
    }
}
