//! Business logic services for the portal.
//!
//! # Services
//!
//! - `audit` - Audit recorder (one entry per administrative mutation)
//! - `auth` - Local password authentication and lockout
//! - `lifecycle` - Account lifecycle (suspend, unlock, delete, bulk actions)
//! - `quota` - Mailbox quota and usage
//! - `sending_limits` - Sending-limit ledger policy and statistics

pub mod audit;
pub mod auth;
pub mod lifecycle;
pub mod quota;
pub mod sending_limits;

pub use audit::AuditRecorder;
pub use auth::{AuthError, AuthService};
pub use lifecycle::LifecycleService;
pub use quota::QuotaService;
pub use sending_limits::SendingLimitService;
