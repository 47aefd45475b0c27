//! Domain models for the portal.
//!
//! Each model maps one table (or a join) and is what handlers serialize as
//! JSON. Password hashes never appear on these types.

pub mod admin_user;
pub mod audit;
pub mod directory;
pub mod mailbox;
pub mod sending_limit;
pub mod session;
pub mod ticket;
pub mod user;

pub use admin_user::AdminUser;
pub use audit::AuditEntry;
pub use directory::{
    Alias, Announcement, Domain, Group, GroupMember, ScheduledAction, UserTemplate,
};
pub use mailbox::MailboxMetadata;
pub use sending_limit::{SendingLimit, SendingStats, Violation};
pub use session::{Actor, CurrentAdmin, CurrentUser, keys as session_keys};
pub use ticket::SupportTicket;
pub use user::User;
