//! HTTP middleware stack for the portal.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (`x-request-id` on span, Sentry scope and response)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//! 5. Rate limiting (login routes only)
//!
//! Authentication is not a layer: handlers take [`RequireAdmin`],
//! [`RequireSuperAdmin`] or [`RequireUser`] extractors.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{OptionalIdentity, RequireAdmin, RequireSuperAdmin, RequireUser, SessionIdentity};
pub use rate_limit::{RateLimiterLayer, auth_rate_limiter, json_rate_limit_body};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
pub use session::create_session_layer;
