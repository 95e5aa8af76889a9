//! Input screening for Termgate.
//!
//! Everything a peer types passes through this crate before a session acts
//! on it:
//!
//! - [`Validator`]: the stateless four-stage pipeline (length, control
//!   characters, blacklist, charset) that turns a raw line into a sanitized
//!   value or a deterministic [`ValidationError`].
//! - [`RateLimiter`]: the shared per-origin table with a command track and
//!   a failed-login track, and the lockouts the second one produces.
//! - [`sanitize_for_log`]: escaping for raw input that ends up in logs.
//!
//! ```text
//! raw line → Validator → RateLimiter → session stage machine
//! ```

mod blacklist;
mod error;
mod limiter;
mod log_safe;
mod validator;

pub use blacklist::BlacklistRule;
pub use error::{RateLimitError, ValidationError};
pub use limiter::{LimiterConfig, LoginVerdict, RateLimiter, instant_after};
pub use log_safe::{sanitize_for_log, truncate_for_log};
pub use validator::{FieldKind, FieldLimits, RESERVED_USERNAMES, Validator, display_len};
