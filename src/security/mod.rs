//! Security primitives for steelgate.
//!
//! - **Tokens**: HMAC-SHA256 signed, time-limited approval links
//! - **Rate Limiting**: fixed-window per-client request counters
//! - **Path Blocking**: regex blocklist for scanner requests
//! - **Client Address**: best-effort client key from forwarding headers
//! - **Passwords**: Argon2id hashing and signup strength rules
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      Security Module                       │
//! ├──────────────┬───────────────┬──────────────┬──────────────┤
//! │ TokenCodec   │ RateLimiter   │ PathBlocklist│ client_key   │
//! │ HMAC-SHA256  │ DashMap       │ regex        │ XFF/X-Real-IP│
//! │ base64url    │ fixed window  │ 404 early    │              │
//! └──────────────┴───────────────┴──────────────┴──────────────┘
//! ```

pub mod client_addr;
pub mod password;
pub mod path_block;
pub mod rate_limit;
pub mod token;

pub use client_addr::{UNKNOWN_CLIENT, client_key};
pub use path_block::PathBlocklist;
pub use rate_limit::RateLimiter;
pub use token::{SigningKey, TokenAction, TokenCodec, TokenPolicy, VerifiedApproval};
