//! Unified error types for steelgate.
//!
//! Store, session, config and BOQ errors live next to their modules; this
//! file holds the errors that cross module boundaries, with static codes for
//! metric labels.

use crate::session::SessionError;
use thiserror::Error;

// ============================================================================
// Token Errors (approval link verification)
// ============================================================================

/// Why an approval token was rejected.
///
/// Only [`TokenError::Expired`] is distinguishable to the person clicking the
/// link. The other variants render the same "invalid link" page so that the
/// response never acts as a decoding or forgery oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Bad alphabet, oversized, undecodable, wrong field count or a field
    /// not in canonical form.
    #[error("malformed token")]
    Malformed,

    #[error("token action is not permitted")]
    InvalidAction,

    #[error("token expired")]
    Expired,

    #[error("token signature mismatch")]
    InvalidSignature,
}

impl TokenError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::InvalidAction => "invalid_action",
            Self::Expired => "expired",
            Self::InvalidSignature => "invalid_signature",
        }
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }
}

// ============================================================================
// Filter Errors (request filter chain)
// ============================================================================

/// Failures that abort the filter chain for one request.
///
/// Rejections (blocked path, rate limit, login redirect) are not errors; they
/// are [`FilterDecision`](crate::filter::FilterDecision) values.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The session provider could not be reached. Not retried here.
    #[error("session provider failed: {0}")]
    UpstreamSession(#[from] SessionError),
}

impl FilterError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UpstreamSession(_) => "upstream_session",
        }
    }
}
