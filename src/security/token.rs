//! Signed approval tokens.
//!
//! An approval token is a bearer capability carried in the query string of
//! the link mailed to admins when an account registers. It names one account,
//! one action and an absolute expiry, and is authenticated with HMAC-SHA256
//! under a server-only key. Nothing about issued tokens is stored.
//!
//! # Wire Format
//!
//! ```text
//! base64url_nopad("{uuid}:approve:{expires_at_ms}:{hex(hmac)}")
//! ```
//!
//! Every field must be in canonical form (lowercase hyphenated UUID, the
//! literal action, decimal millis without sign or leading zeros, 64 lowercase
//! hex digits). Together with the no-padding/no-trailing-bits base64 rules,
//! this makes every valid token the only encoding of its contents.
//!
//! # MAC Input
//!
//! The MAC is not computed over the `:`-joined text. Each field is written as
//! a big-endian `u32` length followed by its bytes, after a fixed domain
//! label, so field boundaries are unambiguous whatever the field contents.
//!
//! # Check Order
//!
//! After the structural checks, verification runs MAC, then action, then
//! expiry. The MAC goes first so that no field of an unauthenticated token is
//! acted on, and so a forged token cannot learn whether its action or expiry
//! would have passed. Every token reaches exactly one [`TokenError`], and a
//! correctly signed token gets the same `InvalidAction` or `Expired` result it
//! would under action-first ordering. The only observable difference is that
//! a token which is both forged and expired reports `InvalidSignature`.
//!
//! # Replay
//!
//! A token stays usable until it expires. That is only safe because the one
//! action it authorizes, pending -> approved, is monotone and idempotent. A
//! non-idempotent action would need a consumed-token ledger with the same TTL.

use crate::caps::{ApproveAccount, Cap};
use crate::error::TokenError;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::time::Duration;
use subtle::ConstantTimeEq;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

const MAC_DOMAIN: &[u8] = b"steelgate/approval-token/v1";

/// Length of a hyphenated UUID string.
const UUID_TEXT_LEN: usize = 36;

/// Hex digits in an HMAC-SHA256 tag.
const SIGNATURE_HEX_LEN: usize = 64;

/// Default validity window for freshly issued tokens (48 hours).
pub const DEFAULT_TOKEN_VALIDITY: Duration = Duration::from_secs(48 * 60 * 60);

/// Default tolerance for clocks that disagree between issuer and verifier.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// Tokens longer than this are rejected before any decoding.
pub const DEFAULT_MAX_TOKEN_LEN: usize = 500;

/// The closed set of actions a token can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAction {
    Approve,
}

impl TokenAction {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(Self::Approve),
            _ => None,
        }
    }
}

/// HMAC key for approval tokens. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey(<{} bytes redacted>)", self.0.len())
    }
}

/// Lifetime and size limits applied to tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    pub validity: Duration,
    pub clock_skew: Duration,
    pub max_len: usize,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            validity: DEFAULT_TOKEN_VALIDITY,
            clock_skew: DEFAULT_CLOCK_SKEW,
            max_len: DEFAULT_MAX_TOKEN_LEN,
        }
    }
}

/// A token that passed every check.
///
/// Holds the [`Cap<ApproveAccount>`] for the named account; the account store
/// will not approve anything without one.
#[derive(Debug)]
pub struct VerifiedApproval {
    cap: Cap<ApproveAccount>,
    expires_at_ms: i64,
}

impl VerifiedApproval {
    pub fn subject(&self) -> Uuid {
        *self.cap.scope()
    }

    pub fn expires_at_ms(&self) -> i64 {
        self.expires_at_ms
    }

    pub fn into_cap(self) -> Cap<ApproveAccount> {
        self.cap
    }
}

/// Encodes and verifies approval tokens under one signing key.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    key: SigningKey,
    policy: TokenPolicy,
}

impl TokenCodec {
    pub fn new(key: SigningKey, policy: TokenPolicy) -> Self {
        Self { key, policy }
    }

    pub fn policy(&self) -> &TokenPolicy {
        &self.policy
    }

    /// Encode an approve token for `subject` expiring at `expires_at_ms`.
    ///
    /// The action is fixed; there is no way to mint any other kind of token.
    pub fn encode(&self, subject: Uuid, expires_at_ms: i64) -> String {
        let subject = subject.hyphenated().to_string();
        let action = TokenAction::Approve.as_str();
        let expires = expires_at_ms.to_string();
        let signature = hex::encode(self.sign(&subject, action, &expires));

        URL_SAFE_NO_PAD.encode(format!("{subject}:{action}:{expires}:{signature}"))
    }

    /// Encode a token valid for the policy's validity window from `now_ms`.
    ///
    /// Returns the token and its expiry.
    pub fn issue(&self, subject: Uuid, now_ms: i64) -> (String, i64) {
        let expires_at_ms = now_ms.saturating_add(duration_ms(self.policy.validity));
        (self.encode(subject, expires_at_ms), expires_at_ms)
    }

    /// Verify a token against the current wall clock.
    pub fn verify(&self, token: &str) -> Result<VerifiedApproval, TokenError> {
        self.verify_at(token, chrono::Utc::now().timestamp_millis())
    }

    /// Verify a token as of `now_ms` (epoch milliseconds).
    ///
    /// The MAC is checked before the action and expiry are interpreted, so a
    /// modified token always fails as `Malformed` or `InvalidSignature`.
    pub fn verify_at(&self, token: &str, now_ms: i64) -> Result<VerifiedApproval, TokenError> {
        if token.is_empty()
            || token.len() > self.policy.max_len
            || !token.bytes().all(is_url_safe_byte)
        {
            return Err(TokenError::Malformed);
        }

        let decoded = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| TokenError::Malformed)?;
        let decoded = String::from_utf8(decoded).map_err(|_| TokenError::Malformed)?;

        let fields: Vec<&str> = decoded.split(':').collect();
        let [subject, action, expires, signature] = fields.as_slice() else {
            return Err(TokenError::Malformed);
        };

        let expires_at_ms: i64 = expires.parse().map_err(|_| TokenError::Malformed)?;
        if expires_at_ms.to_string() != *expires {
            return Err(TokenError::Malformed);
        }

        let subject_id = parse_canonical_uuid(subject).ok_or(TokenError::Malformed)?;

        if signature.len() != SIGNATURE_HEX_LEN || !signature.bytes().all(is_lower_hex_byte) {
            return Err(TokenError::Malformed);
        }
        let provided = hex::decode(signature).map_err(|_| TokenError::Malformed)?;
        let expected = self.sign(subject, action, expires);
        if !bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
            return Err(TokenError::InvalidSignature);
        }

        if TokenAction::parse(action).is_none() {
            return Err(TokenError::InvalidAction);
        }

        if now_ms > expires_at_ms.saturating_add(duration_ms(self.policy.clock_skew)) {
            return Err(TokenError::Expired);
        }

        Ok(VerifiedApproval {
            cap: Cap::new(subject_id),
            expires_at_ms,
        })
    }

    fn sign(&self, subject: &str, action: &str, expires: &str) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(self.key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(MAC_DOMAIN);
        for field in [subject, action, expires] {
            mac.update(&(field.len() as u32).to_be_bytes());
            mac.update(field.as_bytes());
        }
        mac.finalize().into_bytes().to_vec()
    }
}

fn is_url_safe_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn is_lower_hex_byte(b: u8) -> bool {
    matches!(b, b'0'..=b'9' | b'a'..=b'f')
}

fn parse_canonical_uuid(s: &str) -> Option<Uuid> {
    if s.len() != UUID_TEXT_LEN {
        return None;
    }
    let id = Uuid::parse_str(s).ok()?;
    (id.hyphenated().to_string() == s).then_some(id)
}

fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000_000;
    const SUBJECT: &str = "11111111-1111-1111-1111-111111111111";

    fn codec(secret: &str) -> TokenCodec {
        TokenCodec::new(SigningKey::new(secret.as_bytes()), TokenPolicy::default())
    }

    fn subject() -> Uuid {
        Uuid::parse_str(SUBJECT).unwrap()
    }

    /// Build a token from raw fields, signed correctly over exactly those fields.
    fn hand_built(codec: &TokenCodec, subject: &str, action: &str, expires: &str) -> String {
        let signature = hex::encode(codec.sign(subject, action, expires));
        URL_SAFE_NO_PAD.encode(format!("{subject}:{action}:{expires}:{signature}"))
    }

    #[test]
    fn round_trip_returns_subject_and_expiry() {
        let codec = codec("round-trip-secret-round-trip-secret");
        let expiry = NOW + 3_600_000;
        let token = codec.encode(subject(), expiry);

        let verified = codec.verify_at(&token, NOW).unwrap();
        assert_eq!(verified.subject(), subject());
        assert_eq!(verified.expires_at_ms(), expiry);
    }

    #[test]
    fn encoded_token_is_url_safe_without_padding() {
        let token = codec("k").encode(Uuid::new_v4(), NOW);
        assert!(token.bytes().all(is_url_safe_byte));
        assert!(!token.contains('='));
    }

    #[test]
    fn issue_uses_validity_window() {
        let codec = codec("issue-secret");
        let (token, expires) = codec.issue(subject(), NOW);
        assert_eq!(expires, NOW + 48 * 60 * 60 * 1000);
        assert_eq!(codec.verify_at(&token, NOW).unwrap().expires_at_ms(), expires);
    }

    #[test]
    fn flipping_any_character_never_verifies() {
        let codec = codec("tamper-secret-tamper-secret-tamper");
        let token = codec.encode(subject(), NOW + 3_600_000);
        let alphabet = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

        for i in 0..token.len() {
            let original = token.as_bytes()[i];
            for &replacement in alphabet.iter().filter(|&&c| c != original) {
                let mut bytes = token.clone().into_bytes();
                bytes[i] = replacement;
                let tampered = String::from_utf8(bytes).unwrap();

                match codec.verify_at(&tampered, NOW) {
                    Err(TokenError::Malformed) | Err(TokenError::InvalidSignature) => {}
                    other => panic!("position {i} -> {:?}: {other:?}", replacement as char),
                }
            }
        }
    }

    #[test]
    fn expiry_respects_clock_skew_tolerance() {
        let codec = codec("expiry-secret");

        let stale = codec.encode(subject(), NOW - 61_000);
        assert_eq!(codec.verify_at(&stale, NOW).unwrap_err(), TokenError::Expired);

        let within_skew = codec.encode(subject(), NOW - 30_000);
        assert_eq!(codec.verify_at(&within_skew, NOW).unwrap().subject(), subject());

        let at_boundary = codec.encode(subject(), NOW - 60_000);
        assert!(codec.verify_at(&at_boundary, NOW).is_ok());
    }

    #[test]
    fn wrong_key_is_rejected() {
        let token = codec("key-a").encode(subject(), NOW + 1_000);
        assert_eq!(
            codec("key-b").verify_at(&token, NOW).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn other_actions_are_rejected_even_when_signed() {
        let codec = codec("action-secret");
        let token = hand_built(&codec, SUBJECT, "delete", &(NOW + 1_000).to_string());
        assert_eq!(codec.verify_at(&token, NOW).unwrap_err(), TokenError::InvalidAction);
    }

    #[test]
    fn signature_is_checked_before_action_and_expiry() {
        let signer = codec("order-secret");
        let stale = (NOW - 3_600_000).to_string();
        let token = hand_built(&signer, SUBJECT, "delete", &stale);

        // Under another key the same token is forged; the MAC failure wins.
        assert_eq!(
            codec("other-secret").verify_at(&token, NOW).unwrap_err(),
            TokenError::InvalidSignature
        );
        // Correctly signed with both action and expiry wrong: action is reported.
        assert_eq!(signer.verify_at(&token, NOW).unwrap_err(), TokenError::InvalidAction);
    }

    #[test]
    fn rejects_bad_alphabet_and_oversize() {
        let codec = codec("format-secret");
        assert_eq!(codec.verify_at("", NOW).unwrap_err(), TokenError::Malformed);
        assert_eq!(codec.verify_at("abc+def/", NOW).unwrap_err(), TokenError::Malformed);
        assert_eq!(codec.verify_at("abc=", NOW).unwrap_err(), TokenError::Malformed);
        let oversized = "A".repeat(DEFAULT_MAX_TOKEN_LEN + 1);
        assert_eq!(codec.verify_at(&oversized, NOW).unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn rejects_wrong_field_count() {
        let codec = codec("fields-secret");
        let three = URL_SAFE_NO_PAD.encode(format!("{SUBJECT}:approve:{NOW}"));
        assert_eq!(codec.verify_at(&three, NOW).unwrap_err(), TokenError::Malformed);

        let five = URL_SAFE_NO_PAD.encode(format!("{SUBJECT}:approve:{NOW}:aa:bb"));
        assert_eq!(codec.verify_at(&five, NOW).unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn rejects_unparseable_or_noncanonical_timestamp() {
        let codec = codec("ts-secret");
        for expires in ["soon", "+1760000001000", "01760000001000", ""] {
            let token = hand_built(&codec, SUBJECT, "approve", expires);
            assert_eq!(
                codec.verify_at(&token, NOW).unwrap_err(),
                TokenError::Malformed,
                "{expires}"
            );
        }
    }

    #[test]
    fn rejects_noncanonical_subject() {
        let codec = codec("subject-secret");
        let expires = (NOW + 1_000).to_string();
        for subject in [
            "AAAAAAAA-1111-1111-1111-111111111111",
            "11111111111111111111111111111111",
            "not-a-uuid",
        ] {
            let token = hand_built(&codec, subject, "approve", &expires);
            assert_eq!(codec.verify_at(&token, NOW).unwrap_err(), TokenError::Malformed);
        }
    }

    #[test]
    fn mac_input_is_length_prefixed() {
        let codec = codec("boundary-secret");
        assert_ne!(codec.sign("ab", "c", "1"), codec.sign("a", "bc", "1"));
    }

    #[test]
    fn signing_key_debug_is_redacted() {
        let key = SigningKey::new("super-secret");
        assert!(!format!("{key:?}").contains("super-secret"));
    }
}
