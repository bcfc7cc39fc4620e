//! Prometheus metrics collection for steelgate.
//!
//! Exposed on a separate HTTP port at `/metrics` when `server.metrics_port`
//! is set.
//!
//! ## Filter chain
//!
//! - `steelgate_paths_blocked_total` - scanner paths answered with 404
//! - `steelgate_rate_limited_total` - requests rejected with 429
//! - `steelgate_login_redirects_total` - protected paths without a session
//! - `steelgate_access_denied_total` - principals lacking authorization
//! - `steelgate_session_failures_total` - session provider errors
//! - `steelgate_rate_limit_entries` - live rate-limit counters (gauge)
//!
//! ## Approvals
//!
//! - `steelgate_approvals_total{outcome}` - approval endpoint outcomes
//! - `steelgate_token_failures_total{reason}` - rejected approval tokens
//! - `steelgate_signups_total` - pending accounts created

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters
// ========================================================================

pub static PATHS_BLOCKED: OnceLock<IntCounter> = OnceLock::new();

pub static RATE_LIMITED: OnceLock<IntCounter> = OnceLock::new();

pub static LOGIN_REDIRECTS: OnceLock<IntCounter> = OnceLock::new();

pub static ACCESS_DENIED: OnceLock<IntCounter> = OnceLock::new();

pub static SESSION_FAILURES: OnceLock<IntCounter> = OnceLock::new();

pub static SIGNUPS: OnceLock<IntCounter> = OnceLock::new();

/// Login attempts by outcome (success, rejected).
pub static LOGINS: OnceLock<IntCounterVec> = OnceLock::new();

/// Approval links handed to the notifier, by delivery result.
pub static NOTIFICATIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Approval endpoint outcomes (approved, already_approved, expired, ...).
pub static APPROVALS: OnceLock<IntCounterVec> = OnceLock::new();

/// Token verification failures by [`TokenError::error_code`].
///
/// [`TokenError::error_code`]: crate::error::TokenError::error_code
pub static TOKEN_FAILURES: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Gauges and histograms
// ========================================================================

pub static RATE_LIMIT_ENTRIES: OnceLock<IntGauge> = OnceLock::new();

/// Handler latency by route and status class.
pub static REQUEST_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Call once at startup. Recording before `init` is a no-op.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(PATHS_BLOCKED, IntCounter::new("steelgate_paths_blocked_total", "Scanner paths answered with 404"));
    register!(RATE_LIMITED, IntCounter::new("steelgate_rate_limited_total", "Requests rejected by the rate limiter"));
    register!(LOGIN_REDIRECTS, IntCounter::new("steelgate_login_redirects_total", "Protected requests redirected to login"));
    register!(ACCESS_DENIED, IntCounter::new("steelgate_access_denied_total", "Protected requests denied for insufficient authorization"));
    register!(SESSION_FAILURES, IntCounter::new("steelgate_session_failures_total", "Session provider failures"));
    register!(SIGNUPS, IntCounter::new("steelgate_signups_total", "Pending accounts created"));
    register!(LOGINS, IntCounterVec::new(Opts::new("steelgate_logins_total", "Login attempts by outcome"), &["outcome"]));
    register!(NOTIFICATIONS, IntCounterVec::new(Opts::new("steelgate_notifications_total", "Approval notifications by result"), &["result"]));
    register!(APPROVALS, IntCounterVec::new(Opts::new("steelgate_approvals_total", "Approval endpoint outcomes"), &["outcome"]));
    register!(TOKEN_FAILURES, IntCounterVec::new(Opts::new("steelgate_token_failures_total", "Rejected approval tokens by reason"), &["reason"]));
    register!(RATE_LIMIT_ENTRIES, IntGauge::new("steelgate_rate_limit_entries", "Live rate limit counters"));
    register!(REQUEST_LATENCY, HistogramVec::new(
        HistogramOpts::new("steelgate_request_duration_seconds", "Request latency by route and status class")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["route", "status"]));
}

/// Gather all metrics in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

#[inline]
fn inc(metric: &OnceLock<IntCounter>) {
    if let Some(c) = metric.get() {
        c.inc();
    }
}

#[inline]
fn inc_label(metric: &OnceLock<IntCounterVec>, label: &str) {
    if let Some(c) = metric.get() {
        c.with_label_values(&[label]).inc();
    }
}

#[inline]
pub fn record_path_blocked() {
    inc(&PATHS_BLOCKED);
}

#[inline]
pub fn record_rate_limited() {
    inc(&RATE_LIMITED);
}

#[inline]
pub fn record_login_redirect() {
    inc(&LOGIN_REDIRECTS);
}

#[inline]
pub fn record_access_denied() {
    inc(&ACCESS_DENIED);
}

#[inline]
pub fn record_session_failure() {
    inc(&SESSION_FAILURES);
}

#[inline]
pub fn record_signup() {
    inc(&SIGNUPS);
}

#[inline]
pub fn record_login(outcome: &str) {
    inc_label(&LOGINS, outcome);
}

#[inline]
pub fn record_notification(result: &str) {
    inc_label(&NOTIFICATIONS, result);
}

#[inline]
pub fn record_approval(outcome: &str) {
    inc_label(&APPROVALS, outcome);
}

#[inline]
pub fn record_token_failure(reason: &str) {
    inc_label(&TOKEN_FAILURES, reason);
}

#[inline]
pub fn set_rate_limit_entries(count: usize) {
    if let Some(g) = RATE_LIMIT_ENTRIES.get() {
        g.set(i64::try_from(count).unwrap_or(i64::MAX));
    }
}

/// Record one handled request.
#[inline]
pub fn record_request(route: &str, status: u16, duration_secs: f64) {
    if let Some(h) = REQUEST_LATENCY.get() {
        let class = match status {
            100..=199 => "1xx",
            200..=299 => "2xx",
            300..=399 => "3xx",
            400..=499 => "4xx",
            _ => "5xx",
        };
        h.with_label_values(&[route, class]).observe(duration_secs);
    }
}
