//! Tracing setup and request timing.

use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "STEELGATE_LOG_FORMAT";

/// Install the global tracing subscriber.
///
/// Filter comes from `RUST_LOG` (default `info`). Output is plain text unless
/// `STEELGATE_LOG_FORMAT=json`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Guard timing one request. Records latency when dropped.
pub struct RequestTimer {
    route: String,
    status: u16,
    start: Instant,
}

impl RequestTimer {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            status: 500,
            start: Instant::now(),
        }
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_request(&self.route, self.status, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span for one HTTP request passing the filter chain.
    pub fn request(method: &str, path: &str) -> Span {
        info_span!("request", method = %method, path = %path)
    }

    /// Span for the store work behind one verified approval link.
    pub fn approval(subject: &str) -> Span {
        info_span!("approval", subject = %subject)
    }
}
