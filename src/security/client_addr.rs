//! Client identification for rate limiting.

use http::HeaderMap;

/// Key used when no forwarding header is present.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derive the rate-limit key for a request.
///
/// Takes the first entry of `x-forwarded-for`, then `x-real-ip`, then falls
/// back to [`UNKNOWN_CLIENT`]. Both headers are client-controlled unless a
/// trusted proxy overwrites them, so this key is only as good as the
/// deployment in front of the service.
pub fn client_key(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_first_forwarded_entry_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.4, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_key(&headers), "198.51.100.4");
    }

    #[test]
    fn test_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static(" 192.0.2.1 "));
        assert_eq!(client_key(&headers), "192.0.2.1");
    }

    #[test]
    fn test_empty_forwarded_falls_through() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(""));
        headers.insert("x-real-ip", HeaderValue::from_static("192.0.2.1"));
        assert_eq!(client_key(&headers), "192.0.2.1");
    }

    #[test]
    fn test_unknown_when_absent() {
        assert_eq!(client_key(&HeaderMap::new()), UNKNOWN_CLIENT);
    }
}
