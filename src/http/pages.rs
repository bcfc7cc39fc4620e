//! Result pages for the approval endpoint.

use axum::response::{IntoResponse, Response};
use http::header::{CONTENT_SECURITY_POLICY, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS};
use http::{HeaderValue, StatusCode};

const PAGE_CSP: &str = "default-src 'self'; style-src 'unsafe-inline'";

/// Which page to show after an approval attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalPage {
    Approved { label: String },
    AlreadyApproved { label: String },
    MissingToken,
    Invalid,
    Expired,
    NotFound,
    ServerError,
}

impl ApprovalPage {
    fn title(&self) -> &'static str {
        match self {
            Self::Approved { .. } => "Account approved",
            Self::AlreadyApproved { .. } => "Already approved",
            Self::MissingToken => "Invalid request",
            Self::Invalid => "Invalid link",
            Self::Expired => "Link expired",
            Self::NotFound => "Account not found",
            Self::ServerError => "Server error",
        }
    }

    /// Message body as HTML. Only the account label is dynamic, and it is escaped.
    fn message_html(&self) -> String {
        match self {
            Self::Approved { label } => format!(
                "<strong>{}</strong> has been approved and can now sign in.",
                escape_html(label)
            ),
            Self::AlreadyApproved { label } => {
                format!("<strong>{}</strong> was already approved.", escape_html(label))
            }
            Self::MissingToken => "No approval token was provided.".to_string(),
            Self::Invalid => "This approval link is not valid.".to_string(),
            Self::Expired => {
                "This approval link has expired. Approve the account from the admin console instead."
                    .to_string()
            }
            Self::NotFound => "The account for this link no longer exists.".to_string(),
            Self::ServerError => {
                "The approval could not be completed. Please try again later.".to_string()
            }
        }
    }

    pub fn render(&self, admin_console_url: &str) -> String {
        let title = escape_html(self.title());
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} - steelgate</title>
<style>
body {{ font-family: system-ui, sans-serif; background: #f4f5f7; margin: 0; padding: 48px 16px; }}
main {{ max-width: 480px; margin: 0 auto; background: #fff; border-radius: 8px; padding: 32px; }}
h1 {{ font-size: 1.4rem; margin-top: 0; }}
a.btn {{ display: inline-block; margin-top: 16px; padding: 10px 18px; background: #1f3a93; color: #fff; border-radius: 4px; text-decoration: none; }}
</style>
</head>
<body>
<main>
<h1>{title}</h1>
<p>{message}</p>
<a href="{console}" class="btn">Open admin console</a>
</main>
</body>
</html>
"#,
            message = self.message_html(),
            console = escape_html(admin_console_url),
        )
    }

    /// Status 200 HTML with the fixed security headers.
    pub fn respond(self, admin_console_url: &str) -> Response {
        let mut response = (StatusCode::OK, self.render(admin_console_url)).into_response();
        let headers = response.headers_mut();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        headers.insert(CONTENT_SECURITY_POLICY, HeaderValue::from_static(PAGE_CSP));
        response
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<script>alert("x")</script> & 'y'"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#039;y&#039;"
        );
    }

    #[test]
    fn label_is_escaped_in_page() {
        let page = ApprovalPage::Approved {
            label: "<img src=x onerror=alert(1)>".into(),
        };
        let html = page.render("/admin");
        assert!(!html.contains("<img"));
        assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;"));
    }

    #[test]
    fn response_carries_security_headers() {
        let response = ApprovalPage::Invalid.respond("/admin");
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[CONTENT_SECURITY_POLICY], PAGE_CSP);
        assert_eq!(headers[CONTENT_TYPE], "text/html; charset=utf-8");
    }

    #[test]
    fn failure_pages_do_not_leak_detail() {
        for page in [ApprovalPage::Invalid, ApprovalPage::ServerError, ApprovalPage::NotFound] {
            let html = page.render("/admin");
            assert!(!html.to_lowercase().contains("signature"));
            assert!(!html.contains("sqlx"));
        }
    }
}
