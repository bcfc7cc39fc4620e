//! Request cookie parsing and `Set-Cookie` rendering.

use http::HeaderMap;
use http::header::COOKIE;
use std::collections::HashMap;
use std::time::Duration;

/// Cookies sent with one request, by name. Later duplicates are ignored.
#[derive(Debug, Clone, Default)]
pub struct RequestCookies {
    values: HashMap<String, String>,
}

impl RequestCookies {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut values = HashMap::new();
        for header in headers.get_all(COOKIE) {
            let Ok(header) = header.to_str() else {
                continue;
            };
            for pair in header.split(';') {
                let Some((name, value)) = pair.split_once('=') else {
                    continue;
                };
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                values
                    .entry(name.to_string())
                    .or_insert_with(|| value.trim().trim_matches('"').to_string());
            }
        }
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestCookies {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAttributes {
    pub path: String,
    pub max_age: Option<Duration>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

impl Default for CookieAttributes {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            max_age: None,
            http_only: true,
            secure: true,
            same_site: SameSite::Lax,
        }
    }
}

/// A cookie change the session layer wants applied to the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieMutation {
    pub name: String,
    pub value: String,
    pub attributes: CookieAttributes,
}

impl CookieMutation {
    pub fn set(name: impl Into<String>, value: impl Into<String>, attributes: CookieAttributes) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            attributes,
        }
    }

    /// Expire `name` on the client.
    pub fn clear(name: impl Into<String>, mut attributes: CookieAttributes) -> Self {
        attributes.max_age = Some(Duration::ZERO);
        Self {
            name: name.into(),
            value: String::new(),
            attributes,
        }
    }

    pub fn is_clear(&self) -> bool {
        self.attributes.max_age == Some(Duration::ZERO)
    }

    pub fn to_header_value(&self) -> String {
        let attrs = &self.attributes;
        let mut out = format!("{}={}; Path={}", self.name, self.value, attrs.path);
        if let Some(max_age) = attrs.max_age {
            out.push_str(&format!("; Max-Age={}", max_age.as_secs()));
        }
        if attrs.http_only {
            out.push_str("; HttpOnly");
        }
        if attrs.secure {
            out.push_str("; Secure");
        }
        out.push_str("; SameSite=");
        out.push_str(attrs.same_site.as_str());
        out
    }
}
