//! axum adapter for [`FilterChain`].

use super::{FilterChain, FilterDecision};
use crate::session::CookieMutation;
use crate::telemetry::{RequestTimer, spans};
use axum::body::Body;
use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::header::{LOCATION, SET_COOKIE};
use http::{HeaderValue, StatusCode};
use std::sync::Arc;
use tracing::{Instrument, warn};

/// Run the filter chain, then the rest of the stack if it allows.
///
/// On pass-through the resolved principal (if any) is inserted into the
/// request extensions as `Option<Principal>`. Session cookie mutations are
/// appended to every response produced after session resolution.
pub async fn filter_requests(
    State(chain): State<Arc<FilterChain>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |m| m.as_str().to_string());
    let span = spans::request(request.method().as_str(), &path);

    let mut timer = RequestTimer::new(route);
    let response = run_chain(&chain, &path, request, next).instrument(span).await;
    timer.set_status(response.status().as_u16());
    response
}

async fn run_chain(chain: &FilterChain, path: &str, mut request: Request, next: Next) -> Response {
    let decision = match chain.evaluate(path, request.headers()).await {
        Ok(decision) => decision,
        Err(e) => {
            warn!(path = %path, code = e.error_code(), "filter chain aborted");
            return (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response();
        }
    };

    match decision {
        FilterDecision::NotFound => StatusCode::NOT_FOUND.into_response(),
        FilterDecision::TooManyRequests => {
            (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response()
        }
        FilterDecision::Redirect { location, cookies } => {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::TEMPORARY_REDIRECT;
            match HeaderValue::from_str(&location) {
                Ok(value) => {
                    response.headers_mut().insert(LOCATION, value);
                }
                Err(e) => {
                    warn!(error = %e, "login redirect location is not a valid header");
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            }
            with_cookies(response, &cookies)
        }
        FilterDecision::Forbidden { cookies } => {
            with_cookies((StatusCode::FORBIDDEN, "Forbidden").into_response(), &cookies)
        }
        FilterDecision::Continue { principal, cookies } => {
            request.extensions_mut().insert(principal);
            with_cookies(next.run(request).await, &cookies)
        }
    }
}

fn with_cookies(mut response: Response, cookies: &[CookieMutation]) -> Response {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie.to_header_value()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!(cookie = %cookie.name, error = %e, "dropping unencodable cookie"),
        }
    }
    response
}
