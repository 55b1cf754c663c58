use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::application::auth::{AuthPrincipal, TokenError};

use super::error::ApiError;
use super::state::ApiState;

/// Resolved caller identity; `None` for anonymous requests.
#[derive(Clone)]
pub struct MaybePrincipal(pub Option<AuthPrincipal>);

/// Validates the bearer token when one is supplied. Anonymous requests pass
/// through; protected handlers reject them individually.
pub async fn attach_principal(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = extract_token(request.headers().get(axum::http::header::AUTHORIZATION));

    let principal = match token {
        Some(token) => match state.auth.authenticate(&token) {
            Ok(principal) => Some(principal),
            Err(TokenError::Expired) => {
                return ApiError::new(
                    StatusCode::UNAUTHORIZED,
                    "expired",
                    "Session expired, please log in again",
                    None,
                )
                .into_response();
            }
            Err(_) => return ApiError::unauthorized().into_response(),
        },
        None => None,
    };

    if let Some(principal) = principal.clone() {
        request.extensions_mut().insert(principal);
    }
    request.extensions_mut().insert(MaybePrincipal(principal));

    next.run(request).await
}

pub async fn api_rate_limit(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let key = client_key(&request);

    let (allowed, _remaining) = state.rate_limiter.allow(&key, &path);
    if !allowed {
        return ApiError::rate_limited(state.rate_limiter.retry_after_secs());
    }

    next.run(request).await
}

/// Rate-limit key: client IP from the proxy header, else the peer address,
/// else the authenticated user id.
fn client_key(request: &Request<Body>) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    request
        .extensions()
        .get::<AuthPrincipal>()
        .map(|principal| principal.user_id.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn extract_token(header: Option<&axum::http::HeaderValue>) -> Option<String> {
    let raw = header?.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?;
    Some(bearer.to_string())
}
