use crate::config::Auth;
use crate::errors::AppError;
use axum::http::HeaderMap;
use http::{header, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Upgrade authorization policy, fixed at startup from config. Secured and
/// open deployments differ only in configuration, not code paths.
#[derive(Debug)]
pub enum Authorizer {
    Open,
    Bearer(String),
}

impl Authorizer {
    pub fn from_config(auth: &Auth) -> Self {
        match &auth.bearer_token {
            Some(token) if !token.trim().is_empty() => Self::Bearer(token.clone()),
            _ => Self::Open,
        }
    }

    pub fn check(&self, headers: &HeaderMap) -> Result<(), AppError> {
        match self {
            Self::Open => Ok(()),
            Self::Bearer(expected) => require_bearer(headers, expected),
        }
    }
}

pub fn require_bearer(headers: &HeaderMap, expected: &str) -> Result<(), AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;
    if token != expected {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

/// `*.suffix` entries match any origin ending in the suffix; everything else
/// is an exact match.
pub fn origin_allowed(origin: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|entry| {
        if let Some(suffix) = entry.strip_prefix('*') {
            origin.ends_with(suffix)
        } else {
            origin == entry
        }
    })
}

pub fn cors_layer(allowed: &[String]) -> CorsLayer {
    let allowed = allowed.to_vec();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            origin
                .to_str()
                .map(|o| origin_allowed(o, &allowed))
                .unwrap_or(false)
        }))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
