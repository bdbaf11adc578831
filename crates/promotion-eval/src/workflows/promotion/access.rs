use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    Reader,
    Admin,
}

/// Authenticated caller inserted into request extensions by [`require_token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub role: CallerRole,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == CallerRole::Admin
    }
}

/// Bearer tokens accepted by the API. A policy without tokens is open: every request is
/// treated as an admin caller, which is only allowed outside production.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    tokens: HashMap<String, CallerRole>,
}

impl AccessPolicy {
    pub fn grant(&mut self, token: impl Into<String>, role: CallerRole) {
        self.tokens.insert(token.into(), role);
    }

    pub fn role_for(&self, token: &str) -> Option<CallerRole> {
        self.tokens.get(token).copied()
    }

    pub fn is_open(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn authorize(&self, header: Option<&HeaderValue>) -> Result<Caller, AccessDenied> {
        if self.is_open() {
            return Ok(Caller {
                role: CallerRole::Admin,
            });
        }

        let header = header.ok_or(AccessDenied::MissingToken)?;
        let value = header.to_str().map_err(|_| AccessDenied::MalformedHeader)?;
        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AccessDenied::MalformedHeader)?;

        self.role_for(token)
            .map(|role| Caller { role })
            .ok_or(AccessDenied::UnknownToken)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("authorization token is missing")]
    MissingToken,
    #[error("authorization header must use the Bearer scheme")]
    MalformedHeader,
    #[error("authorization token is invalid")]
    UnknownToken,
}

impl IntoResponse for AccessDenied {
    fn into_response(self) -> Response {
        let payload = json!({
            "status": "error",
            "message": self.to_string(),
        });
        (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
    }
}

/// Middleware guarding the promotion API. Health and metrics routes are mounted outside it.
pub async fn require_token(
    State(policy): State<Arc<AccessPolicy>>,
    mut request: Request,
    next: Next,
) -> Response {
    match policy.authorize(request.headers().get(header::AUTHORIZATION)) {
        Ok(caller) => {
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(denied) => {
            debug!(reason = %denied, path = %request.uri().path(), "rejecting request");
            denied.into_response()
        }
    }
}
