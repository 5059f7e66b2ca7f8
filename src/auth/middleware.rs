//! Session middleware
//!
//! Resolves the caller's identity from the `token` cookie (or the `token`
//! query parameter) on every request. The check is stateless: nothing is
//! looked up server-side, and a rejected token looks exactly like no token.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Query, Request, State},
    http::{HeaderMap, Uri, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::session::{SessionClaims, SessionCodec, SessionError};
use crate::AppState;
use crate::error::AppError;
use crate::metrics::SESSION_DECODE_FAILURES_TOTAL;

/// Name of the session cookie and of the query-parameter fallback
pub const SESSION_COOKIE: &str = "token";

/// Outcome of inspecting one request for a session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No cookie or query parameter at all
    NoToken,
    /// A carrier was present but held an empty string
    TokenPresentEmpty,
    /// A token was present but failed to decode
    TokenInvalid(SessionError),
    /// A token decoded to these claims
    TokenValid(SessionClaims),
}

impl SessionState {
    /// The resolved identity, if any. Every non-valid state yields `None`.
    pub fn into_identity(self) -> Option<SessionClaims> {
        match self {
            SessionState::TokenValid(claims) => Some(claims),
            SessionState::NoToken
            | SessionState::TokenPresentEmpty
            | SessionState::TokenInvalid(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Pull the raw session token from the request.
///
/// The cookie wins when it is non-empty; otherwise the query parameter is
/// consulted. `Some("")` means a carrier existed but was empty.
pub fn extract_session_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let cookie = CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_owned());

    if let Some(token) = cookie.as_deref().filter(|token| !token.is_empty()) {
        return Some(token.to_owned());
    }

    let query = Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(query)| query.token);

    match query {
        Some(token) if !token.is_empty() => Some(token),
        _ => cookie.or(query),
    }
}

/// Run the session state machine for one (possibly absent) token.
pub fn resolve_session(codec: &SessionCodec, token: Option<&str>) -> SessionState {
    let state = match token {
        None => SessionState::NoToken,
        Some("") => SessionState::TokenPresentEmpty,
        Some(token) => match codec.decode(token) {
            Ok(claims) => SessionState::TokenValid(claims),
            Err(error) => {
                SESSION_DECODE_FAILURES_TOTAL
                    .with_label_values(&[error.reason()])
                    .inc();
                tracing::info!(reason = error.reason(), %error, "Rejected session token");
                SessionState::TokenInvalid(error)
            }
        },
    };

    match &state {
        SessionState::TokenValid(claims) => tracing::debug!(
            credential_id = claims.credential_id,
            is_admin = claims.is_admin,
            "Session resolved"
        ),
        other => tracing::debug!(state = ?other, "No session identity"),
    }

    state
}

fn identity_from_parts(parts: &Parts, codec: &SessionCodec) -> Option<SessionClaims> {
    let token = extract_session_token(&parts.headers, &parts.uri);
    resolve_session(codec, token.as_deref()).into_identity()
}

/// Middleware restricting a route to admin sessions
///
/// 401 without a valid session, 403 for a non-admin one. The claims are
/// added to request extensions for the handler.
///
/// # Usage
/// ```ignore
/// let routes = Router::new()
///     .route("/metrics", ...)
///     .route_layer(middleware::from_fn_with_state(state, require_admin));
/// ```
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_session_token(request.headers(), request.uri());
    let claims = resolve_session(&state.sessions, token.as_deref())
        .into_identity()
        .ok_or(AppError::Unauthorized)?;

    if !claims.is_admin {
        tracing::info!(
            credential_id = claims.credential_id,
            "Non-admin session refused"
        );
        return Err(AppError::Forbidden);
    }

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Optional identity extractor
///
/// Returns None if not authenticated, instead of error.
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<SessionClaims>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeIdentity
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<SessionClaims>().cloned() {
            return Ok(MaybeIdentity(Some(claims)));
        }

        let app_state = AppState::from_ref(state);
        let identity = identity_from_parts(parts, &app_state.sessions);

        if let Some(claims) = &identity {
            parts.extensions.insert(claims.clone());
        }

        Ok(MaybeIdentity(identity))
    }
}
