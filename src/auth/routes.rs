//! Login, logout and the protected dashboard page

use axum::{
    Form, Json, Router,
    extract::{Query, State},
    http::header::SET_COOKIE,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use serde::Deserialize;

use super::middleware::{MaybeIdentity, SESSION_COOKIE};
use crate::AppState;
use crate::api::pages;
use crate::error::AppError;
use crate::metrics::LOGIN_ATTEMPTS_TOTAL;

/// One-shot flash message cookie shown (and cleared) by the dashboard
const FLASH_COOKIE: &str = "msg";

/// Create authentication router
///
/// Routes:
/// - GET /home - Dashboard (login form when unauthenticated)
/// - GET /login - Login form, or dashboard / `next` redirect when logged in
/// - POST /login - Verify shared secret and set session cookie
/// - GET /logout - Clear session cookie
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/home", get(home))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
}

// =============================================================================
// Dashboard
// =============================================================================

/// GET /home
///
/// Renders the dashboard for a valid session and the login form otherwise.
/// Never redirects.
async fn home(MaybeIdentity(identity): MaybeIdentity, jar: CookieJar) -> Response {
    let Some(identity) = identity else {
        tracing::debug!("GET /home without session; rendering login form");
        return Html(pages::login_page(&[])).into_response();
    };

    let message = jar.get(FLASH_COOKIE).map(|cookie| cookie.value().to_owned());
    let jar = if message.is_some() {
        jar.remove(Cookie::build(FLASH_COOKIE).path("/"))
    } else {
        jar
    };

    (jar, Html(pages::dashboard_page(&identity, message.as_deref()))).into_response()
}

// =============================================================================
// Login
// =============================================================================

#[derive(Debug, Deserialize)]
struct LoginQuery {
    #[serde(default)]
    next: String,
}

/// GET /login
async fn login_page(
    MaybeIdentity(identity): MaybeIdentity,
    Query(query): Query<LoginQuery>,
) -> Response {
    match identity {
        Some(identity) => match safe_next(&query.next) {
            Some(next) => Redirect::to(next).into_response(),
            None => Html(pages::dashboard_page(&identity, None)).into_response(),
        },
        None => Html(pages::login_page(&["please authenticate"])).into_response(),
    }
}

/// Only same-site absolute paths are followed after login.
fn safe_next(next: &str) -> Option<&str> {
    let is_local_path =
        next.starts_with('/') && !next.starts_with("//") && !next.starts_with("/\\");
    is_local_path.then_some(next)
}

#[derive(Deserialize)]
struct LoginForm {
    /// Plaintext shared secret
    token: String,
}

/// POST /login
///
/// # Steps
/// 1. Match the submitted secret against stored credentials
/// 2. Issue a session token for the matched credential
/// 3. Set it as the `token` cookie and render the dashboard
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, AppError> {
    let Some(credential) = state.verifier.verify(&state.db, &form.token).await? else {
        LOGIN_ATTEMPTS_TOTAL.with_label_values(&["rejected"]).inc();
        tracing::info!("Login rejected: no credential matched");
        return Err(AppError::Unauthorized);
    };

    let claims = state.sessions.claims_for(&credential);
    let token = state
        .sessions
        .issue(&claims)
        .map_err(|e| AppError::Encryption(e.to_string()))?;

    LOGIN_ATTEMPTS_TOTAL.with_label_values(&["accepted"]).inc();
    tracing::info!(
        credential_id = credential.id,
        is_admin = credential.is_admin,
        "Login accepted"
    );

    let cookie = session_cookie(
        token,
        state.config.server.secure_cookies,
        state.sessions.max_age(),
    );

    Ok((jar.add(cookie), Html(pages::dashboard_page(&claims, None))))
}

/// Session cookie; `Max-Age` mirrors the configured session lifetime, if any.
fn session_cookie(token: String, secure: bool, max_age: Option<i64>) -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure);
    if let Some(secs) = max_age {
        cookie = cookie.max_age(time::Duration::seconds(secs));
    }
    cookie.build()
}

// =============================================================================
// Logout
// =============================================================================

/// GET /logout
///
/// Clears the session cookie. Always reports success, whether or not a
/// session existed. Previously issued tokens are not revoked.
async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        clear_session_cookie(jar),
        Json(serde_json::json!({ "status": "logged out" })),
    )
}

/// Queue removal of the session cookie, checking the outgoing headers after
/// each attempt.
///
/// A plain removal emits nothing when the request carried no `token` cookie,
/// so the fallbacks are an explicit empty expired cookie and then a second
/// removal.
fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    if session_cookie_cleared(&jar) {
        tracing::debug!("Session cookie deletion confirmed");
        return jar;
    }
    tracing::debug!("Session cookie deletion not confirmed; setting empty cookie");

    let mut empty = Cookie::new(SESSION_COOKIE, "");
    empty.set_path("/");
    empty.make_removal();
    let jar = jar.add(empty);
    if session_cookie_cleared(&jar) {
        tracing::debug!("Session cookie deletion confirmed");
        return jar;
    }
    tracing::debug!("Session cookie deletion still not confirmed; deleting again");

    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

fn session_cookie_cleared(jar: &CookieJar) -> bool {
    let cleared_prefix = format!("{SESSION_COOKIE}=;");
    let response = jar.clone().into_response();
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(&cleared_prefix))
}
