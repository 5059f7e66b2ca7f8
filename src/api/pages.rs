//! HTML views
//!
//! Minimal server-rendered pages. All dynamic values are HTML-escaped.

use axum::response::Html;
use html_escape::encode_text;

use crate::auth::SessionClaims;

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{title} - Tokengate</title></head>
<body>
{body}
</body>
</html>
"#,
        title = encode_text(title),
    )
}

/// GET /
pub async fn landing() -> Html<String> {
    Html(layout(
        "Welcome",
        r#"<a href="/home">click here to go home</a>"#,
    ))
}

/// Login form posting the shared secret to `/login`
pub fn login_page(messages: &[&str]) -> String {
    let messages: String = messages
        .iter()
        .map(|message| format!("<p class=\"message\">{}</p>\n", encode_text(message)))
        .collect();

    layout(
        "Login",
        &format!(
            r#"<h1>Tokengate</h1>
{messages}<form method="post" action="/login">
    <label for="token">Secret token</label>
    <input type="password" id="token" name="token" autocomplete="off">
    <button type="submit">Sign in</button>
</form>"#
        ),
    )
}

/// Dashboard for an authenticated identity
pub fn dashboard_page(identity: &SessionClaims, message: Option<&str>) -> String {
    let message = message
        .map(|message| format!("<p class=\"message\">{}</p>\n", encode_text(message)))
        .unwrap_or_default();
    let role = if identity.is_admin { "admin" } else { "member" };

    layout(
        "Dashboard",
        &format!(
            r#"<h1>Dashboard</h1>
{message}<p>Signed in as <span class="description">{description}</span></p>
<p>Credential <span class="credential-id">{id}</span> ({role})</p>
<a href="/logout">Log out</a>"#,
            description = encode_text(&identity.description),
            id = identity.credential_id,
        ),
    )
}

/// Body of the 401 response
pub fn unauthorized_page(detail: &str) -> String {
    layout(
        "Unauthorized",
        &format!(
            r#"<h1>401 Unauthorized</h1>
<p>{}</p>
<a href="/login">Back to login</a>"#,
            encode_text(detail)
        ),
    )
}
