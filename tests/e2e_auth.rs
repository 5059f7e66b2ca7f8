//! E2E tests for login, logout and the protected dashboard

mod common;

use common::{
    SHARED_SECRET, SHARED_SECRET_DESCRIPTION, TestServer, session_cookie_value, set_cookie_headers,
    test_config,
};

#[tokio::test]
async fn test_login_with_bootstrap_secret_sets_session_cookie() {
    let server = TestServer::new().await;

    let response = server.login(SHARED_SECRET).await;

    assert_eq!(response.status(), 200);
    let cookies = set_cookie_headers(&response);
    let session_cookie = cookies
        .iter()
        .find(|c| c.starts_with("token="))
        .expect("token cookie set");
    assert!(session_cookie.contains("HttpOnly"));
    assert!(session_cookie.contains("Path=/"));
    assert!(!session_cookie_value(&response).unwrap().is_empty());

    let body = response.text().await.unwrap();
    assert!(body.contains(SHARED_SECRET_DESCRIPTION));
}

#[tokio::test]
async fn test_session_cookie_max_age_matches_configured_lifetime() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let mut config = test_config(&temp_dir);
    config.auth.session_max_age = Some(600);
    let server = TestServer::with_config(config, temp_dir).await;

    let response = server.login(SHARED_SECRET).await;

    assert_eq!(response.status(), 200);
    let cookies = set_cookie_headers(&response);
    let session_cookie = cookies
        .iter()
        .find(|c| c.starts_with("token="))
        .expect("token cookie set");
    assert!(session_cookie.contains("Max-Age=600"));

    let token = session_cookie_value(&response).unwrap();
    let claims = server.state.sessions.decode(&token).unwrap();
    let (iat, exp) = (claims.iat.unwrap(), claims.exp.unwrap());
    assert_eq!(exp - iat, 600);
}

#[tokio::test]
async fn test_session_cookie_without_lifetime_has_no_max_age() {
    let server = TestServer::new().await;

    let response = server.login(SHARED_SECRET).await;

    let cookies = set_cookie_headers(&response);
    let session_cookie = cookies
        .iter()
        .find(|c| c.starts_with("token="))
        .expect("token cookie set");
    assert!(!session_cookie.contains("Max-Age"));
}

#[tokio::test]
async fn test_login_with_wrong_secret_is_unauthorized() {
    let server = TestServer::new().await;

    let response = server.login(&format!("{SHARED_SECRET}x")).await;

    assert_eq!(response.status(), 401);
    assert_eq!(
        response
            .headers()
            .get("www-authenticate")
            .and_then(|v| v.to_str().ok()),
        Some("Basic")
    );
    assert!(session_cookie_value(&response).is_none());
    let body = response.text().await.unwrap();
    assert!(body.contains("401 Unauthorized"));
}

#[tokio::test]
async fn test_session_cookie_resolves_bootstrap_identity() {
    let server = TestServer::new().await;
    let token = server.login_token().await;

    let response = server.get_with_cookie("/home", &token).await;

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("Dashboard"));
    assert!(body.contains(SHARED_SECRET_DESCRIPTION));
    assert!(body.contains(r#"<span class="credential-id">1</span>"#));
    assert!(body.contains("(admin)"));
}

#[tokio::test]
async fn test_home_without_session_renders_login_form() {
    let server = TestServer::new().await;

    let response = server.client.get(server.url("/home")).send().await.unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains(r#"action="/login""#));
    assert!(!body.contains("Dashboard"));
}

#[tokio::test]
async fn test_empty_cookie_matches_no_cookie() {
    let server = TestServer::new().await;

    let without = server
        .client
        .get(server.url("/home"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let empty = server
        .get_with_cookie("/home", "")
        .await
        .text()
        .await
        .unwrap();

    assert_eq!(without, empty);
}

#[tokio::test]
async fn test_tampered_session_renders_login_form() {
    let server = TestServer::new().await;
    let token = server.login_token().await;
    let (payload, _signature) = token.rsplit_once('.').unwrap();
    let forged = format!("{payload}.AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");

    let response = server.get_with_cookie("/home", &forged).await;

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains(r#"action="/login""#));
}

#[tokio::test]
async fn test_query_parameter_carries_session() {
    let server = TestServer::new().await;
    let token = server.login_token().await;

    let response = server
        .client
        .get(server.url(&format!("/home?token={token}")))
        .send()
        .await
        .unwrap();

    let body = response.text().await.unwrap();
    assert!(body.contains(SHARED_SECRET_DESCRIPTION));
}

#[tokio::test]
async fn test_logout_clears_cookie_and_session() {
    let server = TestServer::new().await;
    let token = server.login_token().await;

    let response = server.get_with_cookie("/logout", &token).await;

    assert_eq!(response.status(), 200);
    let cleared = session_cookie_value(&response).expect("logout sets a token cookie");
    assert_eq!(cleared, "");
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "logged out");

    let response = server.get_with_cookie("/home", &cleared).await;
    let body = response.text().await.unwrap();
    assert!(body.contains(r#"action="/login""#));
    assert!(!body.contains(SHARED_SECRET_DESCRIPTION));
}

#[tokio::test]
async fn test_logout_without_session_still_clears_cookie() {
    let server = TestServer::new().await;

    let response = server.client.get(server.url("/logout")).send().await.unwrap();

    assert_eq!(response.status(), 200);
    assert!(
        set_cookie_headers(&response)
            .iter()
            .any(|c| c.starts_with("token=;")),
        "expected cookie removal header"
    );
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "logged out");
}

#[tokio::test]
async fn test_token_survives_logout_until_expiry() {
    let server = TestServer::new().await;
    let token = server.login_token().await;

    server.get_with_cookie("/logout", &token).await;
    let response = server.get_with_cookie("/home", &token).await;

    // No server-side revocation: the signed token itself is still valid.
    let body = response.text().await.unwrap();
    assert!(body.contains(SHARED_SECRET_DESCRIPTION));
}

#[tokio::test]
async fn test_login_page_prompts_without_session() {
    let server = TestServer::new().await;

    let response = server.client.get(server.url("/login")).send().await.unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("please authenticate"));
}

#[tokio::test]
async fn test_login_page_follows_local_next_only() {
    let server = TestServer::new().await;
    let token = server.login_token().await;

    let response = server.get_with_cookie("/login?next=/home", &token).await;
    assert!(response.status().is_redirection());
    assert_eq!(
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok()),
        Some("/home")
    );

    let response = server
        .get_with_cookie("/login?next=//evil.example.com", &token)
        .await;
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("Dashboard"));
}

#[tokio::test]
async fn test_flash_message_is_shown_once() {
    let server = TestServer::new().await;
    let token = server.login_token().await;

    let response = server
        .client
        .get(server.url("/home"))
        .header("Cookie", format!("token={token}; msg=saved"))
        .send()
        .await
        .unwrap();

    assert!(
        set_cookie_headers(&response)
            .iter()
            .any(|c| c.starts_with("msg=;")),
        "expected flash cookie removal"
    );
    let body = response.text().await.unwrap();
    assert!(body.contains("saved"));
}

#[tokio::test]
async fn test_operator_credential_logs_in_as_member() {
    let server = TestServer::new().await;
    server
        .state
        .db
        .insert_credential("operator-secret", "Read-only operator", false, common::TEST_HASH_ROUNDS)
        .await
        .unwrap();

    let response = server.login("operator-secret").await;
    assert_eq!(response.status(), 200);
    let token = session_cookie_value(&response).unwrap();

    let body = server
        .get_with_cookie("/home", &token)
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Read-only operator"));
    assert!(body.contains("(member)"));
}
