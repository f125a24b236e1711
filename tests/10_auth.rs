mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["database"], "ok");
    Ok(())
}

#[tokio::test]
async fn signup_returns_created_user() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.signup("Grace@Example.com", "grace").await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body = res.json::<Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["email"], "grace@example.com");
    assert!(body["user"]["id"].is_string());
    assert_eq!(server.notifier.count(), 1);
    Ok(())
}

#[tokio::test]
async fn signup_missing_fields_is_rejected() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server
        .client
        .post(server.url("/auth"))
        .json(&json!({ "email": "a@example.com", "password": "pw" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = res.json::<Value>().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["handle"].is_string());
    Ok(())
}

#[tokio::test]
async fn duplicate_email_conflicts() -> Result<()> {
    let server = TestServer::spawn().await?;

    assert_eq!(server.signup("dup@example.com", "one").await?.status(), StatusCode::CREATED);
    let res = server.signup("DUP@example.com", "two").await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(server.notifier.count(), 1);
    Ok(())
}

#[tokio::test]
async fn login_requires_verified_email() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.signup("v@example.com", "v").await?;
    let credentials = json!({ "email": "v@example.com", "password": "hunter22" });

    let res = server.client.post(server.url("/auth/login")).json(&credentials).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let token = server.notifier.last_token_for("v@example.com").expect("verification email");
    let res = server
        .client
        .get(server.url("/auth/verify"))
        .query(&[("email", "v@example.com"), ("token", token.as_str())])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = server.client.post(server.url("/auth/login")).json(&credentials).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let header = res
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_default();
    let body = res.json::<Value>().await?;
    assert_eq!(header, format!("JWT {}", body["token"].as_str().unwrap()));
    Ok(())
}

#[tokio::test]
async fn login_failures_are_unauthorized() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.session("x@example.com", "x").await?;

    let wrong = json!({ "email": "x@example.com", "password": "nope" });
    let res = server.client.post(server.url("/auth/login")).json(&wrong).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let unknown = json!({ "email": "who@example.com", "password": "hunter22" });
    let res = server.client.post(server.url("/auth/login")).json(&unknown).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.json::<Value>().await?["message"], "User not found");
    Ok(())
}

#[tokio::test]
async fn verify_requires_parameters_and_known_user() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.signup("p@example.com", "p").await?;

    let res = server.client.get(server.url("/auth/verify?email=p@example.com")).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .client
        .get(server.url("/auth/verify"))
        .query(&[("email", "p@example.com"), ("token", "wrong")])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .client
        .get(server.url("/auth/verify"))
        .query(&[("email", "ghost@example.com"), ("token", "x")])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn resend_issues_a_new_token() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.signup("r@example.com", "r").await?;
    let first = server.notifier.last_token_for("r@example.com").unwrap();

    let res = server
        .client
        .post(server.url("/auth/verify/resend"))
        .json(&json!({ "email": "r@example.com" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["sent"], true);
    assert_ne!(server.notifier.last_token_for("r@example.com").unwrap(), first);
    Ok(())
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() -> Result<()> {
    let server = TestServer::spawn().await?;
    let session = server.session("me@example.com", "me").await?;

    let res = server.client.get(server.url("/users/me")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .get(server.url("/users/me"))
        .header("Authorization", "JWT not.a.token")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .get(server.url("/users/me"))
        .header("Authorization", format!("Bearer {}", session.token))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["user"]["id"], session.user_id.as_str());
    assert_eq!(body["user"]["handle"], "me");
    Ok(())
}

#[tokio::test]
async fn profile_and_handle_lookup() -> Result<()> {
    let server = TestServer::spawn().await?;
    let session = server.session("grace@example.com", "GraceHopper").await?;

    let res = server
        .client
        .patch(server.url("/profile"))
        .header("Authorization", session.header())
        .json(&json!({ "displayName": "Amazing Grace" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.client.get(server.url("/profile")).header("Authorization", session.header()).send().await?;
    let body = res.json::<Value>().await?;
    assert_eq!(body["profile"]["emailInfo"]["isVerified"], true);
    assert_eq!(body["profile"]["emailInfo"]["email"], "grace@example.com");

    let res = server.client.get(server.url(&format!("/profile/{}", session.profile_id))).send().await?;
    let body = res.json::<Value>().await?;
    assert_eq!(body["profile"]["displayName"], "Amazing Grace");
    assert!(body["profile"].get("emailInfo").is_none());
    assert!(body["profile"].get("items").is_none());

    let res = server
        .client
        .get(server.url("/users/handle?userHandle=hopper"))
        .header("Authorization", session.header())
        .send()
        .await?;
    let body = res.json::<Value>().await?;
    assert_eq!(body["users"].as_array().map(Vec::len), Some(1));

    let res = server.client.get(server.url("/profile/not-a-uuid")).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn bulk_clear_is_refused_in_production() -> Result<()> {
    let mut config = organizer_api::config::AppConfig::production();
    config.security.jwt_secret = "integration-secret".to_string();
    let server = TestServer::spawn_with(config).await?;

    let res = server.client.delete(server.url("/users")).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server.client.delete(server.url("/tags")).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}
