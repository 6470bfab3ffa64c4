// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the jwt-clients project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::sync::Arc;

use chrono::Duration;
use jwt_clients::jwt::clients;
use jwt_clients::web::{build_rocket, ApiKeyConfig, IssuedToken, ProblemDetail};
use jwt_clients::{TokenIssuer, TokenRequest, TokenVerifier};
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::Client;
use serde_json::Value;

const SECRET: &[u8] = b"web-guard-test-secret-long-enough!!";
const API_KEY: &str = "service-api-key";

async fn client() -> Client {
    let _ = env_logger::builder().is_test(true).try_init();

    let figment = rocket::Config::figment()
        .merge(("address", "127.0.0.1"))
        .merge(("port", 0))
        .merge(("log_level", rocket::config::LogLevel::Off));

    let issuer: Arc<dyn TokenIssuer> =
        Arc::new(clients::new_issuer_with_symmetric_key("hireben.dev", SECRET).unwrap());
    let verifier: Arc<dyn TokenVerifier> =
        Arc::new(clients::new_verifier_with_symmetric_key(SECRET).unwrap());

    let rocket = build_rocket(
        figment,
        issuer,
        verifier,
        ApiKeyConfig::new(API_KEY),
        Some(Duration::minutes(15)),
    );
    Client::tracked(rocket).await.expect("valid rocket instance")
}

fn bearer(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {}", token))
}

fn token_for(subject: &str) -> String {
    clients::new_issuer_with_symmetric_key("hireben.dev", SECRET)
        .unwrap()
        .issue_token(&TokenRequest::new().subject(subject).ttl(Duration::minutes(5)))
        .unwrap()
}

#[rocket::async_test]
async fn test_whoami_echoes_verified_claims() {
    let client = client().await;
    let response = client
        .get("/api/whoami")
        .header(bearer(&token_for("4242")))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.expect("claims body");
    assert_eq!(body["subject"], "4242");
    assert_eq!(body["issuer"], "hireben.dev");
}

#[rocket::async_test]
async fn test_missing_authorization_is_bad_request() {
    let client = client().await;
    for request in [
        client.get("/api/whoami"),
        client.get("/api/whoami").header(Header::new("Authorization", "   ")),
    ] {
        let response = request.dispatch().await;
        assert_eq!(response.status(), Status::BadRequest);
        assert_eq!(
            response.content_type(),
            Some(ContentType::new("application", "problem+json"))
        );
        let problem: ProblemDetail = response.into_json().await.expect("problem body");
        assert_eq!(problem.detail, "Missing HTTP header: Authorization");
    }
}

#[rocket::async_test]
async fn test_non_bearer_scheme_is_unauthorized() {
    let client = client().await;
    let response = client
        .get("/api/whoami")
        .header(Header::new("Authorization", "Basic dXNlcjpwYXNz"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
}

#[rocket::async_test]
async fn test_rejected_tokens_are_unauthorized() {
    let client = client().await;
    let foreign = clients::new_issuer_with_symmetric_key(
        "hireben.dev",
        b"a-completely-different-secret-value",
    )
    .unwrap()
    .issue_token(&TokenRequest::new().subject("1"))
    .unwrap();

    for token in [
        "garbage".to_string(),
        foreign,
        token_for("not-a-number"),
    ] {
        let response = client
            .get("/api/whoami")
            .header(bearer(&token))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);
        let problem: ProblemDetail = response.into_json().await.expect("problem body");
        assert_eq!(problem.status, 401);
        assert_eq!(problem.title, "Unauthorized");
    }
}

#[rocket::async_test]
async fn test_api_key_gate() {
    let client = client().await;

    let missing = client
        .post("/api/tokens")
        .header(ContentType::JSON)
        .body(r#"{"subject":"1"}"#)
        .dispatch()
        .await;
    assert_eq!(missing.status(), Status::Unauthorized);
    let problem: ProblemDetail = missing.into_json().await.expect("problem body");
    assert_eq!(problem.detail, "Missing API key");

    let invalid = client
        .post("/api/tokens")
        .header(ContentType::JSON)
        .header(Header::new("X-Api-Key", "wrong"))
        .body(r#"{"subject":"1"}"#)
        .dispatch()
        .await;
    assert_eq!(invalid.status(), Status::Unauthorized);
    let problem: ProblemDetail = invalid.into_json().await.expect("problem body");
    assert_eq!(problem.detail, "Invalid API key");
}

#[rocket::async_test]
async fn test_issued_token_opens_protected_route() {
    let client = client().await;
    let response = client
        .post("/api/tokens")
        .header(ContentType::JSON)
        .header(Header::new("X-Api-Key", format!("  {}  ", API_KEY)))
        .body(r#"{"subject":"77","audiences":["reports"],"claims":{"role":"auditor"},"ttl_secs":60}"#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let issued: IssuedToken = response.into_json().await.expect("token body");
    assert_eq!(issued.expires_in, Some(60));

    let response = client
        .get("/api/whoami")
        .header(bearer(&issued.access_token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.expect("claims body");
    assert_eq!(body["subject"], "77");
    assert_eq!(body["audiences"][0], "reports");
    assert_eq!(body["claims"]["role"], "auditor");
}

#[rocket::async_test]
async fn test_negative_ttl_is_a_validation_problem() {
    let client = client().await;
    let response = client
        .post("/api/tokens")
        .header(ContentType::JSON)
        .header(Header::new("X-Api-Key", API_KEY))
        .body(r#"{"subject":"1","ttl_secs":-1}"#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    let problem: ProblemDetail = response.into_json().await.expect("problem body");
    assert_eq!(problem.errors[0].field, "ttl_secs");
}

#[rocket::async_test]
async fn test_mistyped_body_field_is_a_validation_problem() {
    let client = client().await;
    let response = client
        .post("/api/tokens")
        .header(ContentType::JSON)
        .header(Header::new("X-Api-Key", API_KEY))
        .body(r#"{"subject":"1","ttl_secs":"abc"}"#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    let problem: ProblemDetail = response.into_json().await.expect("problem body");
    assert_eq!(problem.detail, "Validation failed");
    assert_eq!(problem.errors.len(), 1);
    assert_eq!(problem.errors[0].field, "ttl_secs");
}

#[rocket::async_test]
async fn test_malformed_json_is_bad_request() {
    let client = client().await;
    let response = client
        .post("/api/tokens")
        .header(ContentType::JSON)
        .header(Header::new("X-Api-Key", API_KEY))
        .body(r#"{"subject":"1","#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    let problem: ProblemDetail = response.into_json().await.expect("problem body");
    assert!(problem.detail.starts_with("Malformed JSON body"));
}
