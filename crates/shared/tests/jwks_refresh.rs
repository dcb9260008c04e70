//! JWKS エンドポイントからの鍵取得とレート制限
//!
//! ローカルに立てた axum サーバで鍵セットを配信し、取得回数を数える。

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Value};
use shared::{AuthError, JwksCache, JwksVerifier, TokenVerifier};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

const PRIVATE_KEY: &[u8] = include_bytes!("fixtures/test_rsa.pem");
const MODULUS: &str = include_str!("fixtures/test_rsa.n");
const AUDIENCE: &str = "https://todos.example.com";
const ISSUER: &str = "https://issuer.example.com/";

/// 配信する鍵セット（`None` なら 500 を返す）と取得回数
#[derive(Default)]
struct JwksEndpoint {
    hits: AtomicUsize,
    body: Mutex<Option<Value>>,
}

impl JwksEndpoint {
    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn serve_kid(&self, kid: &str) {
        *self.body.lock().unwrap() = Some(json!({
            "keys": [{
                "kty": "RSA",
                "use": "sig",
                "alg": "RS256",
                "kid": kid,
                "n": MODULUS.trim(),
                "e": "AQAB"
            }]
        }));
    }

    fn fail(&self) {
        *self.body.lock().unwrap() = None;
    }
}

async fn jwks(State(endpoint): State<Arc<JwksEndpoint>>) -> Response {
    endpoint.hits.fetch_add(1, Ordering::SeqCst);
    let body = endpoint.body.lock().unwrap().clone();
    match body {
        Some(body) => Json(body).into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// サーバを起動し、その JWKS URI を返す
async fn start_endpoint(endpoint: Arc<JwksEndpoint>) -> String {
    let app = Router::new()
        .route("/.well-known/jwks.json", get(jwks))
        .with_state(endpoint);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/.well-known/jwks.json")
}

async fn setup(requests_per_minute: u32, max_age: Duration) -> (Arc<JwksEndpoint>, JwksVerifier) {
    let endpoint = Arc::new(JwksEndpoint::default());
    let uri = start_endpoint(endpoint.clone()).await;
    let cache = JwksCache::new(uri, requests_per_minute, max_age);
    let verifier = JwksVerifier::new(Arc::new(cache), AUDIENCE, ISSUER);
    (endpoint, verifier)
}

#[derive(Serialize)]
struct TestClaims<'a> {
    sub: &'a str,
    aud: &'a str,
    iss: &'a str,
    exp: i64,
}

fn sign(kid: &str, sub: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let claims = TestClaims {
        sub,
        aud: AUDIENCE,
        iss: ISSUER,
        exp: Utc::now().timestamp() + 3600,
    };
    encode(&header, &claims, &EncodingKey::from_rsa_pem(PRIVATE_KEY).unwrap()).unwrap()
}

#[tokio::test]
async fn test_keys_are_fetched_lazily_and_cached() {
    let (endpoint, verifier) = setup(5, Duration::from_secs(600)).await;
    endpoint.serve_kid("key-1");
    assert_eq!(endpoint.hits(), 0);

    for _ in 0..5 {
        let user = verifier.verify(&sign("key-1", "alice")).await.unwrap();
        assert_eq!(user.as_str(), "alice");
    }

    assert_eq!(endpoint.hits(), 1);
}

#[tokio::test]
async fn test_rotated_kid_triggers_refetch() {
    let (endpoint, verifier) = setup(5, Duration::from_secs(600)).await;
    endpoint.serve_kid("key-1");
    verifier.verify(&sign("key-1", "alice")).await.unwrap();

    endpoint.serve_kid("key-2");
    let user = verifier.verify(&sign("key-2", "bob")).await.unwrap();

    assert_eq!(user.as_str(), "bob");
    assert_eq!(endpoint.hits(), 2);
}

#[tokio::test]
async fn test_unknown_kids_are_capped_by_rate_limit() {
    let (endpoint, verifier) = setup(2, Duration::from_secs(600)).await;
    endpoint.serve_kid("key-1");

    for i in 0..5 {
        let kid = format!("unknown-{i}");
        let err = verifier.verify(&sign(&kid, "alice")).await.unwrap_err();
        assert_eq!(err, AuthError::UnknownKey(kid));
    }

    assert_eq!(endpoint.hits(), 2);
    // 既知の鍵は取得済みのセットで検証できる
    verifier.verify(&sign("key-1", "alice")).await.unwrap();
    assert_eq!(endpoint.hits(), 2);
}

#[tokio::test]
async fn test_expired_key_set_is_refetched_within_limit() {
    let (endpoint, verifier) = setup(2, Duration::ZERO).await;
    endpoint.serve_kid("key-1");

    for _ in 0..4 {
        verifier.verify(&sign("key-1", "alice")).await.unwrap();
    }

    // 上限到達後は期限切れの鍵をそのまま使う
    assert_eq!(endpoint.hits(), 2);
}

#[tokio::test]
async fn test_endpoint_failure_is_a_key_set_error() {
    let (endpoint, verifier) = setup(5, Duration::from_secs(600)).await;
    endpoint.fail();

    let err = verifier.verify(&sign("key-1", "alice")).await.unwrap_err();

    assert!(matches!(err, AuthError::KeySet(_)), "{err:?}");
    assert_eq!(endpoint.hits(), 1);
}
