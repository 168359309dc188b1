use actix_web::{dev::Payload, test, FromRequest};
use jsonwebtoken::{encode, EncodingKey, Header};
use serial_test::serial;
use std::env;
use valley_cms::auth::{issue_token, Auth, Claims, SECRET_ENV};
use valley_cms::error::ApiError;

// Helper that guarantees a sufficiently long secret for tests.
fn set_secret() {
    env::set_var(SECRET_ENV, "test-secret-must-be-32-bytes-long!!");
}

async fn extract(header: Option<String>) -> Result<Auth, ApiError> {
    let mut req = test::TestRequest::default();
    if let Some(h) = header {
        req = req.insert_header(("Authorization", h));
    }
    let req = req.to_http_request();
    let mut pl = Payload::None;
    Auth::from_request(&req, &mut pl).await
}

#[actix_web::test]
#[serial]
async fn token_roundtrip_ok() {
    set_secret();
    let token = issue_token("editor-7", chrono::Duration::hours(1)).expect("token");
    // The Auth extractor is the public way to validate, so use it here.
    let auth = extract(Some(format!("Bearer {token}"))).await.expect("extract");
    assert_eq!(auth.subject(), "editor-7");
}

#[actix_web::test]
#[serial]
async fn extractor_rejects_invalid_token() {
    set_secret();
    assert!(matches!(extract(Some("Bearer notatoken".into())).await, Err(ApiError::Unauthorized)));
}

#[actix_web::test]
#[serial]
async fn extractor_rejects_missing_header() {
    set_secret();
    assert!(matches!(extract(None).await, Err(ApiError::Unauthorized)));
    assert!(matches!(extract(Some("Basic Zm9vOmJhcg==".into())).await, Err(ApiError::Unauthorized)));
}

#[actix_web::test]
#[serial]
async fn expired_token_is_rejected() {
    set_secret();
    let token = issue_token("editor", chrono::Duration::hours(-2)).expect("token");
    assert!(matches!(extract(Some(format!("Bearer {token}"))).await, Err(ApiError::Unauthorized)));
}

#[actix_web::test]
#[serial]
async fn token_signed_with_another_secret_is_rejected() {
    set_secret();
    let claims = Claims { sub: "intruder".into(), exp: (chrono::Utc::now().timestamp() + 3600) as usize };
    let forged = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"some-other-secret-that-is-long-enough"),
    )
    .unwrap();
    assert!(matches!(extract(Some(format!("Bearer {forged}"))).await, Err(ApiError::Unauthorized)));
}
