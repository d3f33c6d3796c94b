mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use bson::oid::ObjectId;
use movers_backend::model::user::UserRole;
use movers_backend::util::jwt::JwtTokenUtils;
use serde_json::{json, Value};
use tower::ServiceExt; // for .oneshot()

use common::{customer, delhi_to_mumbai_json, staff, TestEnv};

async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn submit(app: &Router, token: Option<&str>) -> String {
    let (status, body) = send(app, "POST", "/quotes", token, Some(delhi_to_mumbai_json("asha@example.com"))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["quoteId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn anonymous_submission_and_public_tracking() {
    let env = TestEnv::new();
    let app = env.router();

    let (status, body) = send(&app, "POST", "/quotes", None, Some(delhi_to_mumbai_json("asha@example.com"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    let quote_id = body["quoteId"].as_str().unwrap();

    let (status, body) = send(&app, "GET", &format!("/quotes/track/{}", quote_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fromCity"], "Delhi");
    assert_eq!(body["toCity"], "Mumbai");
    assert!(body.get("email").is_none());
    assert!(body.get("phone").is_none());

    let (status, body) = send(&app, "GET", "/quotes/track/UP00000000", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn invalid_submission_is_a_bad_request() {
    let env = TestEnv::new();
    let app = env.router();
    let mut payload = delhi_to_mumbai_json("not-an-email");
    payload["fromFloor"] = json!(2);
    let (status, body) = send(&app, "POST", "/quotes", None, Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation");
}

#[tokio::test]
async fn customer_routes_need_a_valid_token() {
    let env = TestEnv::new();
    let app = env.router();

    let (status, _) = send(&app, "GET", "/quotes/mine", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/quotes/mine", Some("Bearer not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let asha = customer("asha@example.com");
    let token = env.bearer(&asha);
    submit(&app, Some(&token)).await;
    let (status, body) = send(&app, "GET", "/quotes/mine", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn admin_routes_are_staff_only() {
    let env = TestEnv::new();
    let app = env.router();
    let customer_token = env.bearer(&customer("asha@example.com"));
    let staff_token = env.bearer(&staff());

    let (status, _) = send(&app, "GET", "/admin/quotes", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, "GET", "/admin/quotes", Some(&customer_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    submit(&app, None).await;
    let (status, body) = send(&app, "GET", "/admin/quotes?page=1&limit=10", Some(&staff_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["limit"], 10);
}

#[tokio::test]
async fn lifecycle_over_http() {
    let env = TestEnv::new();
    let app = env.router();
    let asha = customer("asha@example.com");
    let token = env.bearer(&asha);
    let staff_token = env.bearer(&staff());
    let quote_id = submit(&app, Some(&token)).await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/admin/quotes/{}/price", quote_id),
        Some(&staff_token),
        Some(json!({ "estimatedCost": 45000.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "quoted");

    // A different customer cannot touch it
    let other = env.bearer(&customer("ravi@example.com"));
    let (status, _) = send(&app, "POST", &format!("/quotes/{}/cancel", quote_id), Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let accept_uri = format!("/quotes/{}/accept", quote_id);
    let (status, body) = send(&app, "POST", &accept_uri, Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");

    let (status, body) = send(&app, "POST", &accept_uri, Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "PreconditionFailed");
    assert_eq!(body["details"], "accepted");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/quotes/{}/payment", quote_id),
        Some(&token),
        Some(json!({ "method": "upi", "amount": 45000.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paymentStatus"], "completed");
    assert!(body["transactionId"].as_str().unwrap().starts_with("TXN-"));

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/admin/quotes/{}/status", quote_id),
        Some(&staff_token),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let feedback_uri = format!("/quotes/{}/feedback", quote_id);
    let (status, body) = send(
        &app,
        "POST",
        &feedback_uri,
        Some(&token),
        Some(json!({ "rating": 5, "comment": "Smooth move" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rating"], 5);

    let (status, body) = send(&app, "GET", &feedback_uri, Some(&staff_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["comment"], "Smooth move");
}

#[tokio::test]
async fn owner_delete_over_http() {
    let env = TestEnv::new();
    let app = env.router();
    let token = env.bearer(&customer("asha@example.com"));
    let quote_id = submit(&app, Some(&token)).await;

    let uri = format!("/quotes/{}", quote_id);
    let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn register_and_login() {
    let env = TestEnv::new();
    let app = env.router();
    let register = json!({
        "username": "asha",
        "firstName": "Asha",
        "lastName": "Verma",
        "email": "Asha@Example.com",
        "password": "Str0ngPass"
    });

    let (status, body) = send(&app, "POST", "/users/register", None, Some(register.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "asha@example.com");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("passwordHash").is_none());

    let (status, _) = send(&app, "POST", "/users/register", None, Some(register)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        "POST",
        "/users/login",
        None,
        Some(json!({ "email": "asha@example.com", "password": "Str0ngPass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let access = body["tokens"]["accessToken"].as_str().unwrap().to_string();
    let refresh = body["tokens"]["refreshToken"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        "/users/login",
        None,
        Some(json!({ "email": "asha@example.com", "password": "WrongPass1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        "POST",
        "/users/refresh-token",
        None,
        Some(json!({ "refreshToken": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["accessToken"].as_str().is_some());

    // The issued access token works on customer routes
    let (status, _) = send(&app, "GET", "/quotes/mine", Some(&format!("Bearer {}", access)), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_reissues_from_the_stored_account() {
    let env = TestEnv::new();
    let app = env.router();
    let register = json!({
        "username": "meera",
        "firstName": "Meera",
        "lastName": "Iyer",
        "email": "meera@example.com",
        "password": "Str0ngPass"
    });
    let (status, body) = send(&app, "POST", "/users/register", None, Some(register)).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["user"]["id"].as_str().unwrap().to_string();

    // Claims that disagree with the stored account must not survive a refresh
    let forged = env
        .jwt
        .generate_token_pair(&id, "someone-else@example.com", UserRole::Admin)
        .unwrap();
    let (status, body) = send(
        &app,
        "POST",
        "/users/refresh-token",
        None,
        Some(json!({ "refreshToken": forged.refresh_token })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let claims = env
        .jwt
        .validate_access_token(body["accessToken"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.sub, id);
    assert_eq!(claims.email, "meera@example.com");
    assert_eq!(claims.role, UserRole::User);

    let orphan = env
        .jwt
        .generate_token_pair(&ObjectId::new().to_hex(), "ghost@example.com", UserRole::User)
        .unwrap();
    let (status, _) = send(
        &app,
        "POST",
        "/users/refresh-token",
        None,
        Some(json!({ "refreshToken": orphan.refresh_token })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_public() {
    let env = TestEnv::new();
    let app = env.router();
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
