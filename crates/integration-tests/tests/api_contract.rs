//! Request-level behaviour that needs no database: error shape of the
//! extractors and the login rate limiter. These always run.

#![allow(clippy::unwrap_used)]

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router, middleware::map_response};
use serde_json::{Value, json};
use tower::ServiceExt;

use mailroom_core::{Email, TicketStatus};
use mailroom_server::error::{ApiJson, ApiPath, ApiQuery, AppError};
use mailroom_server::middleware::{auth_rate_limiter, json_rate_limit_body};
use mailroom_server::services::lifecycle::CreateUserRequest;

async fn create(ApiJson(body): ApiJson<CreateUserRequest>) -> Json<Value> {
    Json(json!({ "email": body.email }))
}

async fn show(ApiPath(email): ApiPath<Email>) -> Json<Value> {
    Json(json!({ "email": email }))
}

#[derive(serde::Deserialize)]
struct StatusQuery {
    status: Option<TicketStatus>,
}

async fn tickets(ApiQuery(query): ApiQuery<StatusQuery>) -> Json<Value> {
    Json(json!({ "status": query.status }))
}

async fn fails() -> Result<(), AppError> {
    Err(AppError::Internal("connection string leaked here".to_owned()))
}

fn app() -> Router {
    Router::new()
        .route("/users", post(create))
        .route("/users/{email}", get(show))
        .route("/tickets", get(tickets))
        .route("/boom", get(fails))
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

#[tokio::test]
async fn test_malformed_json_is_400_with_error_body() {
    let response = app()
        .oneshot(post_json("/users", "{not json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_invalid_email_in_body_is_400() {
    let body = r#"{"email": "nope", "first_name": "A", "last_name": "B", "password": "long enough"}"#;
    let response = app().oneshot(post_json("/users", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_valid_body_passes_through() {
    let body = r#"{"email": " jane@example.org ", "first_name": "A", "last_name": "B", "password": "long enough"}"#;
    let response = app().oneshot(post_json("/users", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["email"], "jane@example.org");
}

#[tokio::test]
async fn test_bad_path_and_query_are_400() {
    let response = app()
        .oneshot(Request::get("/users/not-an-email").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());

    let response = app()
        .oneshot(Request::get("/tickets?status=open").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app()
        .oneshot(Request::get("/tickets?status=rejected").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_json(response).await["status"], "rejected");
}

#[tokio::test]
async fn test_internal_errors_hide_detail() {
    let response = app()
        .oneshot(Request::get("/boom").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn test_login_rate_limit_is_per_client_and_json() {
    let app = Router::new()
        .route("/auth/login", post(|| async { StatusCode::UNAUTHORIZED }))
        .layer(auth_rate_limiter())
        .layer(map_response(json_rate_limit_body));

    let login_from = |ip: &str| {
        Request::post("/auth/login")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    let mut limited = None;
    for _ in 0..20 {
        let response = app.clone().oneshot(login_from("203.0.113.7")).await.unwrap();
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            limited = Some(response);
            break;
        }
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    let limited = limited.expect("burst should be exhausted");
    assert!(body_json(limited).await["error"].is_string());

    // Another client still gets through.
    let response = app.oneshot(login_from("198.51.100.2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
