//! End-to-end checks against a live PostgreSQL.
//!
//! Run with: DATABASE_URL=postgres://... cargo test -- --ignored

use std::path::Path;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use hub_server::auth::JwtKeys;
use hub_server::db::Database;
use hub_server::routes::create_routes;
use hub_server::state::AppState;
use hub_server::uploads::UploadManager;

const SECRET: &[u8] = b"integration-secret";
const BOUNDARY: &str = "hubtestboundary";

struct TestApp {
    router: Router,
    pool: PgPool,
    token: String,
    jwt: JwtKeys,
    _storage: tempfile::TempDir,
    root: std::path::PathBuf,
}

async fn spawn_app() -> TestApp {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let pool = PgPool::connect(&url).await.expect("connect failed");
    let db = Database::from_pool(pool.clone());
    db.migrate().await.expect("migrations failed");

    let storage = tempfile::tempdir().expect("tempdir");
    let root = storage.path().to_path_buf();
    let jwt = JwtKeys::new(SECRET, chrono::Duration::hours(1));
    let token = jwt.issue(Uuid::new_v4()).expect("token");

    let state = AppState::new(db, UploadManager::new(&root), jwt.clone(), false);
    TestApp {
        router: create_routes(state, false),
        pool,
        token,
        jwt,
        _storage: storage,
        root,
    }
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        field: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                field,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn authed(&self, method: Method, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
    }

    async fn multipart(&self, method: Method, uri: &str, parts: &[Part<'_>]) -> (StatusCode, Value) {
        let request = self
            .authed(method, uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        self.send(request).await
    }

    async fn json(&self, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = self
            .authed(method, uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn empty(&self, method: Method, uri: &str) -> (StatusCode, Value) {
        let request = self.authed(method, uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    fn stored(&self, reference: &Value) -> bool {
        let reference = reference.as_str().expect("reference is a string");
        self.root.join(Path::new(reference)).is_file()
    }
}

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nnot really a png";

#[tokio::test]
#[ignore = "requires database"]
async fn duplicate_email_is_conflict() {
    let app = spawn_app().await;
    let email = format!("dup-{}@example.com", Uuid::new_v4());
    let body = json!({"name": "Ada", "email": email, "password": "secret123"});

    let (status, first) = app.json(Method::POST, "/api/v1/users/register", body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(first.get("password").is_none());

    let (status, second) = app.json(Method::POST, "/api/v1/users/register", body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(second["error"], "Email already exists");

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore = "requires database"]
async fn login_sets_cookie_and_rejects_bad_password() {
    let app = spawn_app().await;
    let email = format!("login-{}@example.com", Uuid::new_v4());
    app.json(
        Method::POST,
        "/api/v1/users/register",
        json!({"name": "Grace", "email": email, "password": "hopper42"}),
    )
    .await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"email": email, "password": "hopper42"}).to_string(),
        ))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));

    let (status, body) = app
        .json(
            Method::POST,
            "/api/v1/auth/login",
            json!({"email": email, "password": "wrong-password"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}

#[tokio::test]
#[ignore = "requires database"]
async fn community_logo_survives_text_update_and_is_replaced_on_upload() {
    let app = spawn_app().await;

    let (status, created) = app
        .multipart(
            Method::POST,
            "/api/v1/community",
            &[
                Part::Text("name", "Makers"),
                Part::Text("category", "tech"),
                Part::Text("contact", "555-0100"),
                Part::File {
                    field: "logo",
                    file_name: "logo.png",
                    content_type: "image/png",
                    bytes: PNG,
                },
            ],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    let original_logo = created["logo"].clone();
    assert!(app.stored(&original_logo));

    let uri = format!("/api/v1/community/{id}");
    let (status, updated) = app
        .multipart(Method::PATCH, &uri, &[Part::Text("description", "weekly meetups")])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["logo"], original_logo);
    assert_eq!(updated["description"], "weekly meetups");

    let (status, replaced) = app
        .multipart(
            Method::PUT,
            &uri,
            &[Part::File {
                field: "logo",
                file_name: "new-logo.png",
                content_type: "image/png",
                bytes: PNG,
            }],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(replaced["logo"], original_logo);
    assert!(app.stored(&replaced["logo"]));
    assert!(!app.stored(&original_logo));

    let (status, deleted) = app.empty(Method::DELETE, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["message"], "The record is deleted");
    assert!(!app.stored(&replaced["logo"]));

    let (status, _) = app.empty(Method::GET, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires database"]
async fn malformed_social_links_stored_as_empty_object() {
    let app = spawn_app().await;

    let (status, created) = app
        .json(
            Method::POST,
            "/api/v1/community",
            json!({
                "name": "Readers",
                "category": "books",
                "contact": "555-0101",
                "social_links": "{not json"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["social_links"], json!({}));
}

#[tokio::test]
#[ignore = "requires database"]
async fn empty_event_update_leaves_row_unchanged() {
    let app = spawn_app().await;

    let (status, created) = app
        .json(
            Method::POST,
            "/api/v1/events",
            json!({
                "event_name": "Launch",
                "event_date": "2026-11-02",
                "event_time": "18:30",
                "category": "tech",
                "cost": "12.50"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "upcoming");
    assert_eq!(created["priority"], false);

    let uri = format!("/api/v1/events/{}", created["id"].as_str().unwrap());
    let (status, unchanged) = app.empty(Method::PATCH, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unchanged, created);
}

#[tokio::test]
#[ignore = "requires database"]
async fn event_without_image_deletes_cleanly() {
    let app = spawn_app().await;

    let (_, created) = app
        .json(
            Method::POST,
            "/api/v1/events",
            json!({
                "event_name": "Picnic",
                "event_date": "2026-06-01",
                "event_time": "12:00",
                "category": "social"
            }),
        )
        .await;
    assert!(created["event_image"].is_null());

    let uri = format!("/api/v1/events/{}", created["id"].as_str().unwrap());
    let (status, body) = app.empty(Method::DELETE, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Event deleted");

    let (status, _) = app.empty(Method::DELETE, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires database"]
async fn rejected_event_leaves_no_files() {
    let app = spawn_app().await;

    let (status, body) = app
        .multipart(
            Method::POST,
            "/api/v1/events",
            &[
                Part::Text("event_name", "X"),
                Part::File {
                    field: "event_image",
                    file_name: "poster.png",
                    content_type: "image/png",
                    bytes: PNG,
                },
            ],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"].as_array().is_some_and(|e| !e.is_empty()));

    let images = app.root.join("uploads").join("event-images");
    let leftover = std::fs::read_dir(&images)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftover, 0);
}

#[tokio::test]
#[ignore = "requires database"]
async fn community_delete_succeeds_when_logo_already_gone() {
    let app = spawn_app().await;

    let (status, created) = app
        .multipart(
            Method::POST,
            "/api/v1/community",
            &[
                Part::Text("name", "Gardeners"),
                Part::Text("category", "outdoors"),
                Part::Text("contact", "555-0102"),
                Part::File {
                    field: "logo",
                    file_name: "logo.png",
                    content_type: "image/png",
                    bytes: PNG,
                },
            ],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let logo = created["logo"].as_str().unwrap();
    std::fs::remove_file(app.root.join(logo)).unwrap();

    let uri = format!("/api/v1/community/{}", created["id"].as_str().unwrap());
    let (status, deleted) = app.empty(Method::DELETE, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["message"], "The record is deleted");

    let (status, _) = app.empty(Method::GET, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires database"]
async fn profile_delete_removes_image_row_and_session() {
    let app = spawn_app().await;
    let email = format!("bye-{}@example.com", Uuid::new_v4());

    let (status, user) = app
        .multipart(
            Method::POST,
            "/api/v1/users/register",
            &[
                Part::Text("name", "Linus"),
                Part::Text("email", &email),
                Part::Text("password", "penguin1"),
                Part::Text("interest", ""),
                Part::File {
                    field: "image",
                    file_name: "me.png",
                    content_type: "image/png",
                    bytes: PNG,
                },
            ],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["interest"], json!([]));
    let image = user["image"].clone();
    assert!(app.stored(&image));

    let id: Uuid = user["id"].as_str().unwrap().parse().unwrap();
    let token = app.jwt.issue(id).unwrap();
    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/api/v1/users/profile")
        .header(header::COOKIE, format!("token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cleared = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.starts_with("token=;"), "{cleared}");
    assert!(cleared.contains("Max-Age=0"), "{cleared}");

    assert!(!app.stored(&image));
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE id = $1")
        .bind(id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}
