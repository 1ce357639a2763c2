use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{self, auth, communities, events, users};
use crate::state::AppState;
use crate::uploads::intake::{MAX_FILES, MAX_FILE_BYTES};
use crate::uploads::UPLOADS_DIR;

/// Headroom over the file payload for text fields and multipart framing.
const BODY_LIMIT: usize = MAX_FILES * MAX_FILE_BYTES + 1024 * 1024;

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list))
        .route("/register", post(users::register))
        .route(
            "/profile",
            get(users::profile)
                .patch(users::update_profile)
                .delete(users::delete_profile),
        )
        .route("/:id", get(users::get))
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
}

fn community_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(communities::list).post(communities::create))
        .route(
            "/:id",
            get(communities::get)
                .put(communities::update)
                .patch(communities::update)
                .delete(communities::remove),
        )
}

fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(events::list).post(events::create))
        .route(
            "/:id",
            get(events::get)
                .put(events::update)
                .patch(events::update)
                .delete(events::remove),
        )
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/health", get(handlers::health_check))
        .route("/hello", get(handlers::hello))
        .nest("/users", user_routes())
        .nest("/auth", auth_routes())
        .nest("/community", community_routes())
        .nest("/events", event_routes())
}

pub fn create_routes(state: AppState, production: bool) -> Router {
    let uploads = ServeDir::new(state.uploads().uploads_dir());

    let router = Router::new()
        .nest("/api/v1", api_routes())
        .nest_service(&format!("/{UPLOADS_DIR}"), uploads)
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state);

    create_security_headers_layer(router, production)
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JwtKeys;
    use crate::db::Database;
    use crate::uploads::UploadManager;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn app(root: &std::path::Path) -> Router {
        let db = Database::connect_lazy("postgres://localhost/hub_unused").unwrap();
        let state = AppState::new(
            db,
            UploadManager::new(root),
            JwtKeys::new(b"test-secret", chrono::Duration::hours(1)),
            false,
        );
        create_routes(state, false)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path()).oneshot(get("/api/v1/ping")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"pong");
    }

    #[tokio::test]
    async fn test_health_has_security_headers() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path()).oneshot(get("/api/v1/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert!(!response.headers().contains_key("strict-transport-security"));
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path()).oneshot(get("/api/v1/nope")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Not found");
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());

        for (method, uri) in [
            ("GET", "/api/v1/community"),
            ("POST", "/api/v1/events"),
            ("GET", "/api/v1/users/profile"),
            ("DELETE", "/api/v1/community/00000000-0000-0000-0000-000000000000"),
        ] {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
            assert!(body_json(response).await["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_invalid_token_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::builder()
            .uri("/api/v1/community")
            .header(header::AUTHORIZATION, "Bearer not-a-token")
            .body(Body::empty())
            .unwrap();
        let response = app(dir.path()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Invalid or expired token");
    }

    #[tokio::test]
    async fn test_invalid_id_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let token = JwtKeys::new(b"test-secret", chrono::Duration::hours(1))
            .issue(uuid::Uuid::new_v4())
            .unwrap();
        let request = Request::builder()
            .uri("/api/v1/community/not-a-uuid")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = app(dir.path()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_uploads_served_from_storage_root() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("uploads").join("event-images");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::write(images.join("1-event_image.png"), b"png bytes").unwrap();

        let response = app(dir.path())
            .oneshot(get("/uploads/event-images/1-event_image.png"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"png bytes");
    }
}
