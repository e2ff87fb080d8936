use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use storage::{
    Database, models::AdminRole, repository::admin::AdminRepository, services::credentials,
};
use tower::ServiceExt;

use crate::features;
use crate::state::{AppState, SessionSettings};

pub const TEST_PASSWORD: &str = "rahasia-panitia";

/// Full API router over a migrated in-memory database.
pub struct TestApp {
    pub db: Database,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::in_memory().await.expect("open in-memory database");
        db.run_migrations().await.expect("run migrations");

        let state = AppState {
            db: db.clone(),
            sessions: SessionSettings::default(),
        };

        Self {
            router: features::router(state),
            db,
        }
    }

    pub async fn create_admin(&self, username: &str, role: AdminRole) {
        let hash = credentials::hash_password(TEST_PASSWORD).expect("hash password");
        AdminRepository::new(self.db.pool())
            .create(username, &hash, username, role)
            .await
            .expect("create admin");
    }

    /// Creates an admin with `role` and returns a fresh session token.
    pub async fn login_as(&self, username: &str, role: AdminRole) -> String {
        self.create_admin(username, role).await;

        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": username, "password": TEST_PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");

        body["data"]["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    /// Posts `contents` as the `file` field of a multipart form.
    pub async fn upload(
        &self,
        uri: &str,
        token: &str,
        file_name: &str,
        contents: &str,
    ) -> (StatusCode, Value) {
        let boundary = "tka13-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {contents}\r\n\
             --{boundary}--\r\n"
        );

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("build request");

        self.send(request).await
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible router");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, value)
    }
}
