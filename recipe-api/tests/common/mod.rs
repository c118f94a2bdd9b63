//! Shared infrastructure for the integration tests
//!
//! Tests need a PostgreSQL database. Point `DATABASE_URL` at one; when it is
//! unset, [`TestContext::new`] returns `None` and the test returns early.
//!
//! Each context registers a fresh user with a random email and a temporary
//! media directory, so tests can run in parallel against one database.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use recipe_api::app::{build_router, AppState};
use recipe_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig, MediaConfig};
use recipe_shared::auth::jwt::{create_token, Claims, TokenType};
use recipe_shared::db::migrations::run_migrations;
use recipe_shared::models::user::User;
use serde_json::Value;
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const TEST_PASSWORD: &str = "testpass123";

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
    pub config: Config,
    pub user: User,
    pub token: String,
    pub media_dir: TempDir,
}

impl TestContext {
    /// Connects, migrates and registers a user; `None` without `DATABASE_URL`
    pub async fn new() -> Option<Self> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping database test");
            return None;
        };

        let media_dir = tempfile::tempdir().expect("create media dir");

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url,
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: TEST_SECRET.to_string(),
                access_ttl_hours: 1,
            },
            media: MediaConfig {
                root: media_dir.path().to_path_buf(),
                url: "/static/media".to_string(),
            },
        };

        let db = PgPool::connect(&config.database.url)
            .await
            .expect("connect to test database");
        run_migrations(&db).await.expect("run migrations");

        let user = create_user(&db).await;
        let token = access_token_for(&user);

        let app = build_router(AppState::new(db.clone(), config.clone()));

        Some(TestContext {
            db,
            app,
            config,
            user,
            token,
            media_dir,
        })
    }

    /// Returns authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Registers a second user, for isolation tests
    pub async fn other_user(&self) -> User {
        create_user(&self.db).await
    }

    /// Authenticated JSON request
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send_as(Some(&self.auth_header()), method, uri, body).await
    }

    /// Request with an explicit (or no) `Authorization` header
    pub async fn send_as(
        &self,
        authorization: Option<&str>,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        read_json(response).await
    }

    /// Cleans up test data; recipes, tags and ingredients cascade
    pub async fn cleanup(&self) {
        User::delete(&self.db, self.user.id).await.unwrap();
    }
}

pub async fn create_user(db: &PgPool) -> User {
    User::create_user(db, &format!("user-{}@example.com", Uuid::new_v4()), TEST_PASSWORD)
        .await
        .expect("create test user")
}

pub fn access_token_for(user: &User) -> String {
    create_token(&Claims::new(user.id, TokenType::Access), TEST_SECRET).expect("sign token")
}

/// Splits a response into status and parsed JSON (`Null` for empty bodies)
pub async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .unwrap_or_else(|_| panic!("non-JSON body: {}", String::from_utf8_lossy(&body)))
    };

    (status, json)
}

/// Builds a single-part multipart body
pub fn multipart_body(field: &str, file_name: &str, content: &[u8]) -> (String, Vec<u8>) {
    let boundary = format!("boundary{}", Uuid::new_v4().simple());

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    (format!("multipart/form-data; boundary={}", boundary), body)
}

/// Smallest byte string that passes the PNG signature check
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0u8; 32]);
    bytes
}
