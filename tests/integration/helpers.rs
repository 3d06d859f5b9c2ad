//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use beacon_api::{AppState, build_app, build_state};
use beacon_auth::{IssuedCredentials, PasswordHasher, StaticIdentityDirectory};
use beacon_core::config::AppConfig;
use beacon_core::types::id::PrincipalId;
use beacon_core::types::principal::Principal;
use beacon_realtime::router::handler_fn;
use beacon_realtime::{InboundRouter, Message, MessageKind};

pub const ADMIN: PrincipalId = PrincipalId::new(1);
pub const ALICE: PrincipalId = PrincipalId::new(2);
pub const BOB: PrincipalId = PrincipalId::new(3);

/// Alice's login password.
pub const ALICE_PASSWORD: &str = "alice-pass";

/// Machine client registered in the test configuration; it acts as Bob.
pub const CLIENT_NAME: &str = "kiosk";
pub const CLIENT_KEY: &str = "kiosk-key";

/// Messages of this kind are echoed back to the sender.
pub const ECHO_KIND: MessageKind = 1;

const TEST_CONFIG: &str = r#"
[store]
provider = "memory"
workspace = "itest"

[auth]
access_secret = "itest-access"
refresh_secret = "itest-refresh"

[[identity.clients]]
name = "kiosk"
key = "kiosk-key"
principal_id = 3

[realtime]
connect_policy = "login"
offline_buffer_capacity = 50

[logging]
level = "debug"
format = "pretty"
"#;

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state, for calling the authority and engine directly
    pub state: AppState,
}

impl TestApp {
    /// Create a new test application with the default test configuration
    pub async fn new() -> Self {
        let config = AppConfig::from_toml(TEST_CONFIG).expect("Failed to load test config");
        Self::with_config(config).await
    }

    /// Create a new test application from an explicit configuration
    pub async fn with_config(config: AppConfig) -> Self {
        let directory = StaticIdentityDirectory::new();
        directory.upsert(Principal::new(ADMIN, "admin", true));
        directory.upsert(Principal::new(ALICE, "alice", false));
        directory.upsert(Principal::new(BOB, "bob", false));
        directory.set_password_hash(ALICE, alice_hash());

        let state = build_state(config, Arc::new(directory), echo_router())
            .await
            .expect("Failed to build state");

        Self {
            router: build_app(state.clone()),
            state,
        }
    }

    /// Issue a fresh credential pair for a principal
    pub async fn issue(&self, principal_id: PrincipalId) -> IssuedCredentials {
        self.state
            .authority
            .issue_credentials(principal_id)
            .await
            .expect("Failed to issue credentials")
    }

    /// Serve the app on an ephemeral port and return its address
    pub async fn serve(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("No local addr");
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server failed");
        });
        addr
    }

    /// Make a request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        self.request_with_headers(method, path, body, token, &[]).await
    }

    /// Make a request carrying extra headers
    pub async fn request_with_headers(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }
        for (name, value) in headers {
            req = req.header(*name, *value);
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

/// Argon2 is slow in debug builds, so the hash is computed once per binary.
fn alice_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| {
        PasswordHasher::new()
            .hash_password(ALICE_PASSWORD)
            .expect("Failed to hash password")
    })
    .clone()
}

fn echo_router() -> InboundRouter {
    InboundRouter::builder()
        .on(
            ECHO_KIND,
            handler_fn(|ctx, message: Message| async move {
                ctx.hub.send_to_principal(message, ctx.principal_id).await;
                Ok(())
            }),
        )
        .build()
}
