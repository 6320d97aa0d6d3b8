#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// Stand-in for the chat incoming webhook and the orchestrator REST API.
#[derive(Clone)]
pub struct MockHook {
    pub received: Arc<Mutex<Vec<Value>>>,
    status: StatusCode,
}

pub struct MockServer {
    pub base_url: String,
    pub hook: MockHook,
}

impl MockServer {
    pub fn endpoint(&self) -> String {
        format!("{}/hook", self.base_url)
    }

    pub fn api_url(&self) -> String {
        format!("{}/api/v2", self.base_url)
    }

    pub async fn received(&self) -> Vec<Value> {
        self.hook.received.lock().await.clone()
    }

    /// Wait until at least `count` payloads arrived, or give up after 5s.
    pub async fn wait_for(&self, count: usize) -> Vec<Value> {
        for _ in 0..100 {
            let received = self.received().await;
            if received.len() >= count {
                return received;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.received().await
    }
}

async fn hook(State(hook): State<MockHook>, Json(body): Json<Value>) -> (StatusCode, &'static str) {
    hook.received.lock().await.push(body);
    let text = if hook.status == StatusCode::OK {
        "ok"
    } else {
        "no_service"
    };
    (hook.status, text)
}

async fn changes(Path(build_id): Path<i64>) -> Json<Value> {
    Json(json!({
        "changes": [
            {"author": format!("dev{} <dev@example.com>", build_id)},
            {"author": "alice"},
            {"author": "alice"}
        ]
    }))
}

pub async fn spawn_mock(status: StatusCode) -> MockServer {
    let hook_state = MockHook {
        received: Arc::new(Mutex::new(Vec::new())),
        status,
    };
    let app = Router::new()
        .route("/hook", post(hook))
        .route("/api/v2/builds/{id}/changes", get(changes))
        .with_state(hook_state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockServer {
        base_url: format!("http://{}", addr),
        hook: hook_state,
    }
}

/// An address nothing listens on.
pub async fn closed_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/hook", addr)
}

pub fn stamp(codebase: &str, project: &str, revision: &str) -> Value {
    json!({
        "revision": revision,
        "codebase": codebase,
        "project": project,
        "branch": "main",
        "repository": format!("https://git.example.com/{}.git", codebase)
    })
}

/// The sample report: one stamp, success, project "demo", revision "abc123".
pub fn sample_report() -> Value {
    report_with(0, vec![stamp("demo", "demo", "abc123")])
}

pub fn report_with(results: i64, sourcestamps: Vec<Value>) -> Value {
    json!({
        "body": "Build done.",
        "builds": [{
            "buildid": 1,
            "builder": {"name": "linux"},
            "results": results,
            "url": "http://ci.example.com/#/builders/1/builds/1",
            "properties": {"owner": ["alice", "Force Build Form"]},
            "buildset": {"sourcestamps": sourcestamps}
        }]
    })
}
