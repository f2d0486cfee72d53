//! In-process stand-in for the Telegram Bot API: records every call and answers like Telegram.

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

#[derive(Clone, Default)]
pub struct MockApi {
    /// (method, JSON body) for every call, in arrival order.
    pub calls: Arc<Mutex<Vec<(String, Value)>>>,
    /// Reject sendMessage calls that carry a parse_mode, like Telegram does for bad entities.
    pub reject_markup: bool,
    /// Updates returned by the first getUpdates call without an offset.
    pub pending_updates: Arc<Mutex<Vec<Value>>>,
}

impl MockApi {
    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, b)| b.clone())
            .collect()
    }

    /// Start serving on a free port; returns the base URL to use as the Bot API base.
    pub async fn serve(&self) -> String {
        let port = free_port();
        let app = Router::new()
            .route("/:bot/:method", post(api_method))
            .with_state(self.clone());
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .expect("bind mock api");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://127.0.0.1:{}", port)
    }

    /// Poll until `method` has been called at least `n` times (5s limit).
    pub async fn wait_for(&self, method: &str, n: usize) -> Vec<Value> {
        for _ in 0..100 {
            let calls = self.calls_to(method);
            if calls.len() >= n {
                return calls;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("{} was not called {} time(s) within 5s", method, n);
    }
}

async fn api_method(
    State(mock): State<MockApi>,
    Path((_bot, method)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    mock.calls.lock().unwrap().push((method.clone(), body.clone()));
    match method.as_str() {
        "sendMessage" if mock.reject_markup && body.get("parse_mode").is_some() => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: can't parse entities"
            })),
        ),
        "getUpdates" => {
            let updates = if body.get("offset").is_none() {
                std::mem::take(&mut *mock.pending_updates.lock().unwrap())
            } else {
                Vec::new()
            };
            if updates.is_empty() {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            (StatusCode::OK, Json(json!({ "ok": true, "result": updates })))
        }
        "sendMessage" => (
            StatusCode::OK,
            Json(json!({ "ok": true, "result": { "message_id": 1 } })),
        ),
        _ => (StatusCode::OK, Json(json!({ "ok": true, "result": true }))),
    }
}
