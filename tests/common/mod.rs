#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use arogya::client::{
    ClientConfig, GeminiClient, InlineData, RetryPolicy, Transport, TransportError,
    TransportResponse,
};

pub type Scripted = Result<TransportResponse, TransportError>;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).expect("Failed to read fixture")
}

/// Replays canned responses and records every request body.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    bodies: Mutex<Vec<serde_json::Value>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            bodies: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.bodies.lock().unwrap().len()
    }

    pub fn bodies(&self) -> Vec<serde_json::Value> {
        self.bodies.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    async fn post_json(
        &self,
        _url: &str,
        body: &serde_json::Value,
    ) -> Result<TransportResponse, TransportError> {
        self.bodies.lock().unwrap().push(body.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::new("script exhausted")))
    }
}

pub fn text_response(text: &str) -> Scripted {
    let body = serde_json::json!({
        "candidates": [{"content": {"parts": [{"text": text}], "role": "model"}}]
    });
    Ok(TransportResponse::new(200, body.to_string()))
}

pub fn status(code: u16, body: &str) -> Scripted {
    Ok(TransportResponse::new(code, body))
}

pub fn client(script: Vec<Scripted>) -> GeminiClient<ScriptedTransport> {
    GeminiClient::new(
        ScriptedTransport::new(script),
        ClientConfig {
            api_key: Some("test-key".to_string()),
            retry: RetryPolicy::with_max_attempts(3),
            ..ClientConfig::default()
        },
    )
}

pub fn sample_image() -> InlineData {
    InlineData {
        mime_type: "image/jpeg".to_string(),
        data: "/9j/4AAQSkZJRg==".to_string(),
    }
}
