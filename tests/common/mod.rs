//! Common test utilities: a scripted transport and provider fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use seeker::llm::transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use seeker::llm::{ProviderConfig, ProviderRegistry, WireFormat};
use seeker::prompt::Prompt;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// One scripted reply for a URL
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, String),
    Error(TransportError),
    /// Never answers; only cancellation gets the caller out
    Hang,
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Reply::Status(200, body.to_string())
    }

    pub fn chat(text: &str) -> Self {
        Reply::ok(&serde_json::json!({ "choices": [{ "message": { "content": text } }] }).to_string())
    }

    pub fn timeout() -> Self {
        Reply::Error(TransportError::Timeout(Duration::from_secs(30)))
    }
}

/// A request the fake transport saw
#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub url: String,
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
    pub at: Instant,
}

/// Transport that answers from per-URL scripts and records every call.
///
/// The last reply of a script repeats once the queue is down to it. URLs with
/// no script fail with a connection error.
#[derive(Clone, Default)]
pub struct FakeTransport {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Reply>>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, url: &str, replies: Vec<Reply>) -> &Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), replies.into());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.url == url).collect()
    }

    fn next_reply(&self, url: &str) -> Option<Reply> {
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push(Call {
            method: request.method,
            url: request.url.clone(),
            bearer: request.bearer.clone(),
            body: request.body.clone(),
            at: Instant::now(),
        });

        match self.next_reply(&request.url) {
            Some(Reply::Status(status, body)) => Ok(HttpResponse {
                status,
                content_type: Some("application/json".to_string()),
                body,
            }),
            Some(Reply::Error(err)) => Err(err),
            Some(Reply::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            None => Err(TransportError::Connect(format!("no script for {}", request.url))),
        }
    }
}

/// A chat-completions provider at `http://{name}.test`
pub fn chat_provider(name: &str) -> ProviderConfig {
    ProviderConfig {
        name: name.to_string(),
        endpoint_base_url: format!("http://{name}.test"),
        auth_token: Some(format!("{name}-token")),
        default_model: format!("{name}-model"),
        wire_format: WireFormat::ChatCompletions,
        timeout: Duration::from_secs(30),
        probe_timeout: Duration::from_secs(3),
        requires_auth: true,
        temperature: 0.7,
        max_tokens: 512,
    }
}

/// A local generate-style provider at `http://{name}.test`
pub fn local_provider(name: &str) -> ProviderConfig {
    ProviderConfig {
        auth_token: None,
        default_model: "mistral:latest".to_string(),
        wire_format: WireFormat::Generate,
        requires_auth: false,
        ..chat_provider(name)
    }
}

/// Same provider with its secret missing
pub fn without_key(provider: ProviderConfig) -> ProviderConfig {
    ProviderConfig {
        auth_token: None,
        ..provider
    }
}

pub fn registry(providers: Vec<ProviderConfig>) -> Arc<ProviderRegistry> {
    Arc::new(ProviderRegistry::new(providers).expect("valid registry"))
}

pub fn sample_prompt() -> Prompt {
    Prompt {
        system_instruction: "Summarize.".to_string(),
        user_content: "Query: \"rust\" (web)".to_string(),
    }
}
