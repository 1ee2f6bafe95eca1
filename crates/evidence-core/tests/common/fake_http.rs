//! Scripted [`HttpFetch`] for resolver tests
//!
//! Unscripted URLs answer 404. Every request is recorded with the (paused)
//! tokio clock time it was issued at.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use evidence_core::http::{HttpError, HttpFetch, HttpResponse};
use tokio::time::Instant;

/// One scripted answer
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    Pdf,
    Html(String),
    Json(String),
    Xml(String),
    Redirect(String),
    RateLimited(Option<Duration>),
    /// Answer after a delay
    Delayed(Duration, Box<Reply>),
}

#[derive(Default)]
pub struct FakeHttp {
    /// Replies consumed in order; the last one repeats
    script: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<(String, Instant)>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, url: &str, reply: Reply) -> Self {
        self.push(url, reply);
        self
    }

    pub fn push(&self, url: &str, reply: Reply) {
        self.script
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Every requested URL, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Times at which `url` was requested
    pub fn request_times(&self, url: &str) -> Vec<Instant> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn hits(&self, url: &str) -> usize {
        self.request_times(url).len()
    }

    fn next_reply(&self, url: &str) -> Option<Reply> {
        let mut script = self.script.lock().unwrap();
        let queue = script.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

fn response(url: &str, status: u16, content_type: &str, body: Vec<u8>) -> HttpResponse {
    let mut headers = HashMap::new();
    headers.insert("content-type".to_string(), content_type.to_string());
    HttpResponse {
        status,
        body,
        headers,
        url: url.to_string(),
    }
}

fn answer(url: &str, reply: Reply) -> Result<HttpResponse, HttpError> {
    match reply {
        Reply::Status(status) => Ok(response(url, status, "text/plain", Vec::new())),
        Reply::Pdf => Ok(response(
            url,
            200,
            "application/pdf",
            b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n%%EOF".to_vec(),
        )),
        Reply::Html(body) => Ok(response(url, 200, "text/html; charset=utf-8", body.into_bytes())),
        Reply::Json(body) => Ok(response(url, 200, "application/json", body.into_bytes())),
        Reply::Xml(body) => Ok(response(url, 200, "text/xml", body.into_bytes())),
        Reply::Redirect(location) => {
            let mut redirect = response(url, 302, "text/html", Vec::new());
            redirect.headers.insert("location".to_string(), location);
            Ok(redirect)
        }
        Reply::RateLimited(retry_after) => Err(HttpError::RateLimited { retry_after }),
        Reply::Delayed(_, reply) => answer(url, *reply),
    }
}

#[async_trait]
impl HttpFetch for FakeHttp {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse, HttpError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));

        let Some(reply) = self.next_reply(url) else {
            return Ok(response(url, 404, "text/plain", Vec::new()));
        };
        if let Reply::Delayed(delay, _) = &reply {
            tokio::time::sleep(*delay).await;
        }
        answer(url, reply)
    }
}
