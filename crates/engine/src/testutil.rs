//! Scripted fetch implementation shared by the engine tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use crate::classify::Request;
use crate::fetch::Fetch;
use vigil_core::{Error, ResponseSnapshot};

/// A `Fetch` implementation with per-URL scripted outcomes and call
/// counting. URLs with no script fail like an unreachable host.
pub(crate) struct MockFetch {
    responses: Mutex<HashMap<String, Result<ResponseSnapshot, String>>>,
    calls: Mutex<Vec<String>>,
}

impl MockFetch {
    pub fn new() -> Self {
        Self { responses: Mutex::new(HashMap::new()), calls: Mutex::new(Vec::new()) }
    }

    pub fn respond(&self, url: &Url, snapshot: ResponseSnapshot) {
        self.respond_url(url.as_str(), snapshot);
    }

    pub fn respond_url(&self, url: &str, snapshot: ResponseSnapshot) {
        self.responses.lock().unwrap().insert(url.to_string(), Ok(snapshot));
    }

    pub fn fail(&self, url: &Url) {
        self.fail_url(url.as_str());
    }

    pub fn fail_url(&self, url: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Err("connection reset".to_string()));
    }

    pub fn calls(&self, url: &Url) -> usize {
        let target = url.as_str();
        self.calls.lock().unwrap().iter().filter(|u| u == &target).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetch for MockFetch {
    async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, Error> {
        self.calls.lock().unwrap().push(request.url.to_string());
        match self.responses.lock().unwrap().get(request.url.as_str()) {
            Some(Ok(snapshot)) => Ok(snapshot.clone()),
            Some(Err(reason)) => Err(Error::Network(reason.clone())),
            None => Err(Error::Network(format!("no route to {}", request.url))),
        }
    }
}

/// An ok HTML snapshot with the given body.
pub(crate) fn html_snapshot(body: &str) -> ResponseSnapshot {
    ResponseSnapshot::new(
        200,
        "OK",
        vec![("content-type".to_string(), "text/html".to_string())],
        body.as_bytes().to_vec(),
    )
}

/// A bodyless snapshot with the given status.
pub(crate) fn status_snapshot(status: u16) -> ResponseSnapshot {
    let status_text = match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "",
    };
    ResponseSnapshot::new(status, status_text, Vec::new(), Vec::new())
}
