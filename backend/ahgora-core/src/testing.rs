// src/testing.rs

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::Result;
use crate::http::{HttpClient, HttpResponse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedRequest {
    Get { url: String },
    Post { url: String, form: Vec<(String, String)> },
}

impl RecordedRequest {
    pub fn url(&self) -> &str {
        match self {
            RecordedRequest::Get { url } | RecordedRequest::Post { url, .. } => url,
        }
    }

    pub fn form_value(&self, key: &str) -> Option<&str> {
        match self {
            RecordedRequest::Post { form, .. } => form
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            RecordedRequest::Get { .. } => None,
        }
    }
}

/// Replays queued responses in order and records every request it sees.
#[derive(Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<Mutex<VecDeque<HttpResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, status: u16, body: &str) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(HttpResponse::new(status, body));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next_response(&self, request: RecordedRequest) -> Result<HttpResponse> {
        let url = request.url().to_string();
        self.requests.lock().unwrap().push(request);
        let response = self.responses.lock().unwrap().pop_front();
        Ok(response.unwrap_or_else(|| panic!("MockHttpClient: no response queued for {}", url)))
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.next_response(RecordedRequest::Get {
            url: url.to_string(),
        })
    }

    async fn post(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpResponse> {
        self.next_response(RecordedRequest::Post {
            url: url.to_string(),
            form: form
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }
}
