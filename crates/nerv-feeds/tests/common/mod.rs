#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use nerv_feeds::{FeedError, Result, Transport};
use serde_json::Value;

/// Canned HTTP responses keyed by URL, plus a queue for JSON POSTs.
#[derive(Default)]
pub struct FakeTransport {
    pages: Mutex<HashMap<String, std::result::Result<Vec<u8>, u16>>>,
    json: Mutex<VecDeque<std::result::Result<Value, u16>>>,
    pub gets: Mutex<Vec<String>>,
    pub posts: Mutex<Vec<RecordedPost>>,
}

#[derive(Debug, Clone)]
pub struct RecordedPost {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl FakeTransport {
    pub fn serve(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(body.into()));
        self
    }

    pub fn fail(self, url: &str, status: u16) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), Err(status));
        self
    }

    pub fn queue_json(self, value: Value) -> Self {
        self.json.lock().unwrap().push_back(Ok(value));
        self
    }

    pub fn queue_status(self, status: u16) -> Self {
        self.json.lock().unwrap().push_back(Err(status));
        self
    }

    pub fn get_count(&self, url: &str) -> usize {
        self.gets.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn recorded_posts(&self) -> Vec<RecordedPost> {
        self.posts.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    fn get(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>> {
        self.gets.lock().unwrap().push(url.to_string());
        match self.pages.lock().unwrap().get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(FeedError::Status {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(FeedError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &Value,
        _timeout: Duration,
    ) -> Result<Value> {
        self.posts.lock().unwrap().push(RecordedPost {
            url: url.to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            body: body.clone(),
        });
        match self.json.lock().unwrap().pop_front() {
            Some(Ok(value)) => Ok(value),
            Some(Err(status)) => Err(FeedError::Status {
                url: url.to_string(),
                status,
            }),
            None => Err(FeedError::Status {
                url: url.to_string(),
                status: 500,
            }),
        }
    }
}
