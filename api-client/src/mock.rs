//! An in-process stand-in for a remote API, for use in tests.
//!
//! Responses are registered per path (optionally including the query string), and can be
//! narrowed to a specific `Authorization` header. Requests with no registered response get
//! a `404`. Every request is recorded so tests can assert on what was (or wasn't) sent.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::response;
use parking_lot::Mutex;

use crate::BoxFuture;

#[derive(Debug, Clone)]
struct MockResponse {
    status: http::StatusCode,
    headers: http::HeaderMap,
    body: Bytes,
    delay: Option<Duration>,
}

/// A request seen by a [`MockService`].
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// Request method.
    pub method: http::Method,

    /// Request path and query.
    pub path: String,

    /// The `Authorization` header, if one was sent.
    pub authorization: Option<String>,
}

/// A tower service which answers with canned responses.
#[derive(Debug, Default, Clone)]
pub struct MockService {
    responses: HashMap<String, MockResponse>,
    authorized: HashMap<(String, String), MockResponse>,
    requests: Arc<Mutex<Vec<MockRequest>>>,
}

impl MockService {
    /// Create a mock with no registered responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a response for a path.
    pub fn add(
        &mut self,
        path: &str,
        status: http::StatusCode,
        headers: http::HeaderMap,
        body: Vec<u8>,
    ) {
        let response = MockResponse {
            status,
            headers,
            body: body.into(),
            delay: None,
        };
        self.responses.insert(path.to_owned(), response);
    }

    /// Register a JSON response for a path.
    pub fn json(&mut self, path: &str, status: http::StatusCode, body: serde_json::Value) {
        self.add(path, status, json_headers(), body.to_string().into_bytes());
    }

    /// Register a JSON response for a path, only used when the request carries
    /// `Authorization: Bearer {token}`.
    pub fn json_for_token(
        &mut self,
        path: &str,
        token: &str,
        status: http::StatusCode,
        body: serde_json::Value,
    ) {
        let response = MockResponse {
            status,
            headers: json_headers(),
            body: body.to_string().into(),
            delay: None,
        };
        self.authorized
            .insert((path.to_owned(), format!("Bearer {token}")), response);
    }

    /// Hold back every response registered for `path` by `delay`.
    pub fn delay(&mut self, path: &str, delay: Duration) {
        if let Some(response) = self.responses.get_mut(path) {
            response.delay = Some(delay);
        }
        for ((registered, _), response) in self.authorized.iter_mut() {
            if registered == path {
                response.delay = Some(delay);
            }
        }
    }

    /// Requests seen so far, in arrival order.
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().clone()
    }

    fn lookup(
        &self,
        path_and_query: &str,
        path: &str,
        authorization: Option<&str>,
    ) -> Option<&MockResponse> {
        if let Some(authorization) = authorization {
            for candidate in [path_and_query, path] {
                let key = (candidate.to_owned(), authorization.to_owned());
                if let Some(response) = self.authorized.get(&key) {
                    return Some(response);
                }
            }
        }

        self.responses
            .get(path_and_query)
            .or_else(|| self.responses.get(path))
    }
}

fn json_headers() -> http::HeaderMap {
    let mut headers = http::HeaderMap::new();
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    headers
}

impl tower::Service<http::Request<hyperdriver::Body>> for MockService {
    type Response = http::Response<hyperdriver::Body>;
    type Error = hyperdriver::client::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<hyperdriver::Body>) -> Self::Future {
        let path = req.uri().path().to_owned();
        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_owned())
            .unwrap_or_else(|| path.clone());
        let authorization = req
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);

        self.requests.lock().push(MockRequest {
            method: req.method().clone(),
            path: path_and_query.clone(),
            authorization: authorization.clone(),
        });

        let response = self
            .lookup(&path_and_query, &path, authorization.as_deref())
            .cloned()
            .unwrap_or_else(|| MockResponse {
                status: http::StatusCode::NOT_FOUND,
                headers: http::HeaderMap::new(),
                body: Bytes::from(format!("No response configured for path: {path_and_query}")),
                delay: None,
            });

        Box::pin(async move {
            if let Some(delay) = response.delay {
                tokio::time::sleep(delay).await;
            }

            let mut builder = response::Builder::new()
                .status(response.status)
                .version(http::Version::HTTP_11);

            for (key, value) in response.headers.iter() {
                builder = builder.header(key, value);
            }

            let response = builder
                .body(hyperdriver::Body::from(response.body))
                .expect("mock responses are valid");

            Ok(response)
        })
    }
}
