//! Error types for API Clients
use std::fmt;

use http::StatusCode;
use thiserror::Error;

use crate::response::ApiResponse;
use crate::BoxError;

/// An error occured while sending or recieving an HTTP request
#[derive(Debug, Error)]
pub enum Error {
    /// The request could not be assembled (bad header, bad URI).
    #[error("Building request: {0}")]
    Build(#[from] http::Error),

    /// The authentication mechanism could not produce credentials for the request.
    #[error("Authenticating request: {0}")]
    Authentication(#[source] BoxError),

    /// An error occured while sending the request
    #[error("Sending request: {0}")]
    Request(#[from] hyperdriver::client::Error),

    /// An HTTP response error occured
    #[error(transparent)]
    Response(#[from] HttpResponseError),

    /// An error occured while recieving the response body
    #[error("Error reading response body: {0}")]
    ResponseBody(#[source] BoxError),

    /// The response body was not the expected JSON document.
    #[error("Decoding response body: {0}")]
    Deserialize(#[from] serde_json::Error),
}

impl Error {
    /// The HTTP status of the response which caused this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Response(error) => Some(error.status),
            _ => None,
        }
    }
}

/// A server returned an error response
#[derive(Debug, Clone)]
pub struct HttpResponseError {
    /// The HTTP status code of the response
    pub status: StatusCode,

    /// The message body of the response
    pub message: String,
}

impl HttpResponseError {
    /// Create a new HTTP response error from a response
    pub async fn from_response(response: ApiResponse) -> Self {
        let status = response.status();
        let message = response
            .text()
            .await
            .unwrap_or_else(|err| format!("Failed to read response body: {}", err));

        Self { status, message }
    }
}

impl fmt::Display for HttpResponseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "HTTP {} response: {}", self.status, self.message)
    }
}

impl std::error::Error for HttpResponseError {}
