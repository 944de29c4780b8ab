//! Error types for the installations endpoint

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::render::RenderError;
use crate::server::{APP_ID_HEADER, PRIVATE_KEY_HEADER};

/// Everything which can end a request before a listing is rendered.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// One or both credential headers were not sent.
    #[error("{app_id} and {key} headers are mandatory", app_id = APP_ID_HEADER, key = PRIVATE_KEY_HEADER)]
    MissingHeaders,

    /// The App ID is not an integer.
    #[error("invalid value of {header} header [{0}]. it should be an integer", header = APP_ID_HEADER)]
    InvalidAppId(String),

    /// The private key is not base64.
    #[error("invalid value of {header}. failed to decode", header = PRIVATE_KEY_HEADER)]
    InvalidPrivateKey(#[source] base64::DecodeError),

    /// Listing installations failed, including when no assertion could be signed.
    #[error(transparent)]
    Github(#[from] octocat::Error),

    /// The summaries could not be encoded.
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl RequestError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::MissingHeaders
            | RequestError::InvalidAppId(_)
            | RequestError::InvalidPrivateKey(_) => StatusCode::BAD_REQUEST,
            RequestError::Github(_) | RequestError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {message}");
        } else {
            tracing::warn!(status = status.as_u16(), "Request rejected: {message}");
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}
