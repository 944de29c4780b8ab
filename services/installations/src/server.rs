//! The HTTP endpoint: credentials in, rendered installations out.

use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use octocat::{AppIdentity, GithubApi};
use tower_http::trace::TraceLayer;

use crate::aggregate::resolve_all;
use crate::error::RequestError;
use crate::render::{Format, RenderOptions};
use crate::resolver::InstallationResolver;

/// Header carrying the numeric Github App ID.
pub const APP_ID_HEADER: &str = "X-App-Id";

/// Header carrying the App's PEM private key, base64 encoded.
pub const PRIVATE_KEY_HEADER: &str = "X-Private-Key";

/// Header selecting the output format, see [`Format::from_header`].
pub const FORMAT_HEADER: &str = "X-Resp-Format";

/// State shared by every request.
///
/// Holds no credentials: each request brings its own App identity.
#[derive(Debug, Clone)]
pub struct AppState {
    github: GithubApi,
    resolve_timeout: Option<Duration>,
    render: RenderOptions,
}

impl AppState {
    /// Serve installations fetched through `github`.
    pub fn new(github: GithubApi) -> Self {
        Self {
            github,
            resolve_timeout: None,
            render: RenderOptions::default(),
        }
    }

    /// Deadline for fetching the repositories of each installation.
    pub fn resolve_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    /// Options for the Markdown formats.
    pub fn render_options(mut self, options: RenderOptions) -> Self {
        self.render = options;
        self
    }

    /// Build the router serving this state.
    pub fn router(self) -> Router {
        Router::new()
            .route("/", get(list_installations))
            .layer(TraceLayer::new_for_http())
            .with_state(self)
    }
}

fn identity(headers: &HeaderMap) -> Result<AppIdentity, RequestError> {
    let app_id = headers.get(APP_ID_HEADER).filter(|value| !value.is_empty());
    let key = headers
        .get(PRIVATE_KEY_HEADER)
        .filter(|value| !value.is_empty());

    let (Some(app_id), Some(key)) = (app_id, key) else {
        return Err(RequestError::MissingHeaders);
    };

    let app_id = String::from_utf8_lossy(app_id.as_bytes());
    let issuer_id: u64 = app_id
        .parse()
        .map_err(|_| RequestError::InvalidAppId(app_id.to_string()))?;

    let key = STANDARD
        .decode(key.as_bytes())
        .map_err(RequestError::InvalidPrivateKey)?;

    Ok(AppIdentity::new(issuer_id, key))
}

async fn list_installations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, RequestError> {
    let identity = identity(&headers)?;
    let format = Format::from_header(
        headers
            .get(FORMAT_HEADER)
            .and_then(|value| value.to_str().ok()),
    );

    let app = state.github.app(identity);
    let installations = app.installations().await?;
    let count = installations.len();

    let resolver = InstallationResolver::new(app).with_timeout(state.resolve_timeout);
    let summaries = resolve_all(&resolver, installations).await;
    tracing::debug!(
        app = resolver.app().app_id(),
        installations = count,
        ?format,
        "Resolved installations"
    );

    let body = state.render.render(format, &summaries)?;
    Ok(([(header::CONTENT_TYPE, format.content_type())], body).into_response())
}
