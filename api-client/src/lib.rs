//! A small client for JSON APIs spoken over HTTP / HTTPS.
//!
//! [`ApiClient`] pairs a base URI and an [`Authentication`] mechanism with a shared
//! `hyperdriver` transport. Clients with different credentials can be derived from
//! one another with [`ApiClient::with_authentication`] and keep sharing the transport.

use std::future::Future;
use std::sync::Arc;

use http::Method;
use http::Uri;
use hyperdriver::service::SharedService;
pub use secret::{Secret, SecretBytes};
use tower::ServiceExt;

mod authentication;
mod error;
pub mod mock;
mod paginate;
pub mod request;
pub mod response;
pub mod uri;

pub use self::authentication::{set_authorization, Authentication, BearerAuth};
pub use self::error::{Error, HttpResponseError};
pub use self::paginate::{next_link, Paginator};
pub use self::request::RequestBuilder;
use self::response::ApiResponse;
use self::uri::UriExtension as _;

/// The transport shared by every client derived from the same configuration.
pub type SharedClient = hyperdriver::client::SharedClientService<hyperdriver::Body, hyperdriver::Body>;

/// Boxed error used where the concrete error type is erased.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed, sendable future.
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Erase the type of a transport service so that it can be shared between clients.
pub fn shared_client<S>(inner: S) -> SharedClient
where
    S: tower::Service<
            http::Request<hyperdriver::Body>,
            Response = http::Response<hyperdriver::Body>,
            Error = hyperdriver::client::Error,
        > + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    tower::ServiceBuilder::new()
        .layer(SharedService::layer())
        .service(inner)
}

/// A client for accessing APIs over HTTP / HTTPS
///
/// Useful inner object to wrap for individual API clients.
#[derive(Debug)]
pub struct ApiClient<A> {
    base: Uri,
    inner: SharedClient,
    authentication: Arc<A>,
}

impl<A> Clone for ApiClient<A> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            inner: self.inner.clone(),
            authentication: self.authentication.clone(),
        }
    }
}

impl<A> ApiClient<A> {
    /// Create a new API Client from a base URL, an authentication method and a shared transport.
    pub fn new(base: Uri, authentication: A, inner: SharedClient) -> Self {
        ApiClient {
            base,
            inner,
            authentication: Arc::new(authentication),
        }
    }

    /// Create a new API Client which sends requests through an arbitrary service.
    pub fn new_with_inner_service<S>(base: Uri, authentication: A, inner: S) -> Self
    where
        S: tower::Service<
                http::Request<hyperdriver::Body>,
                Response = http::Response<hyperdriver::Body>,
                Error = hyperdriver::client::Error,
            > + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        Self::new(base, authentication, shared_client(inner))
    }

    /// Derive a client that uses different credentials over the same transport and base URI.
    pub fn with_authentication<B>(&self, authentication: B) -> ApiClient<B> {
        ApiClient {
            base: self.base.clone(),
            inner: self.inner.clone(),
            authentication: Arc::new(authentication),
        }
    }

    /// The base URI which endpoints are joined onto.
    pub fn base(&self) -> &Uri {
        &self.base
    }

    /// The authentication mechanism used by this client.
    pub fn auth(&self) -> &A {
        &self.authentication
    }

    fn request(&self, endpoint: &str, method: Method) -> RequestBuilder<A> {
        let url = self.base.clone().join(endpoint);
        RequestBuilder::new(self.clone(), url, method)
    }

    /// Build a GET request against an endpoint relative to the base URI.
    pub fn get(&self, endpoint: &str) -> RequestBuilder<A> {
        self.request(endpoint, Method::GET)
    }

    /// Build a POST request against an endpoint relative to the base URI.
    pub fn post(&self, endpoint: &str) -> RequestBuilder<A> {
        self.request(endpoint, Method::POST)
    }
}

impl<A> ApiClient<A>
where
    A: Authentication,
{
    /// Authenticate and send a request.
    pub async fn execute(&self, req: http::Request<hyperdriver::Body>) -> Result<ApiResponse, Error> {
        let req = self
            .authentication
            .authenticate(req)
            .map_err(|error| Error::Authentication(Box::new(error)))?;

        let parts = request_parts(&req);
        let response = self.inner.clone().oneshot(req).await?;
        Ok(ApiResponse::new(parts, response))
    }
}

fn request_parts<B>(req: &http::Request<B>) -> http::request::Parts {
    let (mut parts, ()) = http::Request::new(()).into_parts();
    parts.method = req.method().clone();
    parts.uri = req.uri().clone();
    parts.version = req.version();
    parts.headers = req.headers().clone();
    parts
}
