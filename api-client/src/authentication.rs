//! Authentication for API clients.
//!
//! The `Authentication` trait is used to authenticate with an API queried via the `ApiClient`.
//! It runs once per outgoing request, just before the request is sent, so implementations
//! can mint a fresh credential for every call.
//!
//! Two implementations are provided:
//! - `BearerAuth` for a static Bearer token
//! - `()` for no authentication

use std::convert::Infallible;
use std::sync::Arc;

use http::header::InvalidHeaderValue;
use http::HeaderValue;
use secret::Secret;

/// Trait to represent authenticating requests sent by an [`ApiClient`](crate::ApiClient).
pub trait Authentication {
    /// Error produced when credentials can't be attached.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Called by the `ApiClient` to implement authorization.
    fn authenticate<B>(&self, req: http::Request<B>) -> Result<http::Request<B>, Self::Error>;
}

impl<A> Authentication for Arc<A>
where
    A: Authentication,
{
    type Error = A::Error;

    fn authenticate<B>(&self, req: http::Request<B>) -> Result<http::Request<B>, Self::Error> {
        (**self).authenticate(req)
    }
}

/// Attach an authorization header unless the request already carries one.
pub fn set_authorization<B>(mut req: http::Request<B>, value: HeaderValue) -> http::Request<B> {
    if !req.headers().contains_key(http::header::AUTHORIZATION) {
        req.headers_mut()
            .insert(http::header::AUTHORIZATION, value);
    } else {
        tracing::warn!("{} header already set", http::header::AUTHORIZATION);
    }
    req
}

/// Authentication with a bearer token, often used with an API key.
///
/// The token is stored as a [Secret] to prevent it from being logged.
///
/// # Example
/// ```rust
/// use api_client::BearerAuth;
///
/// let auth = BearerAuth::new("my-secret");
/// let header = auth.header_value().unwrap();
///
/// assert_eq!(header.to_str().unwrap(), "Bearer my-secret");
/// ```
#[derive(Debug, Clone)]
pub struct BearerAuth(Secret);

impl BearerAuth {
    /// Create a new Bearer authentication with a given key.
    pub fn new<K: Into<Secret>>(key: K) -> Self {
        BearerAuth(key.into())
    }

    /// Get the header value for the Bearer token.
    pub fn header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        self.0.bearer()
    }
}

impl Authentication for BearerAuth {
    type Error = InvalidHeaderValue;

    fn authenticate<B>(&self, req: http::Request<B>) -> Result<http::Request<B>, Self::Error> {
        Ok(set_authorization(req, self.header_value()?))
    }
}

impl Authentication for () {
    type Error = Infallible;

    fn authenticate<B>(&self, req: http::Request<B>) -> Result<http::Request<B>, Self::Error> {
        Ok(req)
    }
}
