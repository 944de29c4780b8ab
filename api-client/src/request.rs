use http::{Method, Uri};

use crate::error::Error;
use crate::paginate::{next_link, Paginator};
use crate::uri::UriExtension as _;
use crate::{response::ApiResponse, ApiClient, Authentication};

/// Builder for a single API call against an [`ApiClient`].
///
/// The builder keeps its parts (rather than an `http::request::Builder`) so that
/// the same call can be replayed against the following pages of a paginated endpoint.
#[derive(Debug)]
pub struct RequestBuilder<A> {
    client: ApiClient<A>,
    method: Method,
    uri: Uri,
    max_pages: Option<usize>,
}

impl<A> RequestBuilder<A> {
    /// Start a new request for `method` on `uri`.
    pub fn new(client: ApiClient<A>, uri: Uri, method: Method) -> Self {
        Self {
            client,
            method,
            uri,
            max_pages: None,
        }
    }

    /// Set (or replace) a query parameter.
    pub fn query(mut self, key: &str, value: impl std::fmt::Display) -> Self {
        self.uri = self.uri.replace_query(key, &value.to_string());
        self
    }

    /// Stop following `Link` headers after this many pages.
    pub fn max_pages(mut self, pages: usize) -> Self {
        self.max_pages = Some(pages);
        self
    }

    fn build(&self, uri: Uri) -> Result<http::Request<hyperdriver::Body>, Error> {
        let req = http::Request::builder()
            .method(self.method.clone())
            .uri(uri)
            .body(hyperdriver::Body::empty())?;
        Ok(req)
    }

    async fn send_to(&self, uri: Uri) -> Result<ApiResponse, Error>
    where
        A: Authentication,
    {
        let req = self.build(uri)?;
        self.client.execute(req).await
    }

    /// Send the request, returning the response regardless of its status.
    pub async fn send(self) -> Result<ApiResponse, Error>
    where
        A: Authentication,
    {
        self.send_to(self.uri.clone()).await
    }

    /// Send the request and decode a successful JSON response.
    pub async fn json<T>(self) -> Result<T, Error>
    where
        A: Authentication,
        T: serde::de::DeserializeOwned,
    {
        let response = self.send().await?.error_for_status().await?;
        response.json().await
    }

    /// Send the request, then follow `rel="next"` links and gather the items of every page.
    pub async fn paginate<P>(self) -> Result<Vec<P::Item>, Error>
    where
        A: Authentication,
        P: Paginator + serde::de::DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut next = Some(self.uri.clone());
        let mut pages = 0usize;

        while let Some(uri) = next.take() {
            if self.max_pages.is_some_and(|max| pages >= max) {
                tracing::debug!(uri = %uri, pages, "Stopping pagination at page limit");
                break;
            }

            let response = self.send_to(uri).await?.error_for_status().await?;
            next = next_link(response.headers());

            let mut page: P = response.json().await?;
            items.extend(page.items());
            pages += 1;
        }

        tracing::trace!(pages, items = items.len(), "Collected paginated response");
        Ok(items)
    }
}
