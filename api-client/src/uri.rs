//! URI utilities.

use camino::Utf8Path;
use http::Uri;
use thiserror::Error;
use url::Url;

/// Errors that can occur when parsing a base URI.
#[derive(Debug, Error)]
pub enum ParseUriError {
    /// An error occurred while parsing the URL.
    #[error(transparent)]
    Url(#[from] url::ParseError),

    /// The provided URL cannot be a base URL,
    /// and so is not valid as the base part of an API URL.
    #[error("cannot be a base URL: {0}")]
    CannotBeABase(Url),

    /// The URI is invalid, but URL parsing succeded.
    #[error("invalid URI: {0}")]
    Invalid(#[from] http::uri::InvalidUri),
}

/// Parse a string into a URI suitable as the base of an API client.
///
/// Bases always end with a `/` so that relative endpoints are
/// appended instead of replacing the last path segment.
pub fn parse_base(base: &str) -> Result<Uri, ParseUriError> {
    let mut url: Url = base.parse()?;
    if url.cannot_be_a_base() {
        return Err(ParseUriError::CannotBeABase(url));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url.as_str().parse()?)
}

/// Extension trait for URIs.
pub trait UriExtension {
    /// Join a path to a URI.
    fn join<P: AsRef<str>>(self, path: P) -> Uri;

    /// Replace a query parameter in a URI.
    fn replace_query(self, key: &str, value: &str) -> Uri;
}

impl UriExtension for Uri {
    fn join<P: AsRef<str>>(self, path: P) -> Uri {
        let mut parts = self.into_parts();

        parts.path_and_query = parts.path_and_query.as_ref().map(|pq| {
            let joined = Utf8Path::new(pq.path()).join(path.as_ref());
            http::uri::PathAndQuery::from_maybe_shared(joined.to_string())
                .expect("joined paths are valid URI paths")
        });
        Uri::from_parts(parts).expect("joined URI is valid")
    }

    fn replace_query(self, key: &str, value: &str) -> Uri {
        let Ok(mut url) = Url::parse(&self.to_string()) else {
            return self;
        };

        // Get a copy of the current query pairs without the target key.
        let current = url
            .query_pairs()
            .filter(|(k, _)| k != key)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect::<Vec<_>>();

        {
            let mut query = url.query_pairs_mut();
            query.clear().extend_pairs(current).append_pair(key, value);
        }

        url.as_str().parse().unwrap_or(self)
    }
}
