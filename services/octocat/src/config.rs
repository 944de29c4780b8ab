use std::time::Duration;

use api_client::uri::{parse_base, ParseUriError};
use http::header;
use http::HeaderValue;
use hyperdriver::client::conn::transport::tcp::TcpTransportConfig;
use hyperdriver::Client;
use serde::Deserialize;

use crate::GithubApi;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const GITHUB_API_VERSION_HEADER: &str = "x-github-api-version";

/// Configuration for talking to the Github REST API.
///
/// Every field has a default, so an empty table is a valid configuration for github.com.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// Base URL of the REST API. Github Enterprise uses `https://{host}/api/v3/`.
    pub api_base: String,

    /// `User-Agent` sent with every request; Github rejects requests without one.
    pub user_agent: String,

    /// TCP connect timeout, in seconds.
    pub connect_timeout: u64,

    /// Timeout for each individual request, in seconds.
    pub timeout: u64,

    /// Page size requested from paginated endpoints (Github caps this at 100).
    pub per_page: u8,

    /// Maximum number of pages followed on a paginated endpoint.
    pub max_pages: usize,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com/".into(),
            user_agent: concat!("octocat-installations/", env!("CARGO_PKG_VERSION")).into(),
            connect_timeout: 30,
            timeout: 60,
            per_page: 100,
            max_pages: 10,
        }
    }
}

impl GithubConfig {
    /// Parse the configured API base.
    pub fn base(&self) -> Result<http::Uri, ParseUriError> {
        parse_base(&self.api_base)
    }

    /// Build the (credential free) transport and bind it to the configured API base.
    pub fn connect(&self) -> Result<GithubApi, ParseUriError> {
        let base = self.base()?;

        let mut tcp = TcpTransportConfig::default();
        tcp.connect_timeout = Some(Duration::from_secs(self.connect_timeout));

        let client = Client::builder()
            .layer(
                tower_http::set_header::SetRequestHeaderLayer::if_not_present(
                    header::ACCEPT,
                    HeaderValue::from_static(GITHUB_ACCEPT),
                ),
            )
            .layer(
                tower_http::set_header::SetRequestHeaderLayer::if_not_present(
                    header::HeaderName::from_static(GITHUB_API_VERSION_HEADER),
                    HeaderValue::from_static(GITHUB_API_VERSION),
                ),
            )
            .with_tcp(tcp)
            .with_auto_http()
            .with_user_agent(self.user_agent.clone())
            .with_timeout(Duration::from_secs(self.timeout))
            .build_service();

        Ok(GithubApi::new(base, client, self.pagination()))
    }

    pub(crate) fn pagination(&self) -> Pagination {
        Pagination {
            per_page: self.per_page.clamp(1, 100),
            max_pages: self.max_pages.max(1),
        }
    }
}

/// How list endpoints are paged through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Items per page.
    pub per_page: u8,

    /// Pages followed before giving up.
    pub max_pages: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        GithubConfig::default().pagination()
    }
}
