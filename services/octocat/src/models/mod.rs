//! Github API object models.
//!
//! Only the fields this crate reads are modelled. Fields which Github documents as
//! nullable (or which have been observed missing) are optional, so a sparse payload
//! never fails to decode.

use api_client::{set_authorization, Authentication, Paginator, Secret};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Github API response for a single installation.
#[derive(Debug, Clone, Deserialize)]
pub struct Installation {
    /// Installation ID.
    pub id: u64,

    /// Account associated with the installation.
    #[serde(default)]
    pub account: Option<Account>,

    /// Which of the account's repositories the installation can access.
    #[serde(default)]
    pub repository_selection: Option<RepositorySelection>,
}

impl Installation {
    /// The account login, or an empty string when Github didn't send one.
    pub fn account_login(&self) -> &str {
        self.account
            .as_ref()
            .and_then(|account| account.login.as_deref())
            .unwrap_or_default()
    }

    /// The account's profile URL, or an empty string when Github didn't send one.
    pub fn account_url(&self) -> &str {
        self.account
            .as_ref()
            .and_then(|account| account.html_url.as_deref())
            .unwrap_or_default()
    }

    /// Repository selection, treating a missing value as unknown.
    pub fn repository_selection(&self) -> RepositorySelection {
        self.repository_selection.unwrap_or_default()
    }
}

/// Account associated with an installation.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    /// Account ID.
    #[serde(default)]
    pub id: Option<i64>,

    /// Account login.
    #[serde(default)]
    pub login: Option<String>,

    /// Account profile page.
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Whether an installation grants access to every repository of the account, or to a chosen few.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositorySelection {
    /// Every repository, including ones created later.
    All,

    /// An explicit list of repositories.
    Selected,

    /// Anything Github may add later, or a missing value.
    #[default]
    #[serde(other)]
    Unknown,
}

impl RepositorySelection {
    /// The wire name of this selection mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            RepositorySelection::All => "all",
            RepositorySelection::Selected => "selected",
            RepositorySelection::Unknown => "unknown",
        }
    }
}

/// A repository visible to an installation.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    /// Repository ID.
    #[serde(default)]
    pub id: Option<u64>,

    /// Short repository name.
    #[serde(default)]
    pub name: Option<String>,

    /// `owner/name`.
    #[serde(default)]
    pub full_name: Option<String>,

    /// Repository web page.
    #[serde(default)]
    pub html_url: Option<String>,
}

impl Repository {
    /// The repository name, or an empty string when Github didn't send one.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// The repository web page, or an empty string when Github didn't send one.
    pub fn html_url(&self) -> &str {
        self.html_url.as_deref().unwrap_or_default()
    }
}

/// One page of `GET /installation/repositories`.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryList {
    /// Number of repositories across all pages.
    #[serde(default)]
    pub total_count: Option<u64>,

    /// Repositories on this page.
    #[serde(default)]
    pub repositories: Vec<Repository>,
}

impl Paginator for RepositoryList {
    type Item = Repository;

    fn items(&mut self) -> Vec<Self::Item> {
        std::mem::take(&mut self.repositories)
    }
}

/// API credentials for access to a Github installation.
///
/// Used as a static bearer credential: no refresh is attempted, and a token which
/// Github rejects surfaces as an ordinary response error.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationAccess {
    /// Installation access token
    pub(crate) token: Secret,

    /// Token expiration time.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl InstallationAccess {
    /// Check if the access token is expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires| expires < Utc::now())
    }
}

impl Authentication for InstallationAccess {
    type Error = http::header::InvalidHeaderValue;

    fn authenticate<B>(&self, req: http::Request<B>) -> Result<http::Request<B>, Self::Error> {
        Ok(set_authorization(req, self.token.bearer()?))
    }
}
