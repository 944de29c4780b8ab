//! Simple client for using Github Apps with the Github API.
//!
//! There are two kinds of credentials involved:
//!
//! - App-level calls (listing installations, exchanging installation tokens) are
//!   authenticated with a short lived JWT signed by the App's private key, see [`assertion`].
//! - Installation-level calls (listing the repositories an installation can see) are
//!   authenticated with an installation access token obtained from the App.
//!
//! [`GithubApi`] holds the credential free transport; [`GithubApp`] binds it to an App
//! identity, and [`InstallationClient`] to one installation's token.

use api_client::{ApiClient, SharedClient};
use http::Uri;
use thiserror::Error;

pub mod assertion;
mod config;
pub mod models;

pub use crate::assertion::{
    sign, AppAssertion, AppAuthenticator, AppIdentity, CredentialError, KeyParseError,
    SigningError,
};
pub use crate::config::{GithubConfig, Pagination};
use crate::assertion::AuthenticateError;
use crate::models::{Installation, InstallationAccess, Repository, RepositoryList};

/// Errors that can occur when using the Github client.
#[derive(Debug, Error)]
pub enum Error {
    /// The App's credentials could not be turned into an assertion.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Sending the request, or reading its response, failed; or Github answered with an error.
    #[error(transparent)]
    Api(api_client::Error),
}

impl Error {
    /// The HTTP status Github answered with, if the failure was an error response.
    pub fn status(&self) -> Option<http::StatusCode> {
        match self {
            Error::Api(error) => error.status(),
            Error::Credential(_) => None,
        }
    }
}

impl From<api_client::Error> for Error {
    fn from(error: api_client::Error) -> Self {
        match error {
            api_client::Error::Authentication(source) => {
                match source.downcast::<AuthenticateError>() {
                    Ok(auth) => match *auth {
                        AuthenticateError::Credential(error) => Error::Credential(error),
                        other => Error::Api(api_client::Error::Authentication(Box::new(other))),
                    },
                    Err(source) => Error::Api(api_client::Error::Authentication(source)),
                }
            }
            other => Error::Api(other),
        }
    }
}

/// Unauthenticated access to a Github API host.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct GithubApi {
    client: ApiClient<()>,
    pagination: Pagination,
}

impl GithubApi {
    /// Bind a transport to an API base.
    pub fn new(base: Uri, transport: SharedClient, pagination: Pagination) -> Self {
        Self {
            client: ApiClient::new(base, (), transport),
            pagination,
        }
    }

    /// Use an arbitrary tower service as the transport, e.g. [`api_client::mock::MockService`].
    pub fn with_service<S>(base: Uri, service: S) -> Self
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
        Self::new(base, api_client::shared_client(service), Pagination::default())
    }

    /// Change how list endpoints are paged through.
    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// The API base.
    pub fn base(&self) -> &Uri {
        self.client.base()
    }

    /// Act as the App identified by `identity`.
    pub fn app(&self, identity: AppIdentity) -> GithubApp {
        GithubApp {
            client: self
                .client
                .with_authentication(AppAuthenticator::new(identity)),
            pagination: self.pagination,
        }
    }
}

/// A Github App client that can be used to authenticate and make requests against the Github API.
///
/// This represents the high level App, not an individual installation.
#[derive(Debug, Clone)]
pub struct GithubApp {
    client: ApiClient<AppAuthenticator>,
    pagination: Pagination,
}

impl GithubApp {
    /// The App ID requests are signed as.
    pub fn app_id(&self) -> u64 {
        self.client.auth().identity().issuer_id()
    }

    /// List all installations for this app
    #[tracing::instrument(skip(self), fields(app = self.app_id()))]
    pub async fn installations(&self) -> Result<Vec<Installation>, Error> {
        let installations = self
            .client
            .get("app/installations")
            .query("per_page", self.pagination.per_page)
            .max_pages(self.pagination.max_pages)
            .paginate::<Vec<Installation>>()
            .await?;

        tracing::debug!("Found {} installations", installations.len());
        Ok(installations)
    }

    /// Exchange the App assertion for an access token scoped to one installation.
    #[tracing::instrument(skip(self), fields(app = self.app_id()))]
    pub async fn installation_token(
        &self,
        installation_id: u64,
    ) -> Result<InstallationAccess, Error> {
        let access: InstallationAccess = self
            .client
            .post(&format!("app/installations/{installation_id}/access_tokens"))
            .json()
            .await?;

        match access.expires_at {
            Some(expires) => tracing::debug!(
                expires=%expires,
                "Got authentication token for installation",
            ),
            None => tracing::debug!("Got authentication token for installation"),
        }

        Ok(access)
    }

    /// Get a github client with an installation token.
    pub async fn installation(&self, installation_id: u64) -> Result<InstallationClient, Error> {
        let access = self.installation_token(installation_id).await?;
        Ok(InstallationClient {
            client: self.client.with_authentication(access),
            id: installation_id,
            pagination: self.pagination,
        })
    }
}

/// A Github client that makes requests as a single installation.
#[derive(Debug, Clone)]
pub struct InstallationClient {
    client: ApiClient<InstallationAccess>,
    id: u64,
    pagination: Pagination,
}

impl InstallationClient {
    /// The installation ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Check if the installation token is expired.
    pub fn is_expired(&self) -> bool {
        self.client.auth().is_expired()
    }

    /// List the repositories this installation can access, in the order Github returns them.
    #[tracing::instrument(skip(self), fields(installation = self.id))]
    pub async fn repositories(&self) -> Result<Vec<Repository>, Error> {
        let repositories = self
            .client
            .get("installation/repositories")
            .query("per_page", self.pagination.per_page)
            .max_pages(self.pagination.max_pages)
            .paginate::<RepositoryList>()
            .await?;

        tracing::debug!("Found {} repositories", repositories.len());
        Ok(repositories)
    }
}

#[cfg(test)]
mod tests {
    use api_client::mock::MockService;
    use http::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::models::RepositorySelection;

    const KEY: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/test/app-key.pem"));

    fn github(mock: &MockService) -> GithubApi {
        GithubApi::with_service("http://github.test/".parse().unwrap(), mock.clone())
    }

    fn app(mock: &MockService) -> GithubApp {
        github(mock).app(AppIdentity::new(1235, KEY.as_bytes()))
    }

    #[tokio::test]
    async fn list_installations_across_pages() {
        let mut mock = MockService::new();
        let mut headers = http::HeaderMap::new();
        headers.insert(
            http::header::LINK,
            r#"<http://github.test/app/installations?per_page=100&page=2>; rel="next""#
                .parse()
                .unwrap(),
        );
        mock.add(
            "/app/installations?per_page=100",
            StatusCode::OK,
            headers,
            json!([
                {"id": 1, "account": {"login": "orgA", "html_url": "https://github.com/orgA"}, "repository_selection": "all"}
            ])
            .to_string()
            .into_bytes(),
        );
        mock.json(
            "/app/installations?per_page=100&page=2",
            StatusCode::OK,
            json!([
                {"id": 2, "account": {"login": "orgB", "html_url": "https://github.com/orgB"}, "repository_selection": "selected"}
            ]),
        );

        let installations = app(&mock).installations().await.unwrap();
        let ids: Vec<_> = installations.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(
            installations[1].repository_selection(),
            RepositorySelection::Selected
        );

        for request in mock.requests() {
            let auth = request.authorization.unwrap();
            assert!(auth.starts_with("Bearer ey"), "App calls carry a JWT");
        }
    }

    #[tokio::test]
    async fn each_app_call_gets_a_fresh_assertion() {
        let mut mock = MockService::new();
        mock.json("/app/installations", StatusCode::OK, json!([]));

        let app = app(&mock);
        app.installations().await.unwrap();
        app.installations().await.unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|request| request
            .authorization
            .as_deref()
            .is_some_and(|auth| auth.starts_with("Bearer "))));
    }

    #[tokio::test]
    async fn installation_repositories_use_the_installation_token() {
        let mut mock = MockService::new();
        mock.json(
            "/app/installations/7/access_tokens",
            StatusCode::CREATED,
            json!({"token": "ghs_seven", "expires_at": "2099-01-01T00:00:00Z"}),
        );
        mock.json_for_token(
            "/installation/repositories",
            "ghs_seven",
            StatusCode::OK,
            json!({
                "total_count": 2,
                "repositories": [
                    {"name": "one", "html_url": "https://github.com/orgB/one"},
                    {"name": "two", "html_url": "https://github.com/orgB/two"}
                ]
            }),
        );

        let installation = app(&mock).installation(7).await.unwrap();
        assert_eq!(installation.id(), 7);
        assert!(!installation.is_expired());

        let repositories = installation.repositories().await.unwrap();
        let names: Vec<_> = repositories.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["one", "two"]);

        let requests = mock.requests();
        assert_eq!(requests[0].method, http::Method::POST);
        assert_eq!(requests[0].path, "/app/installations/7/access_tokens");
        assert_eq!(
            requests[1].authorization.as_deref(),
            Some("Bearer ghs_seven")
        );
    }

    #[tokio::test]
    async fn error_responses_keep_status_and_message() {
        let mut mock = MockService::new();
        mock.json(
            "/app/installations",
            StatusCode::UNAUTHORIZED,
            json!({"message": "A JSON web token could not be decoded"}),
        );

        let error = app(&mock).installations().await.unwrap_err();
        assert_eq!(error.status(), Some(StatusCode::UNAUTHORIZED));
        assert!(error
            .to_string()
            .contains("A JSON web token could not be decoded"));
    }

    #[tokio::test]
    async fn bad_keys_fail_before_any_request() {
        let mock = MockService::new();
        let app = github(&mock).app(AppIdentity::new(1235, b"not a key".as_slice()));

        let error = app.installations().await.unwrap_err();
        assert!(matches!(
            error,
            Error::Credential(CredentialError::KeyParse(_))
        ));
        assert!(mock.requests().is_empty());
    }
}
