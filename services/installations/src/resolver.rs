//! Turn one installation into a summary, fetching its repositories when that is meaningful.

use std::time::Duration;

use octocat::GithubApp;
use octocat::models::{Installation, Repository, RepositorySelection};
use thiserror::Error;

use crate::summary::InstallationSummary;

/// Why an installation's repositories are missing from its summary.
#[derive(Debug, Error)]
enum ResolveError {
    #[error("exchanging an installation token: {0}")]
    Token(#[source] octocat::Error),

    #[error("listing repositories: {0}")]
    Repositories(#[source] octocat::Error),

    #[error("gave up after {0:?}")]
    Timeout(Duration),
}

/// Resolves installations of one App into summaries.
///
/// Resolution never fails: when the repositories can't be fetched the installation's
/// summary is returned without them.
#[derive(Debug, Clone)]
pub struct InstallationResolver {
    app: GithubApp,
    timeout: Option<Duration>,
}

impl InstallationResolver {
    /// Resolve installations of `app`, with no deadline.
    pub fn new(app: GithubApp) -> Self {
        Self { app, timeout: None }
    }

    /// Bound the token exchange and repository listing of each installation by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The App installations are resolved as.
    pub fn app(&self) -> &GithubApp {
        &self.app
    }

    /// Summarize `installation`.
    ///
    /// Installations covering all of an account's repositories are summarized without
    /// any further calls.
    pub async fn resolve(&self, installation: Installation) -> InstallationSummary {
        let summary = InstallationSummary::base(&installation);
        if summary.repository_selection_mode == RepositorySelection::All {
            return summary;
        }

        match self.repositories(installation.id).await {
            Ok(repositories) => summary.with_repositories(repositories),
            Err(error) => {
                tracing::warn!(
                    installation = installation.id,
                    account = %summary.gh_login,
                    "Repositories unavailable: {error}"
                );
                summary
            }
        }
    }

    async fn repositories(&self, installation_id: u64) -> Result<Vec<Repository>, ResolveError> {
        let fetch = async {
            let client = self
                .app
                .installation(installation_id)
                .await
                .map_err(ResolveError::Token)?;
            client
                .repositories()
                .await
                .map_err(ResolveError::Repositories)
        };

        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, fetch)
                .await
                .map_err(|_| ResolveError::Timeout(timeout))?,
            None => fetch.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use api_client::mock::MockService;
    use axum::http::StatusCode;
    use octocat::{AppIdentity, GithubApi};
    use serde_json::json;

    use super::*;

    const KEY: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../octocat/test/app-key.pem"
    ));

    fn resolver(mock: &MockService) -> InstallationResolver {
        let github = GithubApi::with_service("http://github.test/".parse().unwrap(), mock.clone());
        InstallationResolver::new(github.app(AppIdentity::new(1235, KEY.as_bytes())))
    }

    fn installation(id: u64, selection: &str) -> Installation {
        serde_json::from_value(json!({
            "id": id,
            "account": {"login": format!("org{id}"), "html_url": format!("https://github.com/org{id}")},
            "repository_selection": selection
        }))
        .unwrap()
    }

    fn token_for(mock: &mut MockService, id: u64) {
        mock.json(
            &format!("/app/installations/{id}/access_tokens"),
            StatusCode::CREATED,
            json!({"token": format!("ghs_{id}")}),
        );
    }

    #[tokio::test]
    async fn all_mode_makes_no_calls() {
        let mock = MockService::new();
        let summary = resolver(&mock).resolve(installation(1, "all")).await;

        assert_eq!(summary.gh_login, "org1");
        assert_eq!(summary.repository_selection_mode, RepositorySelection::All);
        assert!(summary.repositories.is_none());
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn selected_mode_lists_repositories_in_order() {
        let mut mock = MockService::new();
        token_for(&mut mock, 2);
        mock.json_for_token(
            "/installation/repositories",
            "ghs_2",
            StatusCode::OK,
            json!({
                "total_count": 3,
                "repositories": [
                    {"name": "c", "html_url": "https://github.com/org2/c"},
                    {"name": "a", "html_url": "https://github.com/org2/a"},
                    {"name": "b", "html_url": "https://github.com/org2/b"}
                ]
            }),
        );

        let summary = resolver(&mock).resolve(installation(2, "selected")).await;
        let repositories = summary.repositories.unwrap();
        let names: Vec<_> = repositories.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
        assert_eq!(repositories[1].html_url, "https://github.com/org2/a");
    }

    #[tokio::test]
    async fn zero_repositories_is_not_absent() {
        let mut mock = MockService::new();
        token_for(&mut mock, 3);
        mock.json(
            "/installation/repositories",
            StatusCode::OK,
            json!({"total_count": 0, "repositories": []}),
        );

        let summary = resolver(&mock).resolve(installation(3, "selected")).await;
        assert_eq!(summary.repositories, Some(Vec::new()));
    }

    #[tokio::test]
    async fn failed_token_exchange_degrades() {
        let mut mock = MockService::new();
        mock.json(
            "/app/installations/4/access_tokens",
            StatusCode::FORBIDDEN,
            json!({"message": "Resource not accessible by integration"}),
        );

        let summary = resolver(&mock).resolve(installation(4, "selected")).await;
        assert_eq!(summary.gh_login, "org4");
        assert!(summary.repositories.is_none());

        let requests = mock.requests();
        assert_eq!(requests.len(), 1, "no listing without a token");
    }

    #[tokio::test]
    async fn failed_listing_degrades() {
        let mut mock = MockService::new();
        token_for(&mut mock, 5);
        mock.json(
            "/installation/repositories",
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"message": "oops"}),
        );

        let summary = resolver(&mock).resolve(installation(5, "selected")).await;
        assert!(summary.repositories.is_none());
        assert_eq!(mock.requests().len(), 2);
    }

    #[tokio::test]
    async fn unknown_mode_still_lists_repositories() {
        let mut mock = MockService::new();
        token_for(&mut mock, 6);
        mock.json(
            "/installation/repositories",
            StatusCode::OK,
            json!({"repositories": [{"name": "x", "html_url": "https://github.com/org6/x"}]}),
        );

        let summary = resolver(&mock).resolve(installation(6, "whatever")).await;
        assert_eq!(
            summary.repository_selection_mode,
            RepositorySelection::Unknown
        );
        assert_eq!(summary.repositories.map(|r| r.len()), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_installations_time_out() {
        let mut mock = MockService::new();
        token_for(&mut mock, 7);
        mock.json(
            "/installation/repositories",
            StatusCode::OK,
            json!({"repositories": []}),
        );
        mock.delay("/installation/repositories", Duration::from_secs(120));

        let summary = resolver(&mock)
            .with_timeout(Some(Duration::from_secs(5)))
            .resolve(installation(7, "selected"))
            .await;
        assert!(summary.repositories.is_none());
    }
}
