//! The per-installation records handed to renderers.

use octocat::models::{Installation, Repository, RepositorySelection};
use serde::{Deserialize, Serialize};

/// What is known about one installation of the App.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationSummary {
    /// Login of the account the App is installed on.
    #[serde(rename = "ghLogin")]
    pub gh_login: String,

    /// Profile URL of that account.
    #[serde(rename = "orgUserURL")]
    pub org_user_url: String,

    /// Whether the installation covers every repository of the account.
    #[serde(rename = "repositorySelectionMode")]
    pub repository_selection_mode: RepositorySelection,

    /// Repositories visible to the installation.
    ///
    /// `None` when they were not fetched (mode "all") or could not be fetched. An
    /// installation which genuinely sees no repositories has `Some(vec![])`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repositories: Option<Vec<RepositorySummary>>,
}

impl InstallationSummary {
    /// The summary built from the installation alone, without repositories.
    pub fn base(installation: &Installation) -> Self {
        Self {
            gh_login: installation.account_login().to_owned(),
            org_user_url: installation.account_url().to_owned(),
            repository_selection_mode: installation.repository_selection(),
            repositories: None,
        }
    }

    /// Attach the repositories, keeping their order.
    pub fn with_repositories(mut self, repositories: Vec<Repository>) -> Self {
        self.repositories = Some(
            repositories
                .into_iter()
                .map(RepositorySummary::from)
                .collect(),
        );
        self
    }
}

/// A repository link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySummary {
    /// Short repository name.
    pub name: String,

    /// Repository web page.
    #[serde(rename = "htmlURL")]
    pub html_url: String,
}

impl From<Repository> for RepositorySummary {
    fn from(repository: Repository) -> Self {
        Self {
            name: repository.name.unwrap_or_default(),
            html_url: repository.html_url.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn installation(value: serde_json::Value) -> Installation {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn base_summary_from_installation() {
        let summary = InstallationSummary::base(&installation(json!({
            "id": 1,
            "account": {"login": "orgA", "html_url": "https://github.com/orgA"},
            "repository_selection": "all"
        })));

        assert_eq!(summary.gh_login, "orgA");
        assert_eq!(summary.org_user_url, "https://github.com/orgA");
        assert_eq!(summary.repository_selection_mode, RepositorySelection::All);
        assert!(summary.repositories.is_none());
    }

    #[test]
    fn missing_account_defaults_to_empty_strings() {
        let summary = InstallationSummary::base(&installation(json!({"id": 1, "account": null})));
        assert_eq!(summary.gh_login, "");
        assert_eq!(summary.org_user_url, "");
    }

    #[test]
    fn absent_repositories_are_omitted() {
        let summary = InstallationSummary::base(&installation(json!({
            "id": 1,
            "account": {"login": "orgA", "html_url": "https://github.com/orgA"},
            "repository_selection": "selected"
        })));

        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            json!({
                "ghLogin": "orgA",
                "orgUserURL": "https://github.com/orgA",
                "repositorySelectionMode": "selected"
            })
        );
    }

    #[test]
    fn empty_repositories_are_kept() {
        let summary = InstallationSummary::base(&installation(json!({"id": 1})))
            .with_repositories(Vec::new());

        assert_eq!(serde_json::to_value(&summary).unwrap()["repositories"], json!([]));
    }

    #[test]
    fn repository_fields() {
        let repository: Repository = serde_json::from_value(json!({
            "name": "hello-world",
            "html_url": "https://github.com/octocat/hello-world"
        }))
        .unwrap();

        assert_eq!(
            serde_json::to_value(RepositorySummary::from(repository)).unwrap(),
            json!({"name": "hello-world", "htmlURL": "https://github.com/octocat/hello-world"})
        );
    }

    #[test]
    fn null_repository_fields_become_empty() {
        let repository: Repository =
            serde_json::from_value(json!({"name": null, "html_url": null})).unwrap();

        assert_eq!(
            RepositorySummary::from(repository),
            RepositorySummary {
                name: String::new(),
                html_url: String::new(),
            }
        );
    }
}
