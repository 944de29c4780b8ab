//! Output formats for a set of installation summaries.

use octocat::models::RepositorySelection;
use serde::Deserialize;
use thiserror::Error;

use crate::summary::InstallationSummary;

const DEFAULT_LOGOS_NOTE: &str = "Note: The images below are the profile images of orgs/users who have installed this app on one or more repositories.\n\n";

/// The requested output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    /// A JSON array of summaries.
    #[default]
    Json,

    /// A Markdown table of accounts and their repositories.
    Readme,

    /// Linked profile images, one per account.
    ReadmeLogos,
}

impl Format {
    /// Pick a format from the value of the format header. Unknown values select JSON.
    pub fn from_header(value: Option<&str>) -> Self {
        match value {
            Some("readme") => Format::Readme,
            Some("readme-logos") => Format::ReadmeLogos,
            _ => Format::Json,
        }
    }

    /// The `Content-Type` of a body in this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::Readme => "text/markdown; charset=utf-8",
            Format::ReadmeLogos => "text/plain; charset=utf-8",
        }
    }
}

/// Summaries could not be encoded.
#[derive(Debug, Error)]
#[error("failed to marshal")]
pub struct RenderError(#[from] serde_json::Error);

/// Knobs for the Markdown formats.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Repositories listed per table row before the rest are elided. Values below 1 list one.
    pub max_repositories: usize,

    /// Text placed ahead of the profile images.
    pub logos_note: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_repositories: 5,
            logos_note: DEFAULT_LOGOS_NOTE.to_owned(),
        }
    }
}

impl RenderOptions {
    /// Render `summaries`, in order, as `format`.
    pub fn render(
        &self,
        format: Format,
        summaries: &[InstallationSummary],
    ) -> Result<String, RenderError> {
        match format {
            Format::Json => Ok(serde_json::to_string(summaries)?),
            Format::Readme => Ok(self.readme(summaries)),
            Format::ReadmeLogos => Ok(self.logos(summaries)),
        }
    }

    fn readme(&self, summaries: &[InstallationSummary]) -> String {
        let mut lines = vec![
            "| Org/User | Repository |".to_owned(),
            "| ------ | ------ |".to_owned(),
        ];

        for summary in summaries {
            let cell = if summary.repository_selection_mode == RepositorySelection::All {
                format!("[All]({})", summary.org_user_url)
            } else {
                self.repository_cell(summary)
            };

            lines.push(format!(
                "| [{}]({}) | {} |",
                summary.gh_login, summary.org_user_url, cell
            ));
        }

        lines.join("\n")
    }

    fn repository_cell(&self, summary: &InstallationSummary) -> String {
        let repositories = summary.repositories.as_deref().unwrap_or_default();
        let bullet = if repositories.len() > 1 { "- " } else { "" };
        let max = self.max_repositories.max(1);

        let mut entries = Vec::new();
        for (index, repository) in repositories.iter().enumerate() {
            entries.push(format!(
                "{bullet}[{}]({})",
                repository.name, repository.html_url
            ));

            let done = index + 1;
            let remaining = repositories.len() - done;
            if done >= max && remaining > 0 {
                entries.push(format!("{bullet}and {remaining} more..."));
                break;
            }
        }

        entries.join("<br/>")
    }

    fn logos(&self, summaries: &[InstallationSummary]) -> String {
        let mut lines = vec![self.logos_note.clone()];
        lines.extend(summaries.iter().map(|summary| {
            let url = &summary.org_user_url;
            format!(
                r#"<a href="{url}"><img src="{url}.png" width="100"></a><span width="10px">&nbsp;</span>"#
            )
        }));
        lines.join("\n")
    }
}
