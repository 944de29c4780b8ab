//! List the installations of a Github App, and the repositories each selective installation can see.
//!
//! Run with:
//! GITHUB_APP_ID=1234 GITHUB_APP_KEY=path/to/key.pem cargo run -p octocat --example list-installations

use eyre::{Report, WrapErr as _};
use octocat::models::RepositorySelection;
use octocat::{AppIdentity, GithubConfig};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt::init();

    let app_id: u64 = std::env::var("GITHUB_APP_ID")
        .wrap_err("GITHUB_APP_ID is set")?
        .parse()
        .wrap_err("GITHUB_APP_ID is an integer")?;
    let key_path = std::env::var("GITHUB_APP_KEY").wrap_err("GITHUB_APP_KEY is set")?;
    let key = tokio::fs::read(&key_path)
        .await
        .wrap_err_with(|| format!("reading {key_path}"))?;

    let github = GithubConfig::default()
        .connect()
        .map_err(|error| Report::msg(format!("API base: {error}")))?;
    let app = github.app(AppIdentity::new(app_id, key));

    for installation in app.installations().await? {
        println!(
            "{} ({}) [{}]",
            installation.account_login(),
            installation.account_url(),
            installation.repository_selection().as_str()
        );

        if installation.repository_selection() == RepositorySelection::All {
            continue;
        }

        let client = app.installation(installation.id).await?;
        for repository in client.repositories().await? {
            println!("  - {} {}", repository.name(), repository.html_url());
        }
    }

    Ok(())
}
