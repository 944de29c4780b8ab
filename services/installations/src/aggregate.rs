//! Resolve many installations concurrently.

use std::future::Future;

use octocat::models::Installation;
use tokio::sync::mpsc;

use crate::resolver::InstallationResolver;
use crate::summary::InstallationSummary;

/// Resolve every installation concurrently, one task each, and return their summaries
/// in the order the installations were given.
///
/// Always returns exactly one summary per installation. Each slot starts out as the
/// installation's base summary, so a resolution task which dies leaves that behind.
pub async fn aggregate<F, Fut>(
    installations: Vec<Installation>,
    resolve: F,
) -> Vec<InstallationSummary>
where
    F: Fn(Installation) -> Fut,
    Fut: Future<Output = InstallationSummary> + Send + 'static,
{
    let mut slots: Vec<InstallationSummary> =
        installations.iter().map(InstallationSummary::base).collect();
    let mut resolved = vec![false; slots.len()];

    let (tx, mut rx) = mpsc::channel(slots.len().max(1));
    for (index, installation) in installations.into_iter().enumerate() {
        let tx = tx.clone();
        let resolution = resolve(installation);
        tokio::spawn(async move {
            let summary = resolution.await;
            tx.send((index, summary)).await.ok();
        });
    }
    drop(tx);

    while let Some((index, summary)) = rx.recv().await {
        slots[index] = summary;
        resolved[index] = true;
    }

    for (slot, _) in slots.iter().zip(&resolved).filter(|(_, done)| !**done) {
        tracing::warn!(account = %slot.gh_login, "Installation resolution did not finish");
    }

    slots
}

/// [`aggregate`] with an [`InstallationResolver`].
pub async fn resolve_all(
    resolver: &InstallationResolver,
    installations: Vec<Installation>,
) -> Vec<InstallationSummary> {
    aggregate(installations, |installation| {
        let resolver = resolver.clone();
        async move { resolver.resolve(installation).await }
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use octocat::models::RepositorySelection;
    use serde_json::json;

    use super::*;
    use crate::summary::RepositorySummary;

    fn installations(n: u64) -> Vec<Installation> {
        (0..n)
            .map(|id| {
                serde_json::from_value(json!({
                    "id": id,
                    "account": {"login": format!("org{id}"), "html_url": format!("https://github.com/org{id}")},
                    "repository_selection": "selected"
                }))
                .unwrap()
            })
            .collect()
    }

    fn with_one_repository(installation: &Installation) -> InstallationSummary {
        let mut summary = InstallationSummary::base(installation);
        summary.repositories = Some(vec![RepositorySummary {
            name: format!("repo{}", installation.id),
            html_url: String::new(),
        }]);
        summary
    }

    #[tokio::test]
    async fn no_installations() {
        let summaries = aggregate(Vec::new(), |installation: Installation| async move {
            InstallationSummary::base(&installation)
        })
        .await;
        assert!(summaries.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn input_order_survives_completion_order() {
        let summaries = aggregate(installations(5), |installation| async move {
            // Later installations finish first.
            tokio::time::sleep(Duration::from_millis(100 * (5 - installation.id))).await;
            with_one_repository(&installation)
        })
        .await;

        let logins: Vec<_> = summaries.iter().map(|s| s.gh_login.as_str()).collect();
        assert_eq!(logins, vec!["org0", "org1", "org2", "org3", "org4"]);
        assert!(summaries.iter().all(|s| s.repositories.is_some()));
    }

    #[tokio::test]
    async fn one_summary_per_installation_even_when_resolution_dies() {
        let summaries = aggregate(installations(4), |installation| async move {
            if installation.id == 2 {
                panic!("resolution failed");
            }
            with_one_repository(&installation)
        })
        .await;

        assert_eq!(summaries.len(), 4);
        assert_eq!(summaries[2].gh_login, "org2");
        assert_eq!(
            summaries[2].repository_selection_mode,
            RepositorySelection::Selected
        );
        assert!(summaries[2].repositories.is_none());
        assert!(summaries[3].repositories.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn resolutions_run_concurrently() {
        let started = tokio::time::Instant::now();
        let summaries = aggregate(installations(10), |installation| async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            InstallationSummary::base(&installation)
        })
        .await;

        assert_eq!(summaries.len(), 10);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
