use std::{
    collections::{BTreeSet, HashMap},
    future::Future,
    sync::Arc,
};

use tokio::{spawn, sync::Semaphore, task::JoinHandle};

use super::collaborators_api_response::Collaborator;
use super::github_api_helper::GithubClient;
use super::lookup_cache::UserLookup;
use super::repos_api_response::Repository;
use super::resource_fetchers::{check_collaborators_link, fetch_collaborators, RepoCollaborators};
use crate::error::{GithubReportError, Result};

/// Collaborators of every repository, keyed by repository name.
#[derive(Debug, Default)]
pub(crate) struct CollaboratorSets {
    pub(crate) collaborators: HashMap<String, Vec<Collaborator>>,
    pub(crate) admins: HashMap<String, Vec<Collaborator>>,
}

impl CollaboratorSets {
    /// Distinct admin logins across all repositories, sorted.
    pub(crate) fn admin_logins(&self) -> BTreeSet<String> {
        self.admins
            .values()
            .flatten()
            .map(|admin| admin.login.clone())
            .collect()
    }
}

/// Spawns one task per item, at most `concurrency` of them running at a time,
/// then joins the handles in launch order. The first failure aborts whatever
/// is still running.
async fn run_wave<I, T, F, Fut>(items: Vec<I>, concurrency: usize, task: F) -> Result<Vec<T>>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.clamp(1, Semaphore::MAX_PERMITS)));
    let mut requests: Vec<JoinHandle<Result<T>>> = Vec::with_capacity(items.len());

    for item in items {
        let c_semaphore = semaphore.clone();
        let work = task(item);
        requests.push(spawn(async move {
            let _permit = c_semaphore
                .acquire_owned()
                .await
                .map_err(|err| GithubReportError::Task {
                    reason: err.to_string(),
                })?;
            work.await
        }));
    }

    let mut results = Vec::with_capacity(requests.len());
    let mut pending = requests.into_iter();
    while let Some(request) = pending.next() {
        match request.await {
            Ok(Ok(value)) => results.push(value),
            Ok(Err(err)) => {
                pending.for_each(|rest| rest.abort());
                return Err(err);
            }
            Err(err) => {
                pending.for_each(|rest| rest.abort());
                return Err(err.into());
            }
        }
    }
    Ok(results)
}

/// Fetches the collaborators of every repository concurrently. Every
/// repository's collaborators link is checked before the first request goes out.
pub(crate) async fn fetch_all_collaborators(
    client: &GithubClient,
    org: &str,
    repos: &[Repository],
    concurrency: usize,
) -> Result<CollaboratorSets> {
    for repo in repos {
        check_collaborators_link(client, org, repo)?;
    }
    let names: Vec<String> = repos.iter().map(|repo| repo.name.clone()).collect();
    info!(
        "Fetching collaborators of {} repos, {} at a time",
        names.len(),
        concurrency
    );

    let fetched = run_wave(names, concurrency, |repo_name| {
        let c_client = client.clone();
        let c_org = org.to_owned();
        async move {
            let collected = fetch_collaborators(&c_client, &c_org, &repo_name).await?;
            debug!(
                "{repo_name}: {} collaborators, {} admins",
                collected.collaborators.len(),
                collected.admins.len()
            );
            Ok((repo_name, collected))
        }
    })
    .await?;

    // merged here, on the joining task, so the maps need no lock
    let mut sets = CollaboratorSets::default();
    for (repo_name, RepoCollaborators { collaborators, admins }) in fetched {
        sets.collaborators.insert(repo_name.clone(), collaborators);
        sets.admins.insert(repo_name, admins);
    }
    Ok(sets)
}

/// Resolves every distinct admin login through `lookup`, concurrently.
/// Returns the number of distinct admins.
pub(crate) async fn resolve_admin_details(
    client: &GithubClient,
    sets: &CollaboratorSets,
    lookup: &Arc<UserLookup>,
    concurrency: usize,
) -> Result<usize> {
    let logins: Vec<String> = sets.admin_logins().into_iter().collect();
    let distinct = logins.len();
    info!("Resolving user detail of {distinct} distinct admins");

    run_wave(logins, concurrency, |login| {
        let c_client = client.clone();
        let c_lookup = lookup.clone();
        async move { c_lookup.resolve(&c_client, &login).await.map(|_| ()) }
    })
    .await?;
    Ok(distinct)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::test_config;
    use crate::error::FetchStage;

    fn collaborator(login: &str, role: &str) -> Collaborator {
        Collaborator {
            login: login.to_owned(),
            role_name: role.to_owned(),
        }
    }

    #[tokio::test]
    async fn wave_keeps_launch_order() {
        let results = run_wave(vec![3u64, 1, 2], 3, |n| async move {
            tokio::time::sleep(Duration::from_millis(n * 10)).await;
            Ok(n)
        })
        .await
        .unwrap();
        assert_eq!(results, [3, 1, 2]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn wave_respects_the_concurrency_cap() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        run_wave((0..12u32).collect(), 2, |_| {
            let c_running = running.clone();
            let c_peak = peak.clone();
            async move {
                let now = c_running.fetch_add(1, Ordering::SeqCst) + 1;
                c_peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(25)).await;
                c_running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await
        .unwrap();

        // two tasks at a time, never one after the other
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn wave_returns_the_first_error() {
        let err = run_wave(vec!["ok", "bad", "ok"], 2, |name| async move {
            if name == "bad" {
                Err(GithubReportError::Consistency { count: 2 })
            } else {
                Ok(name)
            }
        })
        .await
        .unwrap_err();
        assert_eq!(err.code(), "consistency");
    }

    #[test]
    fn admin_logins_are_distinct() {
        let mut sets = CollaboratorSets::default();
        sets.admins
            .insert("a".to_owned(), vec![collaborator("alice", "admin")]);
        sets.admins.insert(
            "b".to_owned(),
            vec![collaborator("alice", "admin"), collaborator("zed", "admin")],
        );
        let logins: Vec<String> = sets.admin_logins().into_iter().collect();
        assert_eq!(logins, ["alice", "zed"]);
    }

    fn repositories(names: &[&str]) -> Vec<Repository> {
        let listed: Vec<serde_json::Value> = names
            .iter()
            .map(|name| {
                json!({"id": 1, "name": name, "full_name": format!("acme/{name}"),
                       "description": null, "private": false, "fork": false,
                       "visibility": "public", "updated_at": "2022-06-13T07:59:05Z"})
            })
            .collect();
        serde_json::from_value(json!(listed)).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn collaborator_requests_overlap() {
        let server = MockServer::start().await;
        let delay = Duration::from_millis(300);
        for name in ["a", "b", "c", "d"] {
            Mock::given(method("GET"))
                .and(path(format!("/repos/acme/{name}/collaborators")))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!([{"login": "alice", "role_name": "admin"}]))
                        .set_delay(delay),
                )
                .expect(1)
                .mount(&server)
                .await;
        }

        let client = GithubClient::new(&test_config(&server.uri(), "unused.csv".into())).unwrap();
        let started = Instant::now();
        let sets = fetch_all_collaborators(&client, "acme", &repositories(&["a", "b", "c", "d"]), 4)
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(sets.admins.len(), 4);
        // one after the other would take at least 4 delays
        assert!(elapsed < delay * 3, "took {elapsed:?}");
    }

    #[tokio::test]
    async fn mismatched_collaborators_link_stops_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let client = GithubClient::new(&test_config(&server.uri(), "unused.csv".into())).unwrap();
        let mut repos = repositories(&["widgets"]);
        repos[0].collaborators_url =
            Some("https://api.github.com/repos/acme/widgets/collaborators{/collaborator}".to_owned());

        let err = fetch_all_collaborators(&client, "acme", &repos, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, GithubReportError::CollaboratorsLink { .. }));
    }

    #[tokio::test]
    async fn one_failing_repository_fails_the_wave() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/good/collaborators"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/broken/collaborators"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = GithubClient::new(&test_config(&server.uri(), "unused.csv".into())).unwrap();
        let repos: Vec<Repository> = serde_json::from_value(json!([
            {"id": 1, "name": "good", "full_name": "acme/good", "description": null,
             "private": false, "fork": false, "visibility": "public",
             "updated_at": "2022-06-13T07:59:05Z"},
            {"id": 2, "name": "broken", "full_name": "acme/broken", "description": null,
             "private": false, "fork": false, "visibility": "public",
             "updated_at": "2022-06-13T07:59:05Z"}
        ]))
        .unwrap();

        let err = fetch_all_collaborators(&client, "acme", &repos, 2)
            .await
            .unwrap_err();
        match err {
            GithubReportError::HttpStatus { stage, .. } => {
                assert_eq!(stage, FetchStage::Collaborators("broken".to_owned()))
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
