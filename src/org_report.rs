use std::{sync::Arc, time::Instant};

use crate::config::Config;
use crate::error::Result;
use crate::github_api_utils::{
    fan_out::{fetch_all_collaborators, resolve_admin_details},
    github_api_helper::GithubClient,
    lookup_cache::UserLookup,
    resource_fetchers::{fetch_organization, fetch_repositories},
};
use crate::report_utils::{csv_writer::write_csv, report_helper::build_records};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunSummary {
    pub(crate) organization: String,
    pub(crate) repositories: usize,
    pub(crate) collaborators: usize,
    pub(crate) admins: usize,
    pub(crate) rows: usize,
}

/// Fetches everything the report needs for `config.org` and writes the CSV.
pub(crate) async fn generate_org_report(config: &Config) -> Result<RunSummary> {
    let client = GithubClient::new(config)?;

    let org_time = Instant::now();
    let org = fetch_organization(&client, &config.org).await?;
    info!(
        "Get org info for {} ({}) done in {:.2?}",
        org.login,
        org.name.as_deref().unwrap_or("no display name"),
        org_time.elapsed()
    );

    let repo_time = Instant::now();
    let repos = fetch_repositories(&client, &org.login).await?;
    info!(
        "Get org repos done in {:.2?}, found {} repos",
        repo_time.elapsed(),
        repos.len()
    );

    let collab_time = Instant::now();
    let sets = fetch_all_collaborators(&client, &org.login, &repos, config.concurrency).await?;
    info!("Get repo collabs done in {:.2?}", collab_time.elapsed());

    let user_time = Instant::now();
    let lookup = Arc::new(UserLookup::new());
    let admins = resolve_admin_details(&client, &sets, &lookup, config.concurrency).await?;
    info!("Get user detail done in {:.2?}", user_time.elapsed());

    let csv_time = Instant::now();
    let records = build_records(&repos, &sets.admins, &lookup.snapshot());
    write_csv(&config.csv_path, &records)?;
    info!("Write CSV done in {:.2?}", csv_time.elapsed());

    Ok(RunSummary {
        organization: org.login,
        repositories: repos.len(),
        collaborators: sets.collaborators.values().map(Vec::len).sum(),
        admins,
        rows: records.len(),
    })
}
