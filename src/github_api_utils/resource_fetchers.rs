use std::collections::HashSet;

use serde::de::DeserializeOwned;

use super::collaborators_api_response::Collaborator;
use super::github_api_helper::GithubClient;
use super::link_header::{resolve_cursor, PageCursor};
use super::org_api_response::Organization;
use super::repos_api_response::Repository;
use super::user_api_response::UserDetail;
use crate::error::{FetchStage, GithubReportError, Result};

const COLLABORATOR_TEMPLATE: &str = "{/collaborator}";

/// Every collaborator of one repository, plus the admins among them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct RepoCollaborators {
    pub(crate) collaborators: Vec<Collaborator>,
    pub(crate) admins: Vec<Collaborator>,
}

impl RepoCollaborators {
    fn extend(&mut self, page: Vec<Collaborator>) {
        for collaborator in page {
            if collaborator.is_admin() {
                self.admins.push(collaborator.clone());
            }
            self.collaborators.push(collaborator);
        }
    }
}

/// GETs `segments` and decodes the body, returning the raw link header alongside.
async fn fetch_document<T: DeserializeOwned>(
    client: &GithubClient,
    stage: &FetchStage,
    segments: &[&str],
    page: Option<u32>,
) -> Result<(T, String)> {
    let url = client.endpoint(segments, page)?;
    let response = client.issue(url, stage).await?;
    if !response.status.is_success() {
        return Err(GithubReportError::HttpStatus {
            stage: stage.clone(),
            status: response.status,
        });
    }
    let document =
        serde_json::from_str(&response.body).map_err(|source| GithubReportError::Decode {
            stage: stage.clone(),
            source,
        })?;
    Ok((document, response.link_header))
}

/// Fetches one page and the cursor its link header describes.
async fn fetch_page<T: DeserializeOwned>(
    client: &GithubClient,
    stage: &FetchStage,
    segments: &[&str],
    page: Option<u32>,
) -> Result<(T, PageCursor)> {
    let (document, link_header) = fetch_document(client, stage, segments, page).await?;
    let cursor = resolve_cursor(&link_header).map_err(|source| GithubReportError::Pagination {
        stage: stage.clone(),
        source,
    })?;
    Ok((document, cursor))
}

/// Walks every page of `segments`, handing each decoded page to `merge`.
/// The first request carries no `page` parameter, later ones use the page the
/// previous cursor pointed at.
async fn walk_pages<T, F>(
    client: &GithubClient,
    stage: &FetchStage,
    segments: &[&str],
    mut merge: F,
) -> Result<()>
where
    T: DeserializeOwned,
    F: FnMut(T),
{
    let mut page = None;
    loop {
        let (document, cursor) = fetch_page::<T>(client, stage, segments, page).await?;
        merge(document);

        let current = page.unwrap_or(1);
        match cursor.next_request(current) {
            Ok(Some(next)) => {
                debug!("{stage}: page {next} of {}", cursor.last_page);
                page = Some(next);
            }
            Ok(None) => return Ok(()),
            Err(source) => {
                return Err(GithubReportError::Pagination {
                    stage: stage.clone(),
                    source,
                })
            }
        }
    }
}

/// Gets the organization record, which has to be unique.
pub(crate) async fn fetch_organization(client: &GithubClient, org: &str) -> Result<Organization> {
    let stage = FetchStage::Organization(org.to_owned());
    let mut found: Vec<Organization> = Vec::new();
    // a single object is expected, pages are still followed if the server advertises them
    walk_pages(client, &stage, &["orgs", org], |record| found.push(record)).await?;

    if found.len() > 1 {
        return Err(GithubReportError::Consistency { count: found.len() });
    }
    found
        .pop()
        .ok_or(GithubReportError::Consistency { count: 0 })
}

/// Gets every repository of `org`.
pub(crate) async fn fetch_repositories(client: &GithubClient, org: &str) -> Result<Vec<Repository>> {
    let stage = FetchStage::Repositories(org.to_owned());
    let mut repositories: Vec<Repository> = Vec::new();
    let mut seen = HashSet::new();
    walk_pages(client, &stage, &["orgs", org, "repos"], |page: Vec<Repository>| {
        for repo in page {
            // the list can shift under us while pages are walked
            if !seen.insert(repo.id) {
                warn!("Repo {} (id {}) listed twice, keeping both", repo.full_name, repo.id);
            }
            repositories.push(repo);
        }
    })
    .await?;
    Ok(repositories)
}

/// Checks the `collaborators_url` the API lists for `repo` against the URL this
/// client would request. Repositories listed without one are not checked.
pub(crate) fn check_collaborators_link(
    client: &GithubClient,
    org: &str,
    repo: &Repository,
) -> Result<()> {
    let Some(advertised) = repo.collaborators_url.as_deref() else {
        return Ok(());
    };
    let advertised = advertised.replace(COLLABORATOR_TEMPLATE, "");
    let expected = client.endpoint(&["repos", org, &repo.name, "collaborators"], None)?;
    if advertised != expected.as_str() {
        return Err(GithubReportError::CollaboratorsLink {
            repo: repo.name.clone(),
            advertised,
            expected: expected.to_string(),
        });
    }
    Ok(())
}

/// Gets every collaborator of `org/repo`, copying the admins into their own list.
pub(crate) async fn fetch_collaborators(
    client: &GithubClient,
    org: &str,
    repo: &str,
) -> Result<RepoCollaborators> {
    let stage = FetchStage::Collaborators(repo.to_owned());
    let mut collected = RepoCollaborators::default();
    walk_pages(
        client,
        &stage,
        &["repos", org, repo, "collaborators"],
        |page: Vec<Collaborator>| collected.extend(page),
    )
    .await?;
    Ok(collected)
}

/// Gets the profile of one user. Profiles are single documents, so the link header is ignored.
pub(crate) async fn fetch_user_detail(client: &GithubClient, login: &str) -> Result<UserDetail> {
    let stage = FetchStage::UserDetail(login.to_owned());
    let (detail, _) = fetch_document(client, &stage, &["users", login], None).await?;
    Ok(detail)
}
