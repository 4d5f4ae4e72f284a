use std::collections::HashMap;

use chrono::SecondsFormat;

use super::ReportRecord;
use crate::github_api_utils::{
    collaborators_api_response::Collaborator, repos_api_response::Repository,
    user_api_response::UserDetail,
};

const DESCRIPTION_LIMIT: usize = 46;
const DESCRIPTION_KEPT: usize = 45;
const ADMIN_SEPARATOR: &str = ", ";

/// Descriptions longer than 46 characters are cut to their first 45.
pub(crate) fn short_description(description: &str) -> String {
    if description.chars().count() > DESCRIPTION_LIMIT {
        description.chars().take(DESCRIPTION_KEPT).collect()
    } else {
        description.to_owned()
    }
}

/// `login (name - email), ` with whichever of name/email is missing left out.
pub(crate) fn admin_identity(login: &str, detail: Option<&UserDetail>) -> String {
    let name = detail.and_then(|d| present(&d.name));
    let email = detail.and_then(|d| present(&d.email));

    match (name, email) {
        (Some(name), Some(email)) => format!("{login} ({name} - {email}){ADMIN_SEPARATOR}"),
        (Some(known), None) | (None, Some(known)) => format!("{login} ({known}){ADMIN_SEPARATOR}"),
        (None, None) => format!("{login}{ADMIN_SEPARATOR}"),
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

/// Concatenated identities of `admins`, without the trailing separator.
pub(crate) fn list_admins(admins: &[Collaborator], lookup: &HashMap<String, UserDetail>) -> String {
    let list: String = admins
        .iter()
        .map(|admin| admin_identity(&admin.login, lookup.get(&admin.login)))
        .collect();
    match list.strip_suffix(ADMIN_SEPARATOR) {
        Some(trimmed) => trimmed.to_owned(),
        None => list,
    }
}

/// One record per repository, in repository order.
pub(crate) fn build_records(
    repos: &[Repository],
    admins: &HashMap<String, Vec<Collaborator>>,
    lookup: &HashMap<String, UserDetail>,
) -> Vec<ReportRecord> {
    repos
        .iter()
        .map(|repo| ReportRecord {
            full_name: repo.full_name.clone(),
            name: repo.name.clone(),
            description: short_description(repo.description.as_deref().unwrap_or_default()),
            private: repo.private,
            fork: repo.fork,
            visibility: repo.visibility.clone(),
            last_update: repo
                .updated_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            admins: admins
                .get(&repo.name)
                .map(|repo_admins| list_admins(repo_admins, lookup))
                .unwrap_or_default(),
        })
        .collect()
}
