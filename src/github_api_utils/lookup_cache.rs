use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::OnceCell;

use super::github_api_helper::GithubClient;
use super::resource_fetchers::fetch_user_detail;
use super::user_api_response::UserDetail;
use crate::error::Result;

/// Run-scoped map from login to user detail.
///
/// Each login gets its own once-cell, so concurrent lookups of the same
/// login share a single fetch. A failed fetch leaves the cell empty and the
/// next lookup tries again.
#[derive(Debug, Default)]
pub(crate) struct UserLookup {
    entries: Mutex<HashMap<String, Arc<OnceCell<UserDetail>>>>,
}

impl UserLookup {
    pub(crate) fn new() -> UserLookup {
        UserLookup::default()
    }

    /// Returns the cached detail for `login`, running `fetch` only on a miss.
    pub(crate) async fn resolve_with<F, Fut>(&self, login: &str, fetch: F) -> Result<UserDetail>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<UserDetail>>,
    {
        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(entries.entry(login.to_owned()).or_default())
        };
        cell.get_or_try_init(fetch).await.cloned()
    }

    /// Returns the detail for `login`, fetching it from the API on first use.
    pub(crate) async fn resolve(&self, client: &GithubClient, login: &str) -> Result<UserDetail> {
        self.resolve_with(login, move || async move {
            debug!("Looking up user detail for {login}");
            fetch_user_detail(client, login).await
        })
        .await
    }

    /// Copies every resolved entry out of the cache.
    pub(crate) fn snapshot(&self) -> HashMap<String, UserDetail> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .filter_map(|(login, cell)| cell.get().map(|detail| (login.clone(), detail.clone())))
            .collect()
    }
}
