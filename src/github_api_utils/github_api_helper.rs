use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::config::{Config, TOKEN_VAR, USER_AGENT_VAR};
use crate::error::{FetchStage, GithubReportError, Result};

const GITHUB_JSON: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Raw outcome of one GET request.
#[derive(Debug)]
pub(crate) struct GatewayResponse {
    pub(crate) status: StatusCode,
    pub(crate) body: String,
    pub(crate) link_header: String,
}

/// Authenticated access to the Github REST API.
///
/// Holds no per-request state, so clones can be handed to concurrent tasks.
#[derive(Clone, Debug)]
pub(crate) struct GithubClient {
    client: Client,
    base_url: Url,
    headers: HeaderMap,
}

impl GithubClient {
    pub(crate) fn new(config: &Config) -> Result<GithubClient> {
        Ok(GithubClient {
            client: Client::new(),
            base_url: config.base_url.clone(),
            headers: get_requests_headers(&config.token, &config.user_agent)?,
        })
    }

    /// Absolute URL for `segments` under the API base, with an optional `page` query.
    pub(crate) fn endpoint(&self, segments: &[&str], page: Option<u32>) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                GithubReportError::config("base URL", format!("'{}' can't be a base", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        if let Some(page) = page {
            url.query_pairs_mut().append_pair("page", &page.to_string());
        }
        Ok(url)
    }

    /// Sends one GET request. Only transport failures are errors here, the
    /// status is left for the caller to judge.
    pub(crate) async fn issue(&self, url: Url, stage: &FetchStage) -> Result<GatewayResponse> {
        debug!("GET {url}");
        let transport = |source| GithubReportError::Transport {
            stage: stage.clone(),
            source,
        };

        let response = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let link_header = response
            .headers()
            .get(LINK)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .unwrap_or_default();
        let body = response.text().await.map_err(transport)?;

        Ok(GatewayResponse {
            status,
            body,
            link_header,
        })
    }
}

/// Creates the headers sent with every request:
/// 1. **authorization**, `token <GHTOKEN>`.
/// 2. **accept**, the versioned Github JSON media type.
/// 3. **X-GitHub-Api-Version**, github api version.
/// 4. **user-agent**, required by the API.
fn get_requests_headers(token: &str, user_agent: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    let mut authorization = HeaderValue::from_str(&format!("token {token}"))
        .map_err(|_| GithubReportError::config(TOKEN_VAR, "token is not a valid header value"))?;
    authorization.set_sensitive(true);
    headers.insert(AUTHORIZATION, authorization);
    headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_JSON));
    headers.insert(
        "X-GitHub-Api-Version",
        HeaderValue::from_static(GITHUB_API_VERSION),
    );
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent).map_err(|_| {
            GithubReportError::config(USER_AGENT_VAR, "user agent is not a valid header value")
        })?,
    );
    Ok(headers)
}
