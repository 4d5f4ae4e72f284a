use std::{fmt, io, path::PathBuf};

use reqwest::StatusCode;
use thiserror::Error;

use crate::github_api_utils::link_header::LinkHeaderError;

pub(crate) type Result<T> = std::result::Result<T, GithubReportError>;

/// Which remote resource a request was made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FetchStage {
    Organization(String),
    Repositories(String),
    Collaborators(String),
    UserDetail(String),
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStage::Organization(org) => write!(f, "org info of '{org}'"),
            FetchStage::Repositories(org) => write!(f, "org repos of '{org}'"),
            FetchStage::Collaborators(repo) => write!(f, "collaborators of repo '{repo}'"),
            FetchStage::UserDetail(login) => write!(f, "user detail of '{login}'"),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum GithubReportError {
    #[error("configuration error for {setting}: {reason}")]
    Config { setting: String, reason: String },

    #[error("problem sending request for {stage}: {source}")]
    Transport {
        stage: FetchStage,
        #[source]
        source: reqwest::Error,
    },

    #[error("API response code for {stage} was {status}")]
    HttpStatus { stage: FetchStage, status: StatusCode },

    #[error("problem unmarshalling JSON for {stage}: {source}")]
    Decode {
        stage: FetchStage,
        #[source]
        source: serde_json::Error,
    },

    #[error("problem determining pagination for {stage}: {source}")]
    Pagination {
        stage: FetchStage,
        #[source]
        source: LinkHeaderError,
    },

    #[error("organization endpoint returned {count} records, expected exactly one")]
    Consistency { count: usize },

    #[error("problem preparing collaborators link of repo '{repo}': API gave {advertised}, built {expected}")]
    CollaboratorsLink {
        repo: String,
        advertised: String,
        expected: String,
    },

    #[error("problem writing report {}: {source}", .path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("fan-out task failed: {reason}")]
    Task { reason: String },
}

impl GithubReportError {
    pub(crate) fn config(setting: impl Into<String>, reason: impl Into<String>) -> Self {
        GithubReportError::Config {
            setting: setting.into(),
            reason: reason.into(),
        }
    }

    /// Stable identifier for the error kind, printed alongside the message.
    pub(crate) fn code(&self) -> &'static str {
        match self {
            GithubReportError::Config { .. } => "config",
            GithubReportError::Transport { .. } => "transport",
            GithubReportError::HttpStatus { .. } => "http_status",
            GithubReportError::Decode { .. } => "decode",
            GithubReportError::Pagination { .. } => "pagination",
            GithubReportError::Consistency { .. } | GithubReportError::CollaboratorsLink { .. } => {
                "consistency"
            }
            GithubReportError::Report { .. } => "report",
            GithubReportError::Task { .. } => "task",
        }
    }
}

impl From<tokio::task::JoinError> for GithubReportError {
    fn from(err: tokio::task::JoinError) -> Self {
        GithubReportError::Task {
            reason: err.to_string(),
        }
    }
}
