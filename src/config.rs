use std::{fmt, path::PathBuf};

use clap::Parser;
use url::Url;

use crate::error::{GithubReportError, Result};

pub(crate) const TOKEN_VAR: &str = "GHTOKEN";
pub(crate) const BASE_URL_VAR: &str = "GH_API_BASE_URL";
pub(crate) const USER_AGENT_VAR: &str = "GH_API_USER_AGENT";
pub(crate) const CONCURRENCY_VAR: &str = "GH_API_CONCURRENCY";

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const DEFAULT_CONCURRENCY: usize = 8;
const MAX_CONCURRENCY: usize = 100;
const CSV_EXTENSION: &str = ".csv";

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "github_org_report",
    version,
    about = "Generate a CSV report of a Github organization's repositories and their admins",
    after_help = "WARNING: The token used to authenticate with the Github API must be passed \
                  as an environmental variable named 'GHTOKEN' (a .env file works too).\n\n\
                  Example:\n      $ github_org_report --csv \"org-info.csv\" --org \"my-github-org\""
)]
pub(crate) struct Args {
    /// Name of the CSV to create
    #[arg(long, default_value = "Findings-example.csv")]
    pub(crate) csv: String,

    /// Name of the Github organization to report on
    #[arg(long, default_value = "")]
    pub(crate) org: String,
}

impl Args {
    /// The CSV name needs at least 5 characters and a `.csv` suffix, the org can't be empty.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.csv.chars().count() < 5 {
            return Err(GithubReportError::config(
                "--csv",
                "CSV name is too short, smallest possible length is 5 characters e.g. a.csv",
            ));
        }
        if !self.csv.ends_with(CSV_EXTENSION) {
            return Err(GithubReportError::config(
                "--csv",
                "CSV name should end in '.csv' e.g. my-GH-Org.csv",
            ));
        }
        if self.org.trim().is_empty() {
            return Err(GithubReportError::config(
                "--org",
                "please provide a Github org with the --org argument",
            ));
        }
        Ok(())
    }
}

/// Everything a run needs, resolved before the first request is sent.
#[derive(Clone)]
pub(crate) struct Config {
    pub(crate) org: String,
    pub(crate) csv_path: PathBuf,
    pub(crate) token: String,
    pub(crate) base_url: Url,
    pub(crate) user_agent: String,
    pub(crate) concurrency: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("org", &self.org)
            .field("csv_path", &self.csv_path)
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("user_agent", &self.user_agent)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl Config {
    pub(crate) fn from_env(args: &Args) -> Result<Config> {
        Config::from_lookup(args, |key| std::env::var(key).ok())
    }

    /// Builds the config from `args` plus whatever `lookup` returns for the
    /// environment variables.
    pub(crate) fn from_lookup<F>(args: &Args, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup(TOKEN_VAR)
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                GithubReportError::config(
                    TOKEN_VAR,
                    format!("required environmental variable '{TOKEN_VAR}' not found"),
                )
            })?;

        let raw_base_url = lookup(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let base_url = Url::parse(&raw_base_url)
            .map_err(|err| GithubReportError::config(BASE_URL_VAR, err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(GithubReportError::config(
                BASE_URL_VAR,
                format!("'{raw_base_url}' can't be used as a base URL"),
            ));
        }

        let user_agent = lookup(USER_AGENT_VAR).unwrap_or_else(|| {
            format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        });

        let concurrency = match lookup(CONCURRENCY_VAR) {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(value) if (1..=MAX_CONCURRENCY).contains(&value) => value,
                _ => {
                    return Err(GithubReportError::config(
                        CONCURRENCY_VAR,
                        format!("'{raw}' is not an integer between 1 and {MAX_CONCURRENCY}"),
                    ))
                }
            },
            None => DEFAULT_CONCURRENCY,
        };

        Ok(Config {
            org: args.org.trim().to_owned(),
            csv_path: PathBuf::from(&args.csv),
            token,
            base_url,
            user_agent,
            concurrency,
        })
    }
}

#[cfg(test)]
pub(crate) fn test_config(base_url: &str, csv_path: PathBuf) -> Config {
    Config {
        org: "acme".to_owned(),
        csv_path,
        token: "secret".to_owned(),
        base_url: Url::parse(base_url).unwrap(),
        user_agent: "github_org_report-tests".to_owned(),
        concurrency: 4,
    }
}
