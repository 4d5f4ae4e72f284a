mod config;
mod error;
mod github_api_utils;
mod org_report;
mod report_utils;

use clap::{CommandFactory, Parser};
use config::{Args, Config};
use dotenv::dotenv;
use org_report::generate_org_report;

extern crate pretty_env_logger;
#[macro_use]
extern crate log;

fn exit_with_usage(message: &str) -> ! {
    eprintln!("ERROR: {message}\n");
    Args::command().print_help().ok();
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    // load env variables
    dotenv().ok();
    pretty_env_logger::init();

    let args = Args::parse();
    if let Err(err) = args.validate() {
        exit_with_usage(&err.to_string());
    }

    // the token has to be there before any request is sent
    let config = match Config::from_env(&args) {
        Ok(config) => config,
        Err(err) => {
            error!("[{}] {err}", err.code());
            std::process::exit(1);
        }
    };
    debug!("{config:?}");

    match generate_org_report(&config).await {
        Ok(summary) => info!(
            "Report for {} written to {}: {} repos, {} collaborators, {} distinct admins, {} rows",
            summary.organization,
            config.csv_path.display(),
            summary.repositories,
            summary.collaborators,
            summary.admins,
            summary.rows
        ),
        Err(err) => {
            error!("Error occurred while generating CSV [{}]: {err}", err.code());
            std::process::exit(1);
        }
    }
}
