use clap::Parser;
use tracing_subscriber::EnvFilter;

mod analysis;
mod analyzer;
mod app;
mod cli;
mod config;
mod fingerprint;
mod scrape;
mod search;
mod storage;
#[cfg(test)]
mod tests;
mod web;

use app::{AppFactory, SimilarRequest};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();

    let paths = AppFactory::get_paths()?;
    let recommender = AppFactory::create_recommender(&paths)?;

    match args.command {
        cli::Command::Daemon {} => {
            web::start_daemon(recommender)?;
        }

        cli::Command::Analyze { url } => {
            let response = recommender.extract(&url)?;
            recommender.save_index()?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        cli::Command::Similar { url, text, k } => {
            let items = recommender.similar(SimilarRequest { url, text, k })?;
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
    }

    Ok(())
}
