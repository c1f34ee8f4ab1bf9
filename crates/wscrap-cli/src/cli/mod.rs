//! CLI for the wscrap article scraper.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use wscrap_core::config;
use wscrap_core::store::SqliteArticleStore;

use commands::{run_add, run_scraper, run_status};

/// Top-level CLI for the wscrap article scraper.
#[derive(Debug, Parser)]
#[command(name = "wscrap")]
#[command(about = "wscrap: fetch pending articles and store their readable text", long_about = None)]
pub struct Cli {
    /// Defaults to `run`.
    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Scrape every pending article, then exit.
    Run,

    /// Queue article URLs for scraping.
    Add {
        /// One or more HTTP/HTTPS article URLs.
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Show article counts.
    Status,
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command.unwrap_or(CliCommand::Run) {
            CliCommand::Run => run_scraper(&cfg)?,
            CliCommand::Add { urls } => {
                let store = SqliteArticleStore::open(&cfg).context("failed to open article store")?;
                run_add(&store, &urls)?;
            }
            CliCommand::Status => {
                let store = SqliteArticleStore::open(&cfg).context("failed to open article store")?;
                run_status(&store)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
