//! Command-line interface.

use crate::state::AppServices;
use clap::{Parser, Subcommand};
use digger_core::SearchCriteria;

/// Find where a music release can be bought
#[derive(Debug, Parser)]
#[command(name = "digger", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Search every store able to answer the query
    Search {
        /// Track title
        #[arg(long)]
        title: Option<String>,
        /// Artist name
        #[arg(long)]
        artist: Option<String>,
        /// Album name
        #[arg(long)]
        album: Option<String>,
        /// Catalog number
        #[arg(long)]
        catalog: Option<String>,
    },
    /// List marketplace offers for a release, with shipping to a country
    Offers {
        /// Marketplace release id
        release_id: String,
        /// Buyer country (ISO 3166 alpha-2)
        country: String,
        /// Maximum number of offers (0 = configured maximum)
        #[arg(default_value_t = 0)]
        max: usize,
    },
}

impl Commands {
    /// Criteria for a search command.
    pub fn criteria(&self) -> Option<SearchCriteria> {
        match self {
            Self::Search {
                title,
                artist,
                album,
                catalog,
            } => Some(SearchCriteria::new(
                title.as_deref(),
                artist.as_deref(),
                album.as_deref(),
                catalog.as_deref(),
            )),
            Self::Offers { .. } => None,
        }
    }
}

/// Run a command and render its result as pretty JSON.
pub async fn run_command(command: &Commands, services: &AppServices) -> anyhow::Result<String> {
    match command {
        Commands::Search { .. } => {
            let criteria = command
                .criteria()
                .ok_or_else(|| anyhow::anyhow!("search command without criteria"))?;
            if criteria.is_empty() {
                anyhow::bail!("give at least one of --title, --artist, --album, --catalog");
            }
            let envelopes = services.search(&criteria).await;
            Ok(serde_json::to_string_pretty(&envelopes)?)
        }
        Commands::Offers {
            release_id,
            country,
            max,
        } => {
            let outcome = services.offers(release_id, country, *max).await;
            Ok(serde_json::to_string_pretty(&outcome)?)
        }
    }
}
