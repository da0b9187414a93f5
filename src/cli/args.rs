//! CLI argument definitions using clap
//!
//! Commands:
//! - reeldb load [--config <path>] [--store <dir>] ...
//! - reeldb find [--config <path>] [--store <dir>] [filters] [ordering]

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::query::{QueryParams, SortDirection, SortKey};

/// reeldb - load the IMDb title feeds and search them
#[derive(Parser, Debug)]
#[command(name = "reeldb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load title.basics and title.ratings into a new store
    Load(LoadArgs),

    /// Find titles by filtering and sorting the loaded store
    Find(FindArgs),
}

/// Options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Path to a JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Store directory (overrides the configuration file)
    #[arg(long)]
    pub store: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct LoadArgs {
    #[command(flatten)]
    pub common: StoreArgs,

    /// Path to title.basics.tsv.gz
    #[arg(long)]
    pub basics: Option<PathBuf>,

    /// Path to title.ratings.tsv.gz
    #[arg(long)]
    pub ratings: Option<PathBuf>,

    /// Rows per committed batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Skip and count malformed lines instead of aborting
    #[arg(long)]
    pub skip_malformed: bool,

    /// Delete an existing store before loading
    #[arg(long)]
    pub recreate: bool,
}

/// Sort column names as typed on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    Name,
    Year,
    Rating,
    #[default]
    NumRatings,
}

impl From<OrderBy> for SortKey {
    fn from(order: OrderBy) -> Self {
        match order {
            OrderBy::Name => SortKey::Name,
            OrderBy::Year => SortKey::Year,
            OrderBy::Rating => SortKey::Rating,
            OrderBy::NumRatings => SortKey::NumVotes,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Aligned columns for reading
    #[default]
    Table,
    /// One JSON object per line
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct FindArgs {
    #[command(flatten)]
    pub common: StoreArgs,

    /// Title types to include
    #[arg(short = 't', long = "type", num_args = 1.., value_parser = ["tv", "movie", "short"])]
    pub types: Vec<String>,

    /// Start of the title name, case-insensitive
    #[arg(short = 'n', long, default_value = "")]
    pub name: String,

    /// Select adult titles instead of non-adult ones
    #[arg(short = 'a', long)]
    pub adult: bool,

    /// Minimum start year
    #[arg(short = 'y', long, default_value_t = 0)]
    pub year: u16,

    /// Genres to match, any of them
    #[arg(short = 'g', long, num_args = 1.., value_name = "GENRE")]
    pub genres: Vec<String>,

    /// Minimum average rating, inclusive
    #[arg(short = 'r', long, default_value_t = 0.0)]
    pub rating: f64,

    /// Vote count the title must exceed
    #[arg(long, default_value_t = 0)]
    pub num_ratings: u64,

    /// Sort column
    #[arg(long, value_enum, default_value_t = OrderBy::NumRatings)]
    pub order_by: OrderBy,

    /// Sort in descending order
    #[arg(long)]
    pub reverse: bool,

    /// Return at most COUNT results
    #[arg(short = 'l', long, value_name = "COUNT")]
    pub limit: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl FindArgs {
    /// Query parameters these flags describe
    pub fn to_params(&self) -> QueryParams {
        let direction = if self.reverse {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        let params = QueryParams::new()
            .with_types(&self.types)
            .with_name_prefix(&self.name)
            .with_adult(self.adult)
            .with_min_year(self.year)
            .with_genres(&self.genres)
            .with_min_rating(self.rating)
            .with_min_votes(self.num_ratings)
            .order_by(self.order_by.into(), direction);
        match self.limit {
            Some(limit) => params.with_limit(limit),
            None => params,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
