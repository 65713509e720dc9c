use clap::{Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

use crate::store::source::HttpSource;

/// Building data CLI (argument schema only)
#[derive(Parser, Debug)]
#[command(name = "openbuildings", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Normalize raw building-model exports into per-county caches
    Extract(ExtractArgs),

    /// Look up one building in a region cache
    Lookup(LookupArgs),
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Raw export files (.csv.gz)
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    pub inputs: Vec<PathBuf>,

    /// Cache directory to write region files into
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    pub out: PathBuf,

    /// Overwrite existing region files
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct LookupArgs {
    /// State postal code, e.g. ME
    pub state: String,

    /// County name, e.g. Knox
    pub county: String,

    /// Building id
    pub id: String,

    /// Cache directory (default: $OPENBUILDINGS_CACHE, else ./data)
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub cache_dir: Option<PathBuf>,

    /// Base URL of the bucket to fetch missing caches from
    #[arg(long, default_value = HttpSource::DEFAULT_BUCKET)]
    pub bucket: String,

    /// Country prefix in the bucket layout
    #[arg(long, default_value = "US")]
    pub country: String,

    /// Print a single raw field instead of the full record
    #[arg(long)]
    pub field: Option<String>,

    /// Never fetch; fail if the cache is absent locally
    #[arg(long)]
    pub offline: bool,
}
