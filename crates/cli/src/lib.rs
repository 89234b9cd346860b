mod edit;
mod inspect;
mod search;

use clap::{Parser, Subcommand};
use sift_core::{Codec, IndexConfig, SearchIndex, storage};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sift",
    version,
    about = "Substring search index over key/id/value triples",
    long_about = "Sift keeps lowercase text under an outer key and id, and answers \
                  case-insensitive substring queries with sorted, paginated ids. \
                  These commands operate on a snapshot file."
)]
pub struct Cli {
    /// Snapshot file to operate on. Defaults to $SIFT_DATA_DIR/search.db
    #[arg(long, global = true, value_name = "PATH")]
    pub snapshot: Option<PathBuf>,

    /// Write snapshots zstd-compressed
    #[arg(long, global = true)]
    pub compress: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show key, entry and byte counts
    Stats,
    /// List outer keys, or the ids under one key
    Keys {
        /// Outer key whose ids should be listed
        #[arg(value_name = "KEY")]
        key: Option<String>,
    },
    /// Find ids whose value contains QUERY (case-insensitive)
    #[command(
        long_about = "Scans every value under KEY and prints the ids containing QUERY, sorted \
                      ascending. --stop 0 means no upper bound; out-of-range bounds are clamped."
    )]
    Search {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "QUERY")]
        query: String,
        /// First row of the page
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        start: i64,
        /// End of the page (exclusive); 0 returns everything
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        stop: i64,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Store VALUE under KEY/ID
    Set {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "ID")]
        id: String,
        #[arg(value_name = "VALUE")]
        value: String,
    },
    /// Remove ID from KEY
    Delete {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Remove every entry
    Flush,
    /// Dump the snapshot as JSON
    Export {
        /// Output file; stdout when omitted
        #[arg(value_name = "OUT")]
        out: Option<PathBuf>,
    },
}

/// The snapshot file a command reads from and writes back to.
///
/// An existing file keeps its encoding unless compression was requested.
pub(crate) struct SnapshotFile {
    path: PathBuf,
    codec: Codec,
}

impl SnapshotFile {
    pub(crate) fn open(&self) -> sift_core::Result<SearchIndex> {
        let index = storage::load_from_path(&self.path)?.unwrap_or_else(|| {
            tracing::info!("No snapshot at {}, starting empty", self.path.display());
            SearchIndex::new()
        });
        Ok(match self.codec {
            Codec::Zstd => index.with_codec(Codec::Zstd),
            Codec::MessagePack => index,
        })
    }

    pub(crate) fn save(&self, index: &SearchIndex) -> sift_core::Result<()> {
        storage::save_to_path(index, &self.path, index.codec())
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = IndexConfig::from_env()?;
    if cli.compress {
        config.compress = true;
    }

    let _guard = sift_core::logging::init_logging(&config.log_dir(), "cli", true);

    let file = SnapshotFile {
        path: cli.snapshot.unwrap_or_else(|| config.snapshot_path()),
        codec: config.codec(),
    };

    match cli.command {
        Commands::Stats => inspect::stats(&file),
        Commands::Keys { key } => inspect::keys(&file, key.as_deref()),
        Commands::Search {
            key,
            query,
            start,
            stop,
            json,
        } => search::run(&file, &key, &query, start, stop, json),
        Commands::Set { key, id, value } => edit::set(&file, &key, &id, &value),
        Commands::Delete { key, id } => edit::delete(&file, &key, &id),
        Commands::Flush => edit::flush(&file),
        Commands::Export { out } => inspect::export(&file, out),
    }
}
