//! sqlkv CLI
//!
//! Command-line access to sqlkv stores.
//!
//! # Commands
//!
//! - `get` / `set` / `delete` - Point operations on one key
//! - `scan` - List a key range, forward or reverse
//! - `print` - Dump every entry as hex
//! - `stats` - Show backend statistics
//! - `backends` - List the registered backend kinds

mod commands;

use clap::{Parser, Subcommand};
use sqlkv_core::{BackendRegistry, Options, SQLITE_BACKEND};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// sqlkv command-line store tools.
#[derive(Parser)]
#[command(name = "sqlkv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the store
    #[arg(global = true, short, long, default_value = ".")]
    dir: PathBuf,

    /// Store name; the SQLite backend uses `<dir>/<name>.db`
    #[arg(global = true, short, long, default_value = "sqlkv")]
    name: String,

    /// Backend kind
    #[arg(global = true, short, long, default_value = SQLITE_BACKEND)]
    backend: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the value of a key
    Get {
        /// Key (UTF-8)
        key: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Write the value of a key
    Set {
        /// Key (UTF-8)
        key: String,

        /// Value (UTF-8); may be empty
        value: String,
    },

    /// Remove a key
    Delete {
        /// Key (UTF-8)
        key: String,
    },

    /// List the entries of a key range
    Scan {
        /// Inclusive lower bound
        #[arg(short, long)]
        start: Option<String>,

        /// Exclusive upper bound
        #[arg(short, long)]
        end: Option<String>,

        /// Descending key order
        #[arg(short, long)]
        reverse: bool,

        /// Maximum number of entries to list
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print every entry as hex
    Print,

    /// Show backend statistics
    Stats {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List the registered backend kinds
    Backends,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let registry = BackendRegistry::with_defaults();
    let open = || registry.open(&cli.backend, &cli.name, &cli.dir, &Options::new());

    match cli.command {
        Commands::Get { ref key, ref format } => {
            let store = open()?;
            commands::point::get(store.as_ref(), key, format)?;
            store.close()?;
        }
        Commands::Set { ref key, ref value } => {
            let store = open()?;
            commands::point::set(store.as_ref(), key, value)?;
            store.close()?;
        }
        Commands::Delete { ref key } => {
            let store = open()?;
            commands::point::delete(store.as_ref(), key)?;
            store.close()?;
        }
        Commands::Scan {
            ref start,
            ref end,
            reverse,
            limit,
            ref format,
        } => {
            let store = open()?;
            let query = commands::scan::ScanQuery {
                start: start.as_deref(),
                end: end.as_deref(),
                reverse,
                limit,
            };
            commands::scan::run(store.as_ref(), &query, format)?;
            store.close()?;
        }
        Commands::Print => {
            let store = open()?;
            store.print()?;
            store.close()?;
        }
        Commands::Stats { ref format } => {
            let store = open()?;
            commands::stats::run(store.as_ref(), format)?;
            store.close()?;
        }
        Commands::Backends => {
            for kind in registry.kinds() {
                println!("{kind}");
            }
        }
        Commands::Version => {
            println!("sqlkv CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("sqlkv core v{}", sqlkv_core::VERSION);
        }
    }

    Ok(())
}
