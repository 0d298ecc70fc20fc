//! Datum command-line tool
//!
//! Loads class definitions from a JSON or TOML schema, then describes the
//! resolved classes or constructs an instance.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "datum")]
#[command(about = "Value objects generated from declared fields", long_about = None)]
#[command(version)]
struct Cli {
    /// Log filter (overrides RUST_LOG), e.g. "datum_core=debug"
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every class of a schema with its resolved fields and defaults
    Describe {
        /// Schema file (.json or .toml)
        schema: PathBuf,
    },

    /// Construct an instance of a schema class
    New {
        /// Schema file (.json or .toml)
        schema: PathBuf,
        /// Class to construct
        class: String,
        /// Field values as `name=value`; values are JSON, bare words are strings
        fields: Vec<String>,
        /// Print the instance as JSON instead of its representation
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(directive: Option<&str>) {
    let filter = match directive {
        Some(d) => EnvFilter::new(d),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref());

    match cli.command {
        Commands::Describe { schema } => commands::describe::execute(&schema),
        Commands::New {
            schema,
            class,
            fields,
            json,
        } => commands::new::execute(&schema, &class, &fields, json),
    }
}
