//! # fhash CLI
//!
//! Workload driver and inspection tool for the fhash file-name index.

use std::fs;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fhash::{bucket_hash, FileHashTable, TableConfig};
use fhash_config::Config;

mod stress;

/// fhash - concurrent file-name to file-handle index
#[derive(Parser)]
#[command(name = "fhash")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a multi-threaded open/close workload against one shared table
    Stress(stress::StressArgs),

    /// Show the checksum and bucket each name maps to
    Bucket {
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,

        /// Table bucket count (default: config)
        #[arg(long)]
        buckets: Option<usize>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Write a default project config to .fhash/config.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
    /// Print config file locations
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    fhash_config::reload().context("Failed to load config")?;
    let config = fhash_config::config().clone();
    fhash_config::init_logging(config.log.level());

    match cli.command {
        Commands::Stress(args) => stress::run(&config, args),
        Commands::Bucket { names, buckets } => bucket(&config, &names, buckets),
        Commands::Config { command } => config_command(&config, command),
    }
}

fn bucket(config: &Config, names: &[String], buckets: Option<usize>) -> Result<()> {
    let table = FileHashTable::from_config(&TableConfig {
        buckets: buckets.unwrap_or(config.table.buckets),
        dump_on_miss: false,
    })?;

    for name in names {
        println!(
            "{}\tcrc16=0x{:04x}\tbucket={}/{}",
            name,
            bucket_hash(name),
            table.bucket_of(name),
            table.bucket_count()
        );
    }
    Ok(())
}

fn config_command(config: &Config, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            print!("{}", config.to_toml());
        }
        ConfigCommands::Init { force } => {
            let path = Config::project_config_path();
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(&path, Config::default_toml())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        ConfigCommands::Path => {
            match Config::global_config_path() {
                Some(p) => println!("Global:  {}", p.display()),
                None => println!("Global:  (no home directory)"),
            }
            println!("Project: {}", Config::project_config_path().display());
        }
    }
    Ok(())
}
