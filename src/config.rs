use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::ldif::reader::default_parse_threads;
use crate::ldif::{
    DuplicateValueBehavior, LdifReaderOptions, TrailingSpaceBehavior, DEFAULT_MAX_URL_FILE_SIZE,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_WRAP_COLUMN,
};

#[derive(Parser, Debug)]
#[command(name = "ldifber")]
#[command(about = "Validate, reformat and convert LDIF files and inspect BER-encoded LDAP data")]
#[command(version)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file (TOML, YAML or JSON)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Set log level: debug, info, warn, error
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// How to treat duplicate attribute values
    #[arg(long, value_enum, global = true)]
    pub duplicate_values: Option<DuplicateValueBehavior>,

    /// How to treat lines ending in a space
    #[arg(long, value_enum, global = true)]
    pub trailing_spaces: Option<TrailingSpaceBehavior>,

    /// Number of parser threads (0 uses all available cores)
    #[arg(long, global = true)]
    pub threads: Option<usize>,

    /// Fold output lines longer than this (0 disables folding)
    #[arg(long, global = true)]
    pub wrap_column: Option<usize>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Parse every record and report errors
    Validate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Parse and rewrite an LDIF file
    Reformat {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Output file (defaults to stdout)
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },
    /// Write each record as a BER-encoded LDAP message
    ToBer {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Output file (defaults to stdout)
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },
    /// Print the element tree of a BER file
    DumpBer {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

/// Values read from the settings file and `LDIFBER_*` environment
/// variables. Command-line flags take precedence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_level: String,
    pub duplicate_values: DuplicateValueBehavior,
    pub trailing_spaces: TrailingSpaceBehavior,
    pub threads: usize,
    pub queue_capacity: usize,
    pub wrap_column: usize,
    pub max_url_file_size: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            duplicate_values: DuplicateValueBehavior::default(),
            trailing_spaces: TrailingSpaceBehavior::default(),
            threads: 0,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            wrap_column: DEFAULT_WRAP_COLUMN,
            max_url_file_size: DEFAULT_MAX_URL_FILE_SIZE,
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            if !path.exists() {
                return Err(crate::LdifBerError::Config(format!(
                    "Settings file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }
        builder
            .add_source(config::Environment::with_prefix("LDIFBER").try_parsing(true))
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| crate::LdifBerError::Config(format!("Invalid settings: {}", e)))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub command: Command,
    pub log_level: tracing::Level,
    pub reader: LdifReaderOptions,
    pub wrap_column: usize,
}

impl Config {
    pub fn from_cli_args(args: CliArgs) -> crate::Result<Self> {
        let settings = Settings::load(args.config.as_deref())?;
        Self::from_parts(args, settings)
    }

    /// Merge command-line flags over already loaded settings.
    pub fn from_parts(args: CliArgs, settings: Settings) -> crate::Result<Self> {
        let log_level = if args.verbose {
            tracing::Level::DEBUG
        } else {
            parse_log_level(args.log_level.as_deref().unwrap_or(&settings.log_level))
        };

        if settings.queue_capacity == 0 {
            return Err(crate::LdifBerError::Config(
                "queue_capacity must be at least 1".to_string(),
            ));
        }

        let wrap_column = args.wrap_column.unwrap_or(settings.wrap_column);
        if wrap_column == 1 {
            return Err(crate::LdifBerError::Config(
                "wrap_column must be 0 (no folding) or at least 2".to_string(),
            ));
        }

        let threads = match args.threads.unwrap_or(settings.threads) {
            0 => default_parse_threads(),
            n => n,
        };

        let reader = LdifReaderOptions {
            duplicate_value_behavior: args.duplicate_values.unwrap_or(settings.duplicate_values),
            trailing_space_behavior: args.trailing_spaces.unwrap_or(settings.trailing_spaces),
            max_url_file_size: settings.max_url_file_size,
            parse_threads: threads,
            queue_capacity: settings.queue_capacity,
            ..LdifReaderOptions::default()
        };

        Ok(Config {
            command: args.command,
            log_level,
            reader,
            wrap_column,
        })
    }
}

pub fn parse_log_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
