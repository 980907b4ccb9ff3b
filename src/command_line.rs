use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::Level;

use crate::dynamodb::{Capacity, ConnectionOptions};
use crate::policy::{CopyMode, CopyPolicy, DEFAULT_STAGING_CAPACITY, DEFAULT_ULTIMATE_CAPACITY};

/// Command line tool for copying AWS DynamoDB tables.
#[derive(Debug, Parser)]
#[command(
    name = "dynamodb-table-copy",
    version,
    about,
    long_about = "Copy an AWS DynamoDB table to a new table.

A shallow copy (the default) creates an empty table with the source's
attribute definitions and key schema at the ultimate capacity. A deep copy
creates it at the staging capacity, copies every item, then switches to the
ultimate capacity. If copying the data fails the new table is deleted.

The parameters can be given as flags or, with --config-file, as a JSON
object using the keys source_table, destination_table, source_profile,
destination_profile, destination_table_staging_read_capacity,
destination_table_staging_write_capacity,
destination_table_ultimate_read_capacity,
destination_table_ultimate_write_capacity and copy_mode.

Environment variables:
  AWS_ENDPOINT_URL    - Use local DynamoDB (e.g., http://localhost:8000)
  AWS_REGION          - AWS region
  AWS_PROFILE         - AWS profile used when no profile flag is given"
)]
pub struct Args {
    /// JSON file holding the copy parameters instead of the flags below.
    #[arg(
        short = 'c',
        long,
        alias = "config_file",
        value_name = "PATH",
        conflicts_with_all = [
            "source_table",
            "destination_table",
            "source_profile",
            "destination_profile",
            "staging_read_capacity",
            "staging_write_capacity",
            "ultimate_read_capacity",
            "ultimate_write_capacity",
            "deep_copy",
            "shallow_copy",
        ]
    )]
    pub config_file: Option<PathBuf>,

    /// Source table name.
    #[arg(short, long, alias = "source_table", required_unless_present = "config_file")]
    pub source_table: Option<String>,

    /// Destination table name; must not exist yet.
    #[arg(short, long, alias = "destination_table", required_unless_present = "config_file")]
    pub destination_table: Option<String>,

    /// AWS profile for the source table.
    #[arg(long, alias = "source_profile")]
    pub source_profile: Option<String>,

    /// AWS profile for the destination table.
    #[arg(long, alias = "destination_profile")]
    pub destination_profile: Option<String>,

    /// Read capacity of the destination while the data is loaded.
    #[arg(
        long,
        alias = "destination_table_staging_read_capacity",
        default_value_t = DEFAULT_STAGING_CAPACITY.read_units,
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    pub staging_read_capacity: i64,

    /// Write capacity of the destination while the data is loaded.
    #[arg(
        long,
        alias = "destination_table_staging_write_capacity",
        default_value_t = DEFAULT_STAGING_CAPACITY.write_units,
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    pub staging_write_capacity: i64,

    /// Read capacity of the destination once the copy is done.
    #[arg(
        long,
        alias = "destination_table_ultimate_read_capacity",
        default_value_t = DEFAULT_ULTIMATE_CAPACITY.read_units,
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    pub ultimate_read_capacity: i64,

    /// Write capacity of the destination once the copy is done.
    #[arg(
        long,
        alias = "destination_table_ultimate_write_capacity",
        default_value_t = DEFAULT_ULTIMATE_CAPACITY.write_units,
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    pub ultimate_write_capacity: i64,

    /// Copy the items as well as the schema.
    #[arg(long, conflicts_with = "shallow_copy")]
    pub deep_copy: bool,

    /// Copy the schema only (default).
    #[arg(long)]
    pub shallow_copy: bool,

    /// AWS region for both tables.
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Custom DynamoDB endpoint for both tables.
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// Log every batch and poll.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    pub fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else if self.quiet {
            Level::WARN
        } else {
            Level::INFO
        }
    }

    /// Builds the copy policy from the config file or the flags.
    pub fn policy(&self) -> Result<CopyPolicy> {
        let policy = match &self.config_file {
            Some(path) => load_config_file(path)?,
            None => CopyPolicy {
                source_table: self
                    .source_table
                    .clone()
                    .ok_or_else(|| anyhow!("--source-table is required"))?,
                destination_table: self
                    .destination_table
                    .clone()
                    .ok_or_else(|| anyhow!("--destination-table is required"))?,
                source_profile: self.source_profile.clone(),
                destination_profile: self.destination_profile.clone(),
                staging: Capacity::new(self.staging_read_capacity, self.staging_write_capacity),
                ultimate: Capacity::new(self.ultimate_read_capacity, self.ultimate_write_capacity),
                mode: if self.deep_copy {
                    CopyMode::Deep
                } else {
                    CopyMode::Shallow
                },
            },
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Connection settings for one side of the copy.
    pub fn connection(&self, profile: Option<&str>) -> ConnectionOptions {
        ConnectionOptions {
            profile: profile.map(str::to_string),
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
        }
    }
}

/// `copy_mode` is a boolean (`true` = deep) in existing config files; the
/// mode names are accepted as well.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CopyModeSetting {
    Deep(bool),
    Named(CopyMode),
}

impl From<CopyModeSetting> for CopyMode {
    fn from(setting: CopyModeSetting) -> Self {
        match setting {
            CopyModeSetting::Deep(true) => CopyMode::Deep,
            CopyModeSetting::Deep(false) => CopyMode::Shallow,
            CopyModeSetting::Named(mode) => mode,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    source_table: Option<String>,
    destination_table: Option<String>,
    source_profile: Option<String>,
    destination_profile: Option<String>,
    destination_table_staging_read_capacity: Option<i64>,
    destination_table_staging_write_capacity: Option<i64>,
    destination_table_ultimate_read_capacity: Option<i64>,
    destination_table_ultimate_write_capacity: Option<i64>,
    copy_mode: Option<CopyModeSetting>,
}

/// Reads a copy policy from a JSON config file.
pub fn load_config_file(path: &Path) -> Result<CopyPolicy> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_config(&contents)
        .with_context(|| format!("Invalid config file {}", path.display()))
}

/// Parses a JSON config, applying the default capacities for omitted keys.
pub fn parse_config(contents: &str) -> Result<CopyPolicy> {
    let config: ConfigFile = serde_json::from_str(contents)?;

    Ok(CopyPolicy {
        source_table: config
            .source_table
            .ok_or_else(|| anyhow!("missing key 'source_table'"))?,
        destination_table: config
            .destination_table
            .ok_or_else(|| anyhow!("missing key 'destination_table'"))?,
        source_profile: config.source_profile,
        destination_profile: config.destination_profile,
        staging: Capacity::new(
            config
                .destination_table_staging_read_capacity
                .unwrap_or(DEFAULT_STAGING_CAPACITY.read_units),
            config
                .destination_table_staging_write_capacity
                .unwrap_or(DEFAULT_STAGING_CAPACITY.write_units),
        ),
        ultimate: Capacity::new(
            config
                .destination_table_ultimate_read_capacity
                .unwrap_or(DEFAULT_ULTIMATE_CAPACITY.read_units),
            config
                .destination_table_ultimate_write_capacity
                .unwrap_or(DEFAULT_ULTIMATE_CAPACITY.write_units),
        ),
        mode: config.copy_mode.map(CopyMode::from).unwrap_or_default(),
    })
}
