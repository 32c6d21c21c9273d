//! synctags
//!
//! Fetch, store and re-apply normalized tags for Qualys, CrowdStrike and
//! NinjaOne.
//!
//! # Usage
//! ```bash
//! # Fetch all Qualys tags into qualys_tags.yml
//! synctags qualys get
//!
//! # Apply a tag file to NinjaOne
//! synctags ninjaone create --input ninjaone_tags.yml
//!
//! # Fetch and re-apply CrowdStrike tags (normalizes names in place)
//! synctags crowdstrike sync
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use reqwest::Client;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use synctags::config::SyncTagsConfig;
use synctags::tags::providers::{CrowdStrikeAdapter, NinjaOneAdapter, QualysAdapter};
use synctags::tags::{PullReport, PushReport, TagAdapter, TagSyncAgent, Vendor};

// ============================================================
// CLI Definition
// ============================================================

#[derive(Parser)]
#[command(name = "synctags")]
#[command(about = "Sync tags across multiple integrations", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default is $HOME/.synctags.yaml)
    #[arg(long, global = true, env = "SYNCTAGS_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    vendor: VendorCommand,
}

#[derive(Subcommand)]
enum VendorCommand {
    /// Operate on Qualys tags
    Qualys {
        #[command(subcommand)]
        action: Action,
    },

    /// Operate on CrowdStrike tags
    #[command(name = "crowdstrike")]
    CrowdStrike {
        #[command(subcommand)]
        action: Action,
    },

    /// Operate on NinjaOne tags
    #[command(name = "ninjaone")]
    NinjaOne {
        #[command(subcommand)]
        action: Action,
    },
}

impl VendorCommand {
    fn split(self) -> (Vendor, Action) {
        match self {
            VendorCommand::Qualys { action } => (Vendor::Qualys, action),
            VendorCommand::CrowdStrike { action } => (Vendor::CrowdStrike, action),
            VendorCommand::NinjaOne { action } => (Vendor::NinjaOne, action),
        }
    }
}

#[derive(Subcommand)]
enum Action {
    /// Fetch all tags and write them to a YAML file
    Get {
        /// YAML output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Read a YAML file and create/update its tags
    Create {
        /// YAML input file
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Fetch all tags, then re-apply the fetched file
    Sync {
        /// YAML file written by the fetch and read back by the apply
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// ============================================================
// Main Entry Point
// ============================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs)?;

    let config = SyncTagsConfig::load(cli.config.as_deref())?;
    let (vendor, action) = cli.vendor.split();

    let (input, output) = match &action {
        Action::Get { output } | Action::Sync { output } => (None, output.clone()),
        Action::Create { input } => (input.clone(), None),
    };
    let paths = config.tag_paths(vendor, input, output);

    let http = config.http_client()?;
    let adapter = connect(vendor, &config, http).await?;
    let agent = TagSyncAgent::new(adapter, paths);

    match action {
        Action::Get { .. } => {
            let report = agent.pull().await?;
            print_pull(&report);
        }
        Action::Create { .. } => {
            let report = agent.push().await?;
            print_push(&report);
        }
        Action::Sync { .. } => {
            let report = agent.sync().await?;
            print_pull(&report.pull);
            print_push(&report.push);
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Build and authenticate the adapter for `vendor`
async fn connect(
    vendor: Vendor,
    config: &SyncTagsConfig,
    http: Client,
) -> Result<Box<dyn TagAdapter>> {
    info!(vendor = %vendor, "Connecting to {}", vendor.display_name());

    let adapter: Box<dyn TagAdapter> = match vendor {
        Vendor::Qualys => {
            Box::new(QualysAdapter::connect(config.qualys_credentials()?, http).await?)
        }
        Vendor::CrowdStrike => {
            Box::new(CrowdStrikeAdapter::connect(config.crowdstrike_credentials()?, http).await?)
        }
        Vendor::NinjaOne => {
            Box::new(NinjaOneAdapter::connect(config.ninjaone_credentials()?, http).await?)
        }
    };

    Ok(adapter)
}

fn print_pull(report: &PullReport) {
    println!("Wrote {} tags to {}", report.written, report.path.display());
}

fn print_push(report: &PushReport) {
    for failure in &report.failures {
        eprintln!(
            "Failed to upsert {} tag {}: {}",
            report.vendor.display_name(),
            failure.name,
            failure.error
        );
    }
    println!(
        "Processed {} tags in {} ({} failed)",
        report.processed,
        report.vendor.display_name(),
        report.failed
    );
}
