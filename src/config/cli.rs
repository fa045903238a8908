use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "smartpost")]
#[command(about = "Create, track and print Smartpost parcel shipments")]
pub struct CliConfig {
    #[arg(long, short, help = "TOML client configuration")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Override the API base URL from the configuration")]
    pub base_url: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Register shipments listed in a TOML file ([[shipment]] tables)
    Ship {
        #[arg(long, short)]
        input: PathBuf,
    },
    /// Show tracking information for barcodes
    Track {
        #[arg(long = "barcode", short, required = true)]
        barcodes: Vec<String>,
    },
    /// Download the label document for barcodes
    Labels {
        #[arg(long = "barcode", short, required = true)]
        barcodes: Vec<String>,

        #[arg(long, default_value = "A5")]
        format: String,

        #[arg(long, short)]
        output: PathBuf,
    },
}
