use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::LookbackWindow;

/// Crypto Fee Analytics CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "crypto-fee-analytics",
    version,
    about = "Bitcoin and Ethereum transaction volume and fee charts"
)]
pub struct Cli {
    /// Data source to read from (files or warehouse)
    #[arg(long, global = true)]
    pub source: Option<String>,

    /// Directory holding the CSV exports
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Lookback window in years (2, 5 or 10)
    #[arg(long, global = true)]
    pub years: Option<LookbackWindow>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render every chart to its own SVG file
    Report {
        /// Directory the SVG files are written to
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Serve the interactive dashboard
    Serve {
        /// Address to listen on
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
}
