use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cli::{Cli, Command};
use crate::error::AppError;
use crate::models::LookbackWindow;
use crate::sources::files::{FileOverrides, FilePaths};
use crate::sources::warehouse::{DEFAULT_TIMEOUT_MS, DEFAULT_WAREHOUSE_URL};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_OUT_DIR: &str = "charts";
pub const DEFAULT_DASHBOARD_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceKind,
    pub files: FilePaths,
    pub file_overrides: FileOverrides,
    pub warehouse: Option<WarehouseConfig>,
    pub window: LookbackWindow,
    pub out_dir: PathBuf,
    pub dashboard_addr: SocketAddr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Files,
    Warehouse,
}

impl FromStr for SourceKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "files" => Ok(SourceKind::Files),
            "warehouse" => Ok(SourceKind::Warehouse),
            other => Err(AppError::Config(format!("Invalid FEE_SOURCE: {}", other))),
        }
    }
}

#[derive(Clone)]
pub struct WarehouseConfig {
    pub base_url: String,
    pub project: String,
    pub token: String,
    pub timeout_ms: u64,
    pub bitcoin_table: Option<String>,
    pub ethereum_table: Option<String>,
}

// Keeps the token out of the startup log line.
impl fmt::Debug for WarehouseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseConfig")
            .field("base_url", &self.base_url)
            .field("project", &self.project)
            .field("token", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .field("bitcoin_table", &self.bitcoin_table)
            .field("ethereum_table", &self.ethereum_table)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = match lookup("FEE_SOURCE") {
            Some(value) => value.parse()?,
            None => SourceKind::Files,
        };

        let data_dir = lookup("FEE_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        let file_overrides = FileOverrides {
            btc_monthly: lookup("BTC_MONTHLY_CSV").map(PathBuf::from),
            eth_monthly: lookup("ETH_MONTHLY_CSV").map(PathBuf::from),
            btc_daily: lookup("BTC_DAILY_CSV").map(PathBuf::from),
            eth_daily: lookup("ETH_DAILY_CSV").map(PathBuf::from),
        };
        let files = FilePaths::resolve(data_dir, &file_overrides);

        let warehouse = match (lookup("WAREHOUSE_PROJECT"), lookup("WAREHOUSE_TOKEN")) {
            (Some(project), Some(token)) => Some(WarehouseConfig {
                base_url: lookup("WAREHOUSE_URL")
                    .unwrap_or_else(|| DEFAULT_WAREHOUSE_URL.to_string()),
                project,
                token,
                timeout_ms: match lookup("WAREHOUSE_TIMEOUT_MS") {
                    Some(value) => value.parse::<u64>().map_err(|_| {
                        AppError::Config("WAREHOUSE_TIMEOUT_MS must be a valid number".into())
                    })?,
                    None => DEFAULT_TIMEOUT_MS,
                },
                bitcoin_table: lookup("WAREHOUSE_BTC_TABLE"),
                ethereum_table: lookup("WAREHOUSE_ETH_TABLE"),
            }),
            _ => None,
        };

        let window = match lookup("LOOKBACK_YEARS") {
            Some(value) => value
                .parse::<LookbackWindow>()
                .map_err(|err| AppError::Config(format!("LOOKBACK_YEARS: {}", err)))?,
            None => LookbackWindow::default(),
        };

        let out_dir = lookup("REPORT_OUT_DIR")
            .unwrap_or_else(|| DEFAULT_OUT_DIR.to_string())
            .into();

        let dashboard_addr = lookup("DASHBOARD_ADDR")
            .unwrap_or_else(|| DEFAULT_DASHBOARD_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|_| AppError::Config("DASHBOARD_ADDR must be a socket address".into()))?;

        Ok(Self {
            source,
            files,
            file_overrides,
            warehouse,
            window,
            out_dir,
            dashboard_addr,
        })
    }

    /// Let command-line flags win over the environment.
    pub fn apply_cli(&mut self, cli: &Cli) -> Result<(), AppError> {
        if let Some(source) = &cli.source {
            self.source = source.parse()?;
        }
        if let Some(dir) = &cli.data_dir {
            self.files = FilePaths::resolve(dir, &self.file_overrides);
        }
        if let Some(window) = cli.years {
            self.window = window;
        }
        match &cli.command {
            Command::Report { out_dir } => {
                if let Some(dir) = out_dir {
                    self.out_dir = dir.clone();
                }
            }
            Command::Serve { addr } => {
                if let Some(addr) = addr {
                    self.dashboard_addr = *addr;
                }
            }
        }
        Ok(())
    }
}
