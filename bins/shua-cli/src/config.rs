//! CLI configuration loaded from environment variables.

use std::path::PathBuf;

use anyhow::{Context, Result};
use shua_core::address::Network;

const DEFAULT_API_URL: &str = "https://api.bitails.io";
const DEFAULT_APP_NAME: &str = "shuallet";

#[derive(Clone, Debug)]
pub struct Config {
    /// Network new wallets are created on.
    pub network: Network,
    /// Base URL of the unspent-output indexer.
    pub indexer_url: String,
    /// Base URL of the transaction relay.
    pub broadcast_url: String,
    /// Path to the encrypted wallet file.
    pub wallet_path: PathBuf,
    /// App name stamped into every social record.
    pub app_name: String,
    /// Wallet password; prompted for when unset.
    pub wallet_password: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let network = std::env::var("SHUA_NETWORK")
            .unwrap_or_else(|_| "mainnet".to_string())
            .parse::<Network>()
            .map_err(anyhow::Error::msg)
            .context("SHUA_NETWORK must be 'mainnet' or 'testnet'")?;

        let indexer_url =
            std::env::var("SHUA_INDEXER_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let broadcast_url =
            std::env::var("SHUA_BROADCAST_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let wallet_path = match std::env::var("SHUA_WALLET_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_wallet_path()?,
        };

        let app_name =
            std::env::var("SHUA_APP_NAME").unwrap_or_else(|_| DEFAULT_APP_NAME.to_string());

        let wallet_password = std::env::var("SHUA_WALLET_PASSWORD").ok();

        Ok(Config {
            network,
            indexer_url,
            broadcast_url,
            wallet_path,
            app_name,
            wallet_password,
        })
    }
}

fn default_wallet_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".shua").join("wallet.dat"))
}
