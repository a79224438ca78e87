use alloy::primitives::{Address, U256};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{IcoError, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub network: NetworkConfig,
    pub contracts: ContractsConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub ico: IcoConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    pub rpc_url: String,
    /// Expected chain id; connecting to any other chain is rejected
    pub chain_id: Option<u64>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContractsConfig {
    pub nft_address: String,
    pub token_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WalletConfig {
    /// Name of the environment variable holding the hex private key
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IcoConfig {
    /// Price of one whole token, in wei
    #[serde(default = "default_token_price_wei")]
    pub token_price_wei: String,
    #[serde(default = "default_tokens_per_nft")]
    pub tokens_per_nft: u64,
    #[serde(default = "default_max_total_supply")]
    pub max_total_supply: u64,
    #[serde(default = "default_claim_query_concurrency")]
    pub claim_query_concurrency: usize,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_confirmation_timeout_secs() -> u64 {
    180
}

fn default_private_key_env() -> String {
    "PRIVATE_KEY".to_string()
}

fn default_token_price_wei() -> String {
    // 0.001 ether
    "1000000000000000".to_string()
}

fn default_tokens_per_nft() -> u64 {
    10
}

fn default_max_total_supply() -> u64 {
    10_000
}

fn default_claim_query_concurrency() -> usize {
    16
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key_env: default_private_key_env(),
        }
    }
}

impl Default for IcoConfig {
    fn default() -> Self {
        Self {
            token_price_wei: default_token_price_wei(),
            tokens_per_nft: default_tokens_per_nft(),
            max_total_supply: default_max_total_supply(),
            claim_query_concurrency: default_claim_query_concurrency(),
        }
    }
}

/// Empty variables (as left by a copied `.env.example`) do not override file values
fn env_source() -> config::Environment {
    config::Environment::with_prefix("CRYPTO_DEVS")
        .separator("__")
        .ignore_empty(true)
}

impl Config {
    /// Load `config/default`, then the user file (if any), then `CRYPTO_DEVS__*` env vars
    pub fn load(path: Option<&str>) -> Result<Self> {
        dotenv::dotenv().ok();
        Self::load_with(path, env_source())
    }

    fn load_with(path: Option<&str>, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(std::path::Path::new(path)));
        }

        let config: Config = builder
            .add_source(env)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.network.request_timeout_secs == 0 || self.network.confirmation_timeout_secs == 0 {
            return Err(IcoError::Config("timeouts must be greater than zero".to_string()));
        }
        if self.ico.claim_query_concurrency == 0 {
            return Err(IcoError::Config(
                "claim_query_concurrency must be greater than zero".to_string(),
            ));
        }
        self.nft_address()?;
        self.token_address()?;
        self.token_price()?;
        Ok(())
    }

    pub fn nft_address(&self) -> Result<Address> {
        Address::from_str(&self.contracts.nft_address)
            .map_err(|e| IcoError::Config(format!("Invalid NFT contract address: {}", e)))
    }

    pub fn token_address(&self) -> Result<Address> {
        Address::from_str(&self.contracts.token_address)
            .map_err(|e| IcoError::Config(format!("Invalid token contract address: {}", e)))
    }

    pub fn token_price(&self) -> Result<U256> {
        U256::from_str(self.ico.token_price_wei.trim())
            .map_err(|e| IcoError::Config(format!("Invalid token price: {}", e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.network.request_timeout_secs)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.network.confirmation_timeout_secs)
    }

    /// Private key from the configured environment variable, if set
    pub fn private_key(&self) -> Option<String> {
        std::env::var(&self.wallet.private_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}
