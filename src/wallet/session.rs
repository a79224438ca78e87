use alloy::{
    network::EthereumWallet,
    primitives::Address,
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::{
    config::Config,
    error::{IcoError, Result},
};

/// A connected wallet: the account address plus a signing connection
#[derive(Clone)]
pub struct Session {
    address: Address,
    write: DynProvider,
}

/// Wallet provider built from a local private key and an RPC endpoint
pub struct WalletSession {
    rpc_url: Url,
    signer: Option<PrivateKeySigner>,
    expected_chain_id: Option<u64>,
    request_timeout: Duration,
    read: DynProvider,
}

impl WalletSession {
    pub fn new(
        rpc_url: &str,
        private_key: Option<&str>,
        expected_chain_id: Option<u64>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let rpc_url: Url = rpc_url
            .parse()
            .map_err(|e| IcoError::Connection(format!("Invalid RPC URL {}: {}", rpc_url, e)))?;

        let signer = private_key
            .map(|key| {
                PrivateKeySigner::from_str(key.trim())
                    .map_err(|e| IcoError::Connection(format!("Invalid private key: {}", e)))
            })
            .transpose()?;

        let read = ProviderBuilder::new().connect_http(rpc_url.clone()).erased();

        Ok(Self {
            rpc_url,
            signer,
            expected_chain_id,
            request_timeout,
            read,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let key = config.private_key();
        Self::new(
            &config.network.rpc_url,
            key.as_deref(),
            config.network.chain_id,
            config.request_timeout(),
        )
    }

    /// Whether a private key is available to connect with
    pub fn has_signer(&self) -> bool {
        self.signer.is_some()
    }

    /// Fail with `Connection` unless the node is on the configured chain.
    /// Does nothing when no chain id is configured.
    pub async fn verify_chain(&self) -> Result<()> {
        let Some(expected) = self.expected_chain_id else {
            return Ok(());
        };

        let chain_id = match tokio::time::timeout(self.request_timeout, self.read.get_chain_id()).await {
            Ok(Ok(id)) => id,
            Ok(Err(e)) => {
                return Err(IcoError::Connection(format!("could not reach {}: {}", self.rpc_url, e)))
            }
            Err(_) => return Err(IcoError::Connection(format!("timed out reaching {}", self.rpc_url))),
        };
        debug!("Node reports chain id {}", chain_id);

        check_chain_id(expected, chain_id)
    }

    /// Connect the wallet, verifying the node is on the expected chain
    pub async fn connect(&self) -> Result<Session> {
        let signer = self.signer.clone().ok_or_else(|| {
            IcoError::Connection("no private key configured for this wallet".to_string())
        })?;

        self.verify_chain().await?;

        let address = signer.address();
        let write = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(self.rpc_url.clone())
            .erased();

        info!("Wallet connected: {}", address);
        Ok(Session { address, write })
    }

    /// Read-only connection; needs no wallet
    pub fn read_connection(&self) -> DynProvider {
        self.read.clone()
    }

    /// Signing connection for a connected session
    pub fn write_connection(&self, session: &Session) -> DynProvider {
        session.write.clone()
    }

    pub fn current_address(session: &Session) -> Address {
        session.address
    }
}

fn check_chain_id(expected: u64, actual: u64) -> Result<()> {
    if actual != expected {
        return Err(IcoError::Connection(format!(
            "wrong network: node is on chain {}, expected {}",
            actual, expected
        )));
    }
    Ok(())
}
