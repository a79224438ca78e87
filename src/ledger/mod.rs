pub mod client;
pub mod contracts;

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

#[cfg(test)]
use mockall::automock;

pub use client::{EvmLedgerClient, EvmTokenWriter};

/// Identifier of one Crypto Devs NFT
pub type TokenId = U256;

/// Confirmed transaction as observed by this client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub confirmed_at: DateTime<Utc>,
}

/// Read side of the Crypto Devs NFT contract
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NftLedger: Send + Sync {
    async fn balance_of(&self, owner: Address) -> Result<U256>;

    async fn token_of_owner_by_index(&self, owner: Address, index: U256) -> Result<TokenId>;
}

/// Read side of the Crypto Dev Token contract
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TokenLedger: Send + Sync {
    /// Whether the allotment linked to `token_id` has been claimed
    async fn token_ids_claimed(&self, token_id: TokenId) -> Result<bool>;

    /// Token balance in base units
    async fn balance_of(&self, owner: Address) -> Result<U256>;

    /// Total minted supply in base units
    async fn total_supply(&self) -> Result<U256>;

    async fn owner(&self) -> Result<Address>;
}

/// Write side of the Crypto Dev Token contract.
///
/// Submissions return as soon as the node accepts the transaction; the hash
/// is then resolved with [`TokenLedgerWriter::await_confirmation`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TokenLedgerWriter: Send + Sync {
    /// Mint `amount` whole tokens, paying `payment` wei
    async fn mint(&self, amount: U256, payment: U256) -> Result<TxHash>;

    async fn claim(&self) -> Result<TxHash>;

    async fn withdraw(&self) -> Result<TxHash>;

    /// Wait until the transaction is mined; a reverted transaction is an error
    async fn await_confirmation(&self, tx_hash: TxHash) -> Result<Receipt>;
}
