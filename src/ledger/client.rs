use alloy::{
    network::ReceiptResponse,
    primitives::{Address, TxHash, U256},
    providers::{DynProvider, PendingTransactionBuilder, Provider},
};
use async_trait::async_trait;
use std::fmt::Display;
use std::future::IntoFuture;
use std::time::Duration;
use tracing::{debug, info};

use crate::{
    error::{IcoError, Result},
    ledger::{
        contracts::{CryptoDevToken, CryptoDevsNFT},
        NftLedger, Receipt, TokenId, TokenLedger, TokenLedgerWriter,
    },
};

/// Run a ledger call under `limit`, flattening transport errors and timeouts into a message
async fn bounded<F, T, E>(limit: Duration, what: &str, call: F) -> std::result::Result<T, String>
where
    F: IntoFuture<Output = std::result::Result<T, E>>,
    E: Display,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(format!("{}: {}", what, e)),
        Err(_) => Err(format!("{}: timed out after {}s", what, limit.as_secs())),
    }
}

/// Turn a mined receipt into a `Receipt`, rejecting reverted transactions
fn confirmed_receipt<R: ReceiptResponse>(tx_hash: TxHash, receipt: &R) -> Result<Receipt> {
    if !receipt.status() {
        return Err(IcoError::WriteTransaction(format!(
            "transaction {} reverted",
            tx_hash
        )));
    }

    debug!("Transaction {} mined in block {:?}", tx_hash, receipt.block_number());
    Ok(Receipt {
        tx_hash: receipt.transaction_hash(),
        block_number: receipt.block_number(),
        gas_used: receipt.gas_used(),
        confirmed_at: chrono::Utc::now(),
    })
}

/// Read access to both contracts over a single provider
#[derive(Clone)]
pub struct EvmLedgerClient {
    nft: CryptoDevsNFT::CryptoDevsNFTInstance<DynProvider>,
    token: CryptoDevToken::CryptoDevTokenInstance<DynProvider>,
    request_timeout: Duration,
}

impl EvmLedgerClient {
    pub fn new(
        provider: DynProvider,
        nft_address: Address,
        token_address: Address,
        request_timeout: Duration,
    ) -> Self {
        Self {
            nft: CryptoDevsNFT::new(nft_address, provider.clone()),
            token: CryptoDevToken::new(token_address, provider),
            request_timeout,
        }
    }
}

#[async_trait]
impl NftLedger for EvmLedgerClient {
    async fn balance_of(&self, owner: Address) -> Result<U256> {
        let call = self.nft.balanceOf(owner);
        bounded(self.request_timeout, "NFT balanceOf", call.call())
            .await
            .map_err(IcoError::ReadQuery)
    }

    async fn token_of_owner_by_index(&self, owner: Address, index: U256) -> Result<TokenId> {
        let call = self.nft.tokenOfOwnerByIndex(owner, index);
        bounded(self.request_timeout, "NFT tokenOfOwnerByIndex", call.call())
            .await
            .map_err(IcoError::ReadQuery)
    }
}

#[async_trait]
impl TokenLedger for EvmLedgerClient {
    async fn token_ids_claimed(&self, token_id: TokenId) -> Result<bool> {
        let call = self.token.tokenIdsClaimed(token_id);
        let claimed = bounded(self.request_timeout, "tokenIdsClaimed", call.call())
            .await
            .map_err(IcoError::ReadQuery)?;
        debug!("Token #{} claimed: {}", token_id, claimed);
        Ok(claimed)
    }

    async fn balance_of(&self, owner: Address) -> Result<U256> {
        let call = self.token.balanceOf(owner);
        bounded(self.request_timeout, "token balanceOf", call.call())
            .await
            .map_err(IcoError::ReadQuery)
    }

    async fn total_supply(&self) -> Result<U256> {
        let call = self.token.totalSupply();
        bounded(self.request_timeout, "totalSupply", call.call())
            .await
            .map_err(IcoError::ReadQuery)
    }

    async fn owner(&self) -> Result<Address> {
        let call = self.token.owner();
        bounded(self.request_timeout, "owner", call.call())
            .await
            .map_err(IcoError::ReadQuery)
    }
}

/// Signs and submits token contract transactions for the connected wallet
pub struct EvmTokenWriter {
    provider: DynProvider,
    token: CryptoDevToken::CryptoDevTokenInstance<DynProvider>,
    request_timeout: Duration,
    confirmation_timeout: Duration,
}

impl EvmTokenWriter {
    pub fn new(
        provider: DynProvider,
        token_address: Address,
        request_timeout: Duration,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            token: CryptoDevToken::new(token_address, provider.clone()),
            provider,
            request_timeout,
            confirmation_timeout,
        }
    }
}

#[async_trait]
impl TokenLedgerWriter for EvmTokenWriter {
    async fn mint(&self, amount: U256, payment: U256) -> Result<TxHash> {
        let call = self.token.mint(amount).value(payment);
        let pending = bounded(self.request_timeout, "mint", call.send())
            .await
            .map_err(IcoError::WriteTransaction)?;
        info!("Submitted mint of {} tokens: {}", amount, pending.tx_hash());
        Ok(*pending.tx_hash())
    }

    async fn claim(&self) -> Result<TxHash> {
        let call = self.token.claim();
        let pending = bounded(self.request_timeout, "claim", call.send())
            .await
            .map_err(IcoError::WriteTransaction)?;
        info!("Submitted claim: {}", pending.tx_hash());
        Ok(*pending.tx_hash())
    }

    async fn withdraw(&self) -> Result<TxHash> {
        let call = self.token.withdraw();
        let pending = bounded(self.request_timeout, "withdraw", call.send())
            .await
            .map_err(IcoError::WriteTransaction)?;
        info!("Submitted withdraw: {}", pending.tx_hash());
        Ok(*pending.tx_hash())
    }

    async fn await_confirmation(&self, tx_hash: TxHash) -> Result<Receipt> {
        let pending = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash);
        let receipt = bounded(self.confirmation_timeout, "confirmation", pending.get_receipt())
            .await
            .map_err(IcoError::WriteTransaction)?;

        confirmed_receipt(tx_hash, &receipt)
    }
}
