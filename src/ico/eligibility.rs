use alloy::primitives::{Address, U256};
use futures::{stream, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    error::{IcoError, Result},
    ledger::{NftLedger, TokenLedger},
};

/// Counts the NFTs held by an address whose token allotment is still unclaimed
pub struct ClaimEligibilityCalculator {
    nft: Arc<dyn NftLedger>,
    token: Arc<dyn TokenLedger>,
    concurrency: usize,
}

impl ClaimEligibilityCalculator {
    pub fn new(nft: Arc<dyn NftLedger>, token: Arc<dyn TokenLedger>, concurrency: usize) -> Self {
        Self {
            nft,
            token,
            concurrency: concurrency.max(1),
        }
    }

    /// Number of owned NFTs not yet redeemed for tokens.
    ///
    /// Any failed lookup fails the whole computation; there is no partial count.
    pub async fn compute_claimable(&self, owner: Address) -> Result<u64> {
        self.count_unclaimed(owner)
            .await
            .map_err(|e| e.in_read_context("eligibility query failed"))
    }

    async fn count_unclaimed(&self, owner: Address) -> Result<u64> {
        let balance = self.nft.balance_of(owner).await?;
        if balance.is_zero() {
            debug!("{} holds no NFTs", owner);
            return Ok(0);
        }

        let held = u64::try_from(balance)
            .map_err(|_| IcoError::ReadQuery(format!("implausible NFT balance {}", balance)))?;

        let unclaimed = stream::iter(0..held)
            .map(|index| self.is_unclaimed(owner, U256::from(index)))
            .buffer_unordered(self.concurrency)
            .try_fold(0u64, |count, unclaimed| async move {
                Ok::<_, IcoError>(if unclaimed { count + 1 } else { count })
            })
            .await?;

        info!("{} holds {} NFTs, {} unclaimed", owner, held, unclaimed);
        Ok(unclaimed)
    }

    async fn is_unclaimed(&self, owner: Address, index: U256) -> Result<bool> {
        let token_id = self.nft.token_of_owner_by_index(owner, index).await?;
        let claimed = self.token.token_ids_claimed(token_id).await?;
        Ok(!claimed)
    }
}
