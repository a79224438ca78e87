use alloy::primitives::{Address, U256};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    error::{IcoError, Result},
    ico::{
        eligibility::ClaimEligibilityCalculator,
        pricing,
        state::{AppState, ReadTarget, StateEvent, TxAction},
    },
    ledger::{NftLedger, Receipt, TokenLedger, TokenLedgerWriter},
};

/// ICO parameters the controller needs from configuration
#[derive(Debug, Clone)]
pub struct IcoSettings {
    pub token_price_wei: U256,
    pub tokens_per_nft: u64,
    pub claim_query_concurrency: usize,
}

/// Owns the application state and runs every user action against the ledgers.
///
/// All operations take `&mut self`, so only one action is in flight at a time.
pub struct IcoController {
    state: AppState,
    token: Arc<dyn TokenLedger>,
    writer: Option<Arc<dyn TokenLedgerWriter>>,
    eligibility: ClaimEligibilityCalculator,
    settings: IcoSettings,
}

impl IcoController {
    pub fn new(
        nft: Arc<dyn NftLedger>,
        token: Arc<dyn TokenLedger>,
        writer: Option<Arc<dyn TokenLedgerWriter>>,
        settings: IcoSettings,
    ) -> Self {
        let eligibility = ClaimEligibilityCalculator::new(
            nft,
            token.clone(),
            settings.claim_query_concurrency,
        );
        Self {
            state: AppState::default(),
            token,
            writer,
            eligibility,
            settings,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn settings(&self) -> &IcoSettings {
        &self.settings
    }

    fn transition(&mut self, event: StateEvent) {
        self.state = std::mem::take(&mut self.state).apply(event);
    }

    fn record<T>(&mut self, target: ReadTarget, result: &Result<T>) {
        if let Err(e) = result {
            warn!("Failed to load {}: {}", target, e);
            self.transition(StateEvent::ReadFailed {
                target,
                error: e.to_string(),
            });
        }
    }

    fn connected_address(&self) -> Result<Address> {
        self.state.address.ok_or(IcoError::NotConnected)
    }

    fn writer(&self) -> Result<Arc<dyn TokenLedgerWriter>> {
        self.writer.clone().ok_or(IcoError::NotConnected)
    }

    /// Adopt `address` as the connected account and load everything shown for it
    pub async fn connect(&mut self, address: Address) -> Result<()> {
        self.transition(StateEvent::Connected(address));
        self.refresh().await
    }

    /// Reload every displayed value. Each read is attempted; the first failure is returned.
    pub async fn refresh(&mut self) -> Result<()> {
        self.transition(StateEvent::RefreshStarted);

        let claimable = self.get_tokens_to_be_claimed().await.map(|_| ());
        let balance = self.get_balance_of_crypto_dev_tokens().await.map(|_| ());
        let minted = self.get_total_tokens_minted().await.map(|_| ());
        let owner = self.get_owner().await.map(|_| ());

        claimable.and(balance).and(minted).and(owner)
    }

    /// Unclaimed NFT allotments of the connected account
    pub async fn get_tokens_to_be_claimed(&mut self) -> Result<u64> {
        let address = self.connected_address()?;
        let result = self.eligibility.compute_claimable(address).await;
        self.record(ReadTarget::Claimable, &result);
        let count = result?;
        self.transition(StateEvent::ClaimableLoaded(count));
        Ok(count)
    }

    /// Unclaimed NFT allotments of any address; leaves the state untouched
    pub async fn claimable_for(&self, address: Address) -> Result<u64> {
        self.eligibility.compute_claimable(address).await
    }

    pub async fn get_balance_of_crypto_dev_tokens(&mut self) -> Result<U256> {
        let address = self.connected_address()?;
        let result = self.token.balance_of(address).await;
        self.record(ReadTarget::Balance, &result);
        let balance = result?;
        self.transition(StateEvent::BalanceLoaded(balance));
        Ok(balance)
    }

    pub async fn get_total_tokens_minted(&mut self) -> Result<U256> {
        let result = self.token.total_supply().await;
        self.record(ReadTarget::TotalMinted, &result);
        let supply = result?;
        self.transition(StateEvent::TotalMintedLoaded(supply));
        Ok(supply)
    }

    /// Whether the connected account owns the token contract
    pub async fn get_owner(&mut self) -> Result<bool> {
        let address = self.connected_address()?;
        let result = self.token.owner().await;
        self.record(ReadTarget::Owner, &result);
        let is_owner = result? == address;
        self.transition(StateEvent::OwnerLoaded(is_owner));
        Ok(is_owner)
    }

    /// Mint `amount` whole tokens, paying the configured price per token
    pub async fn mint_crypto_dev_tokens(&mut self, amount: u64) -> Result<Receipt> {
        self.connected_address()?;
        let payment = pricing::mint_payment(amount, self.settings.token_price_wei)?;

        let receipt = self.execute(TxAction::Mint { amount, payment }).await?;
        info!("Successfully minted {} Crypto Dev Tokens", amount);

        self.refresh_after_write(&[ReadTarget::Balance, ReadTarget::TotalMinted, ReadTarget::Claimable])
            .await;
        Ok(receipt)
    }

    /// Claim the tokens owed for every unclaimed NFT held
    pub async fn claim_crypto_dev_tokens(&mut self) -> Result<Receipt> {
        self.connected_address()?;

        let receipt = self.execute(TxAction::Claim).await?;
        info!("Successfully claimed Crypto Dev Tokens");

        self.refresh_after_write(&[ReadTarget::Claimable, ReadTarget::Balance, ReadTarget::TotalMinted])
            .await;
        Ok(receipt)
    }

    /// Move the ether collected by the sale to the owner. Owner only.
    pub async fn withdraw_coins(&mut self) -> Result<Receipt> {
        let address = self.connected_address()?;
        if !self.get_owner().await? {
            return Err(IcoError::NotOwner(format!("{} does not own the token contract", address)));
        }

        let receipt = self.execute(TxAction::Withdraw).await?;
        info!("Withdrew sale proceeds to {}", address);

        self.refresh_after_write(&[ReadTarget::Owner]).await;
        Ok(receipt)
    }

    /// submit → await confirmation, with the phase tracked in state
    async fn execute(&mut self, action: TxAction) -> Result<Receipt> {
        let writer = self.writer()?;
        info!("Submitting {}", action);
        self.transition(StateEvent::Submitted(action.clone()));

        let submitted = match &action {
            TxAction::Mint { amount, payment } => writer.mint(U256::from(*amount), *payment).await,
            TxAction::Claim => writer.claim().await,
            TxAction::Withdraw => writer.withdraw().await,
        };

        let tx_hash = match submitted {
            Ok(hash) => hash,
            Err(e) => {
                self.transition(StateEvent::WriteFailed(e.to_string()));
                return Err(e);
            }
        };
        self.transition(StateEvent::Broadcast(tx_hash));

        match writer.await_confirmation(tx_hash).await {
            Ok(receipt) => {
                self.transition(StateEvent::Confirmed(receipt.clone()));
                Ok(receipt)
            }
            Err(e) => {
                self.transition(StateEvent::WriteFailed(e.to_string()));
                Err(e)
            }
        }
    }

    /// The write already succeeded; read failures here only land in state
    async fn refresh_after_write(&mut self, targets: &[ReadTarget]) {
        for target in targets {
            let outcome = match target {
                ReadTarget::Claimable => self.get_tokens_to_be_claimed().await.map(|_| ()),
                ReadTarget::Balance => self.get_balance_of_crypto_dev_tokens().await.map(|_| ()),
                ReadTarget::TotalMinted => self.get_total_tokens_minted().await.map(|_| ()),
                ReadTarget::Owner => self.get_owner().await.map(|_| ()),
            };
            if let Err(e) = outcome {
                warn!("Refresh of {} after confirmed transaction failed: {}", target, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ico::state::TxPhase;
    use crate::ledger::{MockNftLedger, MockTokenLedger, MockTokenLedgerWriter};
    use alloy::primitives::TxHash;
    use mockall::predicate::eq;
    use std::sync::atomic::{AtomicBool, Ordering};

    const PRICE: u64 = 1_000_000_000_000_000;

    fn user() -> Address {
        Address::repeat_byte(0x11)
    }

    fn deployer() -> Address {
        Address::repeat_byte(0x99)
    }

    fn settings() -> IcoSettings {
        IcoSettings {
            token_price_wei: U256::from(PRICE),
            tokens_per_nft: 10,
            claim_query_concurrency: 4,
        }
    }

    fn receipt(hash: TxHash) -> Receipt {
        Receipt {
            tx_hash: hash,
            block_number: Some(100),
            gas_used: 50_000,
            confirmed_at: chrono::Utc::now(),
        }
    }

    /// User holds NFTs 0, 1 and 2
    fn nft_ledger() -> MockNftLedger {
        let mut nft = MockNftLedger::new();
        nft.expect_balance_of().returning(|_| Ok(U256::from(3)));
        nft.expect_token_of_owner_by_index().returning(|_, index| Ok(index));
        nft
    }

    /// Token 0 is claimed; the rest follow `claimed_all`
    fn token_ledger(claimed_all: Arc<AtomicBool>, owner: Address) -> MockTokenLedger {
        let mut token = MockTokenLedger::new();
        token.expect_token_ids_claimed().returning(move |id| {
            Ok(claimed_all.load(Ordering::SeqCst) || id == U256::ZERO)
        });
        token.expect_balance_of().returning(|_| Ok(pricing::to_base_units(5)));
        token.expect_total_supply().returning(|| Ok(pricing::to_base_units(1_000)));
        token.expect_owner().returning(move || Ok(owner));
        token
    }

    fn controller(
        token: MockTokenLedger,
        writer: Option<MockTokenLedgerWriter>,
    ) -> IcoController {
        IcoController::new(
            Arc::new(nft_ledger()),
            Arc::new(token),
            writer.map(|w| Arc::new(w) as Arc<dyn TokenLedgerWriter>),
            settings(),
        )
    }

    #[tokio::test]
    async fn test_connect_loads_everything() {
        let token = token_ledger(Arc::new(AtomicBool::new(false)), deployer());
        let mut ico = controller(token, None);

        ico.connect(user()).await.unwrap();

        let state = ico.state();
        assert!(state.wallet_connected());
        assert_eq!(state.tokens_to_be_claimed, Some(2));
        assert_eq!(state.token_balance, Some(pricing::to_base_units(5)));
        assert_eq!(state.tokens_minted, Some(pricing::to_base_units(1_000)));
        assert_eq!(state.is_owner, Some(false));
        assert!(state.error_messages().is_empty());
    }

    #[tokio::test]
    async fn test_reads_require_connection() {
        let token = token_ledger(Arc::new(AtomicBool::new(false)), deployer());
        let mut ico = controller(token, None);

        assert!(matches!(ico.get_tokens_to_be_claimed().await, Err(IcoError::NotConnected)));
        assert!(matches!(ico.claim_crypto_dev_tokens().await, Err(IcoError::NotConnected)));
    }

    #[tokio::test]
    async fn test_failed_supply_read_keeps_other_values() {
        let mut token = MockTokenLedger::new();
        token.expect_token_ids_claimed().returning(|_| Ok(false));
        token.expect_balance_of().returning(|_| Ok(U256::from(7)));
        token.expect_total_supply()
            .returning(|| Err(IcoError::ReadQuery("totalSupply: timed out after 30s".to_string())));
        token.expect_owner().returning(|| Ok(deployer()));
        let mut ico = controller(token, None);

        let err = ico.connect(user()).await.unwrap_err();
        assert!(matches!(err, IcoError::ReadQuery(_)));

        let state = ico.state();
        assert_eq!(state.tokens_to_be_claimed, Some(3));
        assert_eq!(state.token_balance, Some(U256::from(7)));
        assert_eq!(state.tokens_minted, None);
        assert_eq!(
            state.read_errors.keys().copied().collect::<Vec<_>>(),
            vec![ReadTarget::TotalMinted]
        );
    }

    #[tokio::test]
    async fn test_every_failed_read_stays_visible() {
        let mut nft = MockNftLedger::new();
        nft.expect_balance_of()
            .returning(|_| Err(IcoError::ReadQuery("nft down".to_string())));
        let mut token = MockTokenLedger::new();
        token.expect_balance_of().returning(|_| Ok(U256::from(7)));
        token.expect_total_supply()
            .returning(|| Err(IcoError::ReadQuery("supply down".to_string())));
        token.expect_owner().returning(|| Ok(deployer()));
        let mut ico = IcoController::new(Arc::new(nft), Arc::new(token), None, settings());

        let err = ico.connect(user()).await.unwrap_err();
        assert_eq!(err.to_string(), "Ledger read failed: eligibility query failed: nft down");

        let state = ico.state();
        assert_eq!(state.token_balance, Some(U256::from(7)));
        assert_eq!(
            state.read_errors.keys().copied().collect::<Vec<_>>(),
            vec![ReadTarget::Claimable, ReadTarget::TotalMinted]
        );
        let messages = state.error_messages();
        assert!(messages[0].contains("nft down"));
        assert!(messages[1].contains("supply down"));
    }

    #[tokio::test]
    async fn test_mint_pays_price_and_refreshes() {
        let token = token_ledger(Arc::new(AtomicBool::new(false)), deployer());
        let hash = TxHash::repeat_byte(0x0a);
        let mut writer = MockTokenLedgerWriter::new();
        writer.expect_mint()
            .with(eq(U256::from(5)), eq(U256::from(5 * PRICE)))
            .times(1)
            .returning(move |_, _| Ok(hash));
        writer.expect_await_confirmation()
            .with(eq(hash))
            .times(1)
            .returning(|hash| Ok(receipt(hash)));
        let mut ico = controller(token, Some(writer));
        ico.connect(user()).await.unwrap();

        let confirmed = ico.mint_crypto_dev_tokens(5).await.unwrap();

        assert_eq!(confirmed.tx_hash, hash);
        let state = ico.state();
        assert_eq!(state.phase, TxPhase::Idle);
        assert_eq!(state.last_receipt.as_ref().map(|r| r.tx_hash), Some(hash));
        assert_eq!(state.token_balance, Some(pricing::to_base_units(5)));
        assert_eq!(state.tokens_to_be_claimed, Some(2));
    }

    #[tokio::test]
    async fn test_mint_zero_submits_nothing() {
        let token = token_ledger(Arc::new(AtomicBool::new(false)), deployer());
        let mut writer = MockTokenLedgerWriter::new();
        writer.expect_mint().never();
        let mut ico = controller(token, Some(writer));
        ico.connect(user()).await.unwrap();

        let err = ico.mint_crypto_dev_tokens(0).await.unwrap_err();
        assert!(matches!(err, IcoError::InvalidAmount(_)));
        assert_eq!(ico.state().phase, TxPhase::Idle);
    }

    #[tokio::test]
    async fn test_claim_then_nothing_left() {
        let claimed_all = Arc::new(AtomicBool::new(false));
        let token = token_ledger(claimed_all.clone(), deployer());
        let hash = TxHash::repeat_byte(0x0c);
        let mut writer = MockTokenLedgerWriter::new();
        writer.expect_claim().times(1).returning(move || Ok(hash));
        writer.expect_await_confirmation().times(1).returning(move |hash| {
            claimed_all.store(true, Ordering::SeqCst);
            Ok(receipt(hash))
        });
        let mut ico = controller(token, Some(writer));
        ico.connect(user()).await.unwrap();
        assert_eq!(ico.state().tokens_to_be_claimed, Some(2));

        ico.claim_crypto_dev_tokens().await.unwrap();

        assert_eq!(ico.state().tokens_to_be_claimed, Some(0));
        assert_eq!(ico.get_tokens_to_be_claimed().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejected_claim_is_reported() {
        let token = token_ledger(Arc::new(AtomicBool::new(false)), deployer());
        let mut writer = MockTokenLedgerWriter::new();
        writer.expect_claim()
            .returning(|| Err(IcoError::WriteTransaction("claim: execution reverted".to_string())));
        writer.expect_await_confirmation().never();
        let mut ico = controller(token, Some(writer));
        ico.connect(user()).await.unwrap();

        let err = ico.claim_crypto_dev_tokens().await.unwrap_err();

        assert!(matches!(err, IcoError::WriteTransaction(_)));
        let state = ico.state();
        assert_eq!(state.phase, TxPhase::Idle);
        assert!(state.write_error.is_some());
        assert!(state.read_errors.is_empty());
        assert_eq!(state.tokens_to_be_claimed, Some(2));
    }

    #[tokio::test]
    async fn test_reverted_confirmation_is_reported() {
        let token = token_ledger(Arc::new(AtomicBool::new(false)), deployer());
        let hash = TxHash::repeat_byte(0x0d);
        let mut writer = MockTokenLedgerWriter::new();
        writer.expect_mint().returning(move |_, _| Ok(hash));
        writer.expect_await_confirmation()
            .returning(|hash| Err(IcoError::WriteTransaction(format!("transaction {} reverted", hash))));
        let mut ico = controller(token, Some(writer));
        ico.connect(user()).await.unwrap();

        let err = ico.mint_crypto_dev_tokens(1).await.unwrap_err();

        assert!(matches!(err, IcoError::WriteTransaction(_)));
        assert_eq!(ico.state().phase, TxPhase::Idle);
        assert_eq!(ico.state().last_receipt, None);
    }

    #[tokio::test]
    async fn test_withdraw_requires_owner() {
        let token = token_ledger(Arc::new(AtomicBool::new(false)), deployer());
        let mut writer = MockTokenLedgerWriter::new();
        writer.expect_withdraw().never();
        let mut ico = controller(token, Some(writer));
        ico.connect(user()).await.unwrap();

        let err = ico.withdraw_coins().await.unwrap_err();
        assert!(matches!(err, IcoError::NotOwner(_)));
    }

    #[tokio::test]
    async fn test_owner_can_withdraw() {
        let token = token_ledger(Arc::new(AtomicBool::new(false)), user());
        let hash = TxHash::repeat_byte(0x0e);
        let mut writer = MockTokenLedgerWriter::new();
        writer.expect_withdraw().times(1).returning(move || Ok(hash));
        writer.expect_await_confirmation().times(1).returning(|hash| Ok(receipt(hash)));
        let mut ico = controller(token, Some(writer));
        ico.connect(user()).await.unwrap();
        assert_eq!(ico.state().is_owner, Some(true));

        let confirmed = ico.withdraw_coins().await.unwrap();
        assert_eq!(confirmed.tx_hash, hash);
    }

    #[tokio::test]
    async fn test_write_without_signer_is_not_connected() {
        let token = token_ledger(Arc::new(AtomicBool::new(false)), deployer());
        let mut ico = controller(token, None);
        ico.connect(user()).await.unwrap();

        let err = ico.mint_crypto_dev_tokens(1).await.unwrap_err();
        assert!(matches!(err, IcoError::NotConnected));
        assert_eq!(ico.state().phase, TxPhase::Idle);
    }
}
