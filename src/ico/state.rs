use alloy::primitives::{Address, TxHash, U256};
use std::collections::BTreeMap;

use crate::ledger::Receipt;

/// Write operations the controller can sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxAction {
    Mint { amount: u64, payment: U256 },
    Claim,
    Withdraw,
}

impl std::fmt::Display for TxAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxAction::Mint { amount, .. } => write!(f, "mint {} tokens", amount),
            TxAction::Claim => write!(f, "claim"),
            TxAction::Withdraw => write!(f, "withdraw"),
        }
    }
}

/// idle → awaiting confirmation → idle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TxPhase {
    #[default]
    Idle,
    AwaitingConfirmation {
        action: TxAction,
        tx_hash: Option<TxHash>,
    },
}

/// Which on-screen value a read was refreshing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadTarget {
    Claimable,
    Balance,
    TotalMinted,
    Owner,
}

impl std::fmt::Display for ReadTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadTarget::Claimable => write!(f, "claimable tokens"),
            ReadTarget::Balance => write!(f, "token balance"),
            ReadTarget::TotalMinted => write!(f, "total minted"),
            ReadTarget::Owner => write!(f, "owner"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    Connected(Address),
    RefreshStarted,
    ClaimableLoaded(u64),
    BalanceLoaded(U256),
    TotalMintedLoaded(U256),
    OwnerLoaded(bool),
    ReadFailed { target: ReadTarget, error: String },
    Submitted(TxAction),
    Broadcast(TxHash),
    Confirmed(Receipt),
    WriteFailed(String),
}

/// Everything the user sees. `None` means not loaded yet, which is distinct from zero.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    pub address: Option<Address>,
    pub phase: TxPhase,
    pub tokens_to_be_claimed: Option<u64>,
    pub token_balance: Option<U256>,
    pub tokens_minted: Option<U256>,
    pub is_owner: Option<bool>,
    pub last_receipt: Option<Receipt>,
    /// One entry per value whose latest refresh failed
    pub read_errors: BTreeMap<ReadTarget, String>,
    pub write_error: Option<String>,
}

impl AppState {
    pub fn wallet_connected(&self) -> bool {
        self.address.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.phase != TxPhase::Idle
    }

    /// Every error currently shown, read failures first
    pub fn error_messages(&self) -> Vec<String> {
        self.read_errors
            .iter()
            .map(|(target, error)| format!("Could not load {}: {}", target, error))
            .chain(self.write_error.iter().cloned())
            .collect()
    }

    fn loaded(mut self, target: ReadTarget) -> AppState {
        self.read_errors.remove(&target);
        self
    }

    pub fn apply(self, event: StateEvent) -> AppState {
        match event {
            StateEvent::Connected(address) => AppState {
                address: Some(address),
                ..AppState::default()
            },
            StateEvent::RefreshStarted => AppState {
                read_errors: BTreeMap::new(),
                ..self
            },
            StateEvent::ClaimableLoaded(count) => AppState {
                tokens_to_be_claimed: Some(count),
                ..self.loaded(ReadTarget::Claimable)
            },
            StateEvent::BalanceLoaded(balance) => AppState {
                token_balance: Some(balance),
                ..self.loaded(ReadTarget::Balance)
            },
            StateEvent::TotalMintedLoaded(supply) => AppState {
                tokens_minted: Some(supply),
                ..self.loaded(ReadTarget::TotalMinted)
            },
            StateEvent::OwnerLoaded(is_owner) => AppState {
                is_owner: Some(is_owner),
                ..self.loaded(ReadTarget::Owner)
            },
            // Prior value stays on screen next to its error
            StateEvent::ReadFailed { target, error } => {
                let mut state = self;
                state.read_errors.insert(target, error);
                state
            }
            StateEvent::Submitted(action) => AppState {
                phase: TxPhase::AwaitingConfirmation {
                    action,
                    tx_hash: None,
                },
                write_error: None,
                ..self
            },
            StateEvent::Broadcast(hash) => match self.phase {
                TxPhase::AwaitingConfirmation { action, .. } => AppState {
                    phase: TxPhase::AwaitingConfirmation {
                        action,
                        tx_hash: Some(hash),
                    },
                    ..self
                },
                TxPhase::Idle => self,
            },
            StateEvent::Confirmed(receipt) => AppState {
                phase: TxPhase::Idle,
                last_receipt: Some(receipt),
                ..self
            },
            StateEvent::WriteFailed(error) => AppState {
                phase: TxPhase::Idle,
                write_error: Some(error),
                ..self
            },
        }
    }
}
