use thiserror::Error;

#[derive(Error, Debug)]
pub enum IcoError {
    #[error("Wallet connection failed: {0}")]
    Connection(String),

    #[error("Ledger read failed: {0}")]
    ReadQuery(String),

    #[error("Transaction failed: {0}")]
    WriteTransaction(String),

    #[error("Wallet not connected")]
    NotConnected,

    #[error("Only the contract owner can do this: {0}")]
    NotOwner(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IcoError {
    /// Prefix the message of a read failure, leaving other kinds untouched
    pub fn in_read_context(self, context: &str) -> Self {
        match self {
            IcoError::ReadQuery(msg) => IcoError::ReadQuery(format!("{}: {}", context, msg)),
            other => other,
        }
    }
}

impl From<config::ConfigError> for IcoError {
    fn from(e: config::ConfigError) -> Self {
        IcoError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IcoError>;
