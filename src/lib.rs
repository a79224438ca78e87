pub mod cli;
pub mod config;
pub mod error;
pub mod ico;
pub mod ledger;
pub mod utils;
pub mod wallet;

pub use config::Config;
pub use error::{IcoError, Result};
