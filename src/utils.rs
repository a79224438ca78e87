use alloy::primitives::{Address, U256};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{IcoError, Result};
use crate::ico::pricing;

/// Format token base units as CD amount with color
pub fn format_tokens(amount: U256) -> String {
    format!("{} CD", pricing::format_base_units(amount))
        .yellow()
        .to_string()
}

/// Format wei as ETH amount with color
pub fn format_eth(wei: U256) -> String {
    format!("{} ETH", pricing::format_base_units(wei))
        .yellow()
        .to_string()
}

/// Truncate a hex identifier for display
pub fn shorten_hex(hex: &str) -> String {
    if hex.len() <= 14 {
        hex.to_string()
    } else {
        format!("{}...{}", &hex[..8], &hex[hex.len() - 6..])
    }
}

/// Parse a user-supplied `0x` address
pub fn parse_address(input: &str) -> Result<Address> {
    Address::from_str(input.trim()).map_err(|e| IcoError::InvalidAddress(format!("{}: {}", input, e)))
}

pub fn format_address(address: &Address) -> String {
    shorten_hex(&address.to_string())
}

/// Format timestamp in human-readable format
pub fn format_timestamp(timestamp: &chrono::DateTime<chrono::Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Spinner shown while a transaction is being mined
pub fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Prompt user for yes/no confirmation
pub fn confirm_action(prompt: &str) -> std::io::Result<bool> {
    use std::io::{self, Write};

    print!("{} (y/N): ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}
