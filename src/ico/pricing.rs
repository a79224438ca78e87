use alloy::primitives::{utils::format_units, U256};

use crate::error::{IcoError, Result};

/// Crypto Dev Token and ether both use 18 decimals
pub const DECIMALS: u8 = 18;

/// One whole token (or one ether) in base units
pub fn one_unit() -> U256 {
    U256::from(10u64).pow(U256::from(DECIMALS))
}

/// Wei owed for minting `amount` whole tokens at `price_per_token` wei each
pub fn mint_payment(amount: u64, price_per_token: U256) -> Result<U256> {
    if amount == 0 {
        return Err(IcoError::InvalidAmount("mint amount must be at least 1".to_string()));
    }

    U256::from(amount)
        .checked_mul(price_per_token)
        .ok_or_else(|| IcoError::InvalidAmount(format!("payment for {} tokens overflows", amount)))
}

/// Convert whole tokens to base units
pub fn to_base_units(whole: u64) -> U256 {
    U256::from(whole) * one_unit()
}

/// Base units a holder receives for `claimable` unclaimed NFTs.
///
/// Computed in `U256`, so large configured rewards cannot wrap.
pub fn claim_reward(claimable: u64, tokens_per_nft: u64) -> U256 {
    U256::from(claimable) * U256::from(tokens_per_nft) * one_unit()
}

/// Render an 18-decimal base-unit amount without trailing zeros
pub fn format_base_units(amount: U256) -> String {
    match format_units(amount, DECIMALS) {
        Ok(formatted) if formatted.contains('.') => {
            formatted.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        Ok(formatted) => formatted,
        Err(_) => amount.to_string(),
    }
}
