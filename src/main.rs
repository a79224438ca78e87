use clap::Parser;
use colored::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crypto_devs::{
    cli::{Cli, Commands, OutputFormat},
    error::{self, IcoError},
    ico::{pricing, IcoController, IcoSettings},
    ledger::{EvmLedgerClient, EvmTokenWriter, Receipt, TokenLedgerWriter},
    utils,
    wallet::{Session, WalletSession},
    Config,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("crypto_devs=info,warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Status { format } => show_status(&config, format).await,

        Commands::Claimable { address } => show_claimable(&config, address.as_deref()).await,

        Commands::Mint { amount, yes } => {
            info!("Minting {} tokens", amount);
            mint_tokens(&config, amount, yes).await
        }

        Commands::Claim { yes } => {
            info!("Claiming tokens");
            claim_tokens(&config, yes).await
        }

        Commands::Withdraw { yes } => {
            info!("Withdrawing sale proceeds");
            withdraw_coins(&config, yes).await
        }

        Commands::Init => initialize(&config).await,
    };

    if let Err(e) = result {
        error!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}

fn ico_settings(config: &Config) -> error::Result<IcoSettings> {
    Ok(IcoSettings {
        token_price_wei: config.token_price()?,
        tokens_per_nft: config.ico.tokens_per_nft,
        claim_query_concurrency: config.ico.claim_query_concurrency,
    })
}

/// Build a controller over the read connection, with a signer when a session is given
fn open_controller(
    config: &Config,
    wallet: &WalletSession,
    session: Option<&Session>,
) -> error::Result<IcoController> {
    let reader = Arc::new(EvmLedgerClient::new(
        wallet.read_connection(),
        config.nft_address()?,
        config.token_address()?,
        config.request_timeout(),
    ));

    let writer = match session {
        Some(session) => Some(Arc::new(EvmTokenWriter::new(
            wallet.write_connection(session),
            config.token_address()?,
            config.request_timeout(),
            config.confirmation_timeout(),
        )) as Arc<dyn TokenLedgerWriter>),
        None => None,
    };

    Ok(IcoController::new(
        reader.clone(),
        reader,
        writer,
        ico_settings(config)?,
    ))
}

/// Connect the wallet and load the dashboard values
async fn connect(config: &Config) -> error::Result<IcoController> {
    let wallet = WalletSession::from_config(config)?;
    let session = wallet.connect().await?;
    let mut controller = open_controller(config, &wallet, Some(&session))?;

    if let Err(e) = controller.connect(WalletSession::current_address(&session)).await {
        println!("{}", format!("Some values could not be loaded: {}", e).yellow());
    }
    Ok(controller)
}

#[derive(Serialize)]
struct StatusReport {
    address: String,
    token_balance: Option<String>,
    tokens_minted: Option<String>,
    max_total_supply: String,
    nfts_unclaimed: Option<u64>,
    tokens_claimable: Option<String>,
    is_owner: Option<bool>,
    errors: Vec<String>,
}

async fn show_status(config: &Config, format: OutputFormat) -> error::Result<()> {
    let controller = connect(config).await?;
    let state = controller.state();
    let address = state.address.ok_or(IcoError::NotConnected)?;
    let tokens_per_nft = controller.settings().tokens_per_nft;
    let max_supply = pricing::to_base_units(config.ico.max_total_supply);

    if format == OutputFormat::Json {
        let report = StatusReport {
            address: address.to_string(),
            token_balance: state.token_balance.map(pricing::format_base_units),
            tokens_minted: state.tokens_minted.map(pricing::format_base_units),
            max_total_supply: pricing::format_base_units(max_supply),
            nfts_unclaimed: state.tokens_to_be_claimed,
            tokens_claimable: state
                .tokens_to_be_claimed
                .map(|n| pricing::format_base_units(pricing::claim_reward(n, tokens_per_nft))),
            is_owner: state.is_owner,
            errors: state.error_messages(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let unknown = || "unknown".red().to_string();

    println!("{}", "=== Crypto Devs ICO ===".cyan().bold());
    println!("Wallet:        {}", address);
    println!(
        "Your balance:  {}",
        state.token_balance.map(utils::format_tokens).unwrap_or_else(unknown)
    );
    println!(
        "Total minted:  {} / {}",
        state.tokens_minted.map(utils::format_tokens).unwrap_or_else(unknown),
        utils::format_tokens(max_supply)
    );
    match state.tokens_to_be_claimed {
        Some(0) => println!("Claimable:     {}", "nothing to claim".dimmed()),
        Some(n) => println!(
            "Claimable:     {} for {} NFT(s) ✓",
            utils::format_tokens(pricing::claim_reward(n, tokens_per_nft)),
            n.to_string().green()
        ),
        None => println!("Claimable:     {}", unknown()),
    }
    if state.is_owner == Some(true) {
        println!("{}", "You own the token contract".cyan());
    }
    let errors = state.error_messages();
    if !errors.is_empty() {
        println!();
    }
    for err in errors {
        println!("{}", err.red());
    }

    Ok(())
}

async fn show_claimable(config: &Config, address: Option<&str>) -> error::Result<()> {
    let wallet = WalletSession::from_config(config)?;

    let owner = match address {
        Some(address) => {
            let owner = utils::parse_address(address)?;
            wallet.verify_chain().await?;
            owner
        }
        None => WalletSession::current_address(&wallet.connect().await?),
    };

    // Read-only: no signer needed to inspect an address
    let controller = open_controller(config, &wallet, None)?;
    let count = controller.claimable_for(owner).await?;
    let reward = pricing::claim_reward(count, controller.settings().tokens_per_nft);

    println!("Address:       {}", owner);
    println!("Unclaimed NFTs: {}", count.to_string().green());
    println!("Claimable:     {}", utils::format_tokens(reward));
    Ok(())
}

fn print_receipt(receipt: &Receipt) {
    println!("Transaction:   {}", receipt.tx_hash);
    if let Some(block) = receipt.block_number {
        println!("Block:         {}", block);
    }
    println!("Gas used:      {}", receipt.gas_used);
    println!("Confirmed at:  {}", utils::format_timestamp(&receipt.confirmed_at));
}

async fn mint_tokens(config: &Config, amount: u64, yes: bool) -> error::Result<()> {
    let payment = pricing::mint_payment(amount, config.token_price()?)?;
    let mut controller = connect(config).await?;

    println!(
        "{}",
        format!("Minting {} Crypto Dev Tokens", amount).cyan()
    );
    println!("Cost:          {}", utils::format_eth(payment));

    if !yes && !utils::confirm_action("Send mint transaction?").map_err(anyhow::Error::from)? {
        println!("Cancelled");
        return Ok(());
    }

    let spinner = utils::spinner("Waiting for the transaction to be mined...");
    let result = controller.mint_crypto_dev_tokens(amount).await;
    spinner.finish_and_clear();
    let receipt = result?;

    println!("{}", "✓ Successfully minted Crypto Dev Tokens".green());
    print_receipt(&receipt);
    if let Some(balance) = controller.state().token_balance {
        println!("Your balance:  {}", utils::format_tokens(balance));
    }
    Ok(())
}

async fn claim_tokens(config: &Config, yes: bool) -> error::Result<()> {
    let mut controller = connect(config).await?;

    let count = controller.get_tokens_to_be_claimed().await?;
    if count == 0 {
        println!("{}", "No unclaimed NFTs: nothing to claim".yellow());
        return Ok(());
    }

    let reward = pricing::claim_reward(count, controller.settings().tokens_per_nft);
    println!(
        "{}",
        format!("Claiming {} for {} NFT(s)", pricing::format_base_units(reward), count).cyan()
    );

    if !yes && !utils::confirm_action("Send claim transaction?").map_err(anyhow::Error::from)? {
        println!("Cancelled");
        return Ok(());
    }

    let spinner = utils::spinner("Waiting for the transaction to be mined...");
    let result = controller.claim_crypto_dev_tokens().await;
    spinner.finish_and_clear();
    let receipt = result?;

    println!("{}", "✓ Successfully claimed Crypto Dev Tokens".green());
    print_receipt(&receipt);
    if let Some(balance) = controller.state().token_balance {
        println!("Your balance:  {}", utils::format_tokens(balance));
    }
    Ok(())
}

async fn withdraw_coins(config: &Config, yes: bool) -> error::Result<()> {
    let mut controller = connect(config).await?;

    if !yes && !utils::confirm_action("Withdraw all sale proceeds to the owner?").map_err(anyhow::Error::from)? {
        println!("Cancelled");
        return Ok(());
    }

    let spinner = utils::spinner("Waiting for the transaction to be mined...");
    let result = controller.withdraw_coins().await;
    spinner.finish_and_clear();
    let receipt = result?;

    println!("{}", "✓ Proceeds withdrawn".green());
    print_receipt(&receipt);
    Ok(())
}

async fn initialize(config: &Config) -> error::Result<()> {
    println!("{}", "Checking Crypto Devs setup...".green());
    println!("{}", "✓ Configuration loaded".green());

    let wallet = WalletSession::from_config(config)?;

    println!("\n{}", "Configuration:".cyan());
    println!("  RPC URL:        {}", config.network.rpc_url);
    match config.network.chain_id {
        Some(id) => println!("  Chain id:       {}", id),
        None => println!("  Chain id:       {}", "not checked".dimmed()),
    }
    println!("  NFT contract:   {}", config.nft_address()?);
    println!("  Token contract: {}", config.token_address()?);
    println!("  Token price:    {}", utils::format_eth(config.token_price()?));
    println!("  Tokens per NFT: {}", config.ico.tokens_per_nft);
    println!("  Max supply:     {}", config.ico.max_total_supply);

    if wallet.has_signer() {
        let session = wallet.connect().await?;
        println!(
            "{}",
            format!(
                "✓ Wallet connected: {}",
                utils::format_address(&WalletSession::current_address(&session))
            )
            .green()
        );
    } else {
        println!(
            "{}",
            format!(
                "No private key found in ${}; only read-only commands will work",
                config.wallet.private_key_env
            )
            .yellow()
        );
    }

    println!("\n{}", "Ready to use! Try running:".cyan());
    println!("  {} to view your position", "crypto-devs status".yellow());
    println!("  {} to mint tokens", "crypto-devs mint 5".yellow());
    println!("  {} to claim tokens for your NFTs", "crypto-devs claim".yellow());
    Ok(())
}
