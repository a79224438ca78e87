use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "crypto-devs")]
#[command(about = "Mint and claim Crypto Dev Tokens against the Crypto Devs NFT and token contracts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show balance, total minted and claimable tokens for the connected wallet
    Status {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Count NFTs whose tokens have not been claimed yet
    Claimable {
        /// Address to inspect (defaults to the connected wallet)
        #[arg(short, long)]
        address: Option<String>,
    },

    /// Mint tokens for ether
    Mint {
        /// Number of whole tokens to mint
        amount: u64,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Claim free tokens for every unclaimed NFT held
    Claim {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Withdraw sale proceeds to the contract owner
    Withdraw {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Check configuration and wallet setup
    Init,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}
