//! Command-line interface.

use clap::{Parser, Subcommand, ValueEnum};
use hlx_core::{OrderSide, TimeInForce};
use hlx_signer::Address;
use rust_decimal::Decimal;

/// Hyperliquid market-data and action client.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Configuration file path (can also be set via HLX_CONFIG env var)
    #[arg(short, long)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Used when neither `--config` nor `HLX_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

impl Args {
    /// CLI arg > HLX_CONFIG env var > default.
    pub fn config_path(&self) -> String {
        self.config
            .clone()
            .or_else(|| std::env::var("HLX_CONFIG").ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Stream the configured feeds until Ctrl-C (default)
    Watch,
    /// Print the signing key's address
    Address,
    /// Place a limit order
    Order {
        #[arg(long)]
        asset: u32,
        #[arg(long, value_enum)]
        side: SideArg,
        #[arg(long)]
        px: Decimal,
        #[arg(long)]
        sz: Decimal,
        #[arg(long, value_enum, default_value = "gtc")]
        tif: TifArg,
        #[arg(long)]
        reduce_only: bool,
    },
    /// Cancel an order by exchange id
    Cancel {
        #[arg(long)]
        asset: u32,
        #[arg(long)]
        oid: u64,
    },
    /// Set leverage for an asset
    Leverage {
        #[arg(long)]
        asset: u32,
        #[arg(long)]
        leverage: u32,
        /// Cross margin instead of isolated
        #[arg(long)]
        cross: bool,
    },
    /// Withdraw USDC to an address
    Withdraw {
        #[arg(long)]
        destination: Address,
        /// Decimal amount, e.g. "10.5"
        #[arg(long)]
        amount: String,
    },
    /// Approve an API agent key
    ApproveAgent {
        #[arg(long)]
        agent: Address,
        #[arg(long)]
        name: Option<String>,
    },
    /// Approve a builder fee ceiling
    ApproveBuilderFee {
        #[arg(long)]
        builder: Address,
        /// Percentage string, e.g. "0.001%"
        #[arg(long)]
        max_fee_rate: String,
    },
    /// Sign a USDC permit for the bridge
    DepositPermit {
        /// Raw token units (6 decimals)
        #[arg(long)]
        value: u64,
        /// Token permit nonce
        #[arg(long, default_value_t = 0)]
        nonce: u64,
        /// Unix seconds
        #[arg(long)]
        deadline: u64,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideArg {
    Buy,
    Sell,
}

impl From<SideArg> for OrderSide {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Buy => Self::Buy,
            SideArg::Sell => Self::Sell,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TifArg {
    Gtc,
    Ioc,
    Alo,
}

impl From<TifArg> for TimeInForce {
    fn from(tif: TifArg) -> Self {
        match tif {
            TifArg::Gtc => Self::GoodTilCancelled,
            TifArg::Ioc => Self::ImmediateOrCancel,
            TifArg::Alo => Self::AddLiquidityOnly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_command_is_none() {
        let args = Args::try_parse_from(["hlx", "--config", "x.toml"]).unwrap();
        assert_eq!(args.config_path(), "x.toml");
        assert!(args.command.is_none());
    }

    #[test]
    fn test_parse_order() {
        let args = Args::try_parse_from([
            "hlx", "order", "--asset", "0", "--side", "sell", "--px", "50000.5", "--sz", "0.01",
            "--tif", "ioc",
        ])
        .unwrap();

        assert_eq!(
            args.command,
            Some(Command::Order {
                asset: 0,
                side: SideArg::Sell,
                px: dec!(50000.5),
                sz: dec!(0.01),
                tif: TifArg::Ioc,
                reduce_only: false,
            })
        );
    }

    #[test]
    fn test_parse_withdraw_rejects_bad_address() {
        assert!(Args::try_parse_from([
            "hlx", "withdraw", "--destination", "0x12", "--amount", "10"
        ])
        .is_err());
    }
}
