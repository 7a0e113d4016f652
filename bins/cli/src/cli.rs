//! Command-line arguments.

use clap::{Parser, Subcommand, ValueEnum};

use tally_core::account::AccountKind;
use tally_core::catalog::OperationType;
use tally_core::credential::Provider;
use tally_core::ledger::{AllowancePolicy, Flow, RelatedEntity, RelatedEntityType, SortDirection, SortField};
use tally_shared::types::UserId;

/// Operator command line for the Tally ledger.
#[derive(Debug, Parser)]
#[command(name = "tally", version, about)]
pub struct Cli {
    /// Print compact JSON instead of pretty-printed output
    #[arg(long, global = true)]
    pub compact: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute one catalog operation for a user
    Execute(ExecuteArgs),

    /// Open a user's Funds account
    OpenFunds {
        /// Account owner
        #[arg(long)]
        owner: UserId,
        /// Initial withdraw address
        #[arg(long)]
        address: String,
    },

    /// Bind or rebind a social credential
    BindSocial {
        /// Account owner
        #[arg(long)]
        owner: UserId,
        /// Provider details as JSON, e.g. {"provider":"github","login":"octo","user_id":1}
        #[arg(long)]
        details: String,
    },

    /// Show a user's balances and free posts left
    Balance {
        /// Account owner
        #[arg(long)]
        owner: UserId,
    },

    /// Query ledger history
    History(HistoryArgs),

    /// Check that stored balances match the ledger
    Verify {
        /// Account owner
        #[arg(long)]
        owner: UserId,
    },

    /// List the operation catalog with effective deltas
    Catalog,
}

/// Arguments for `execute`
#[derive(Debug, clap::Args)]
pub struct ExecuteArgs {
    /// Account owner
    #[arg(long)]
    pub owner: UserId,

    /// Operation name (e.g. POST, contribute-post)
    pub operation: OperationType,

    /// Base magnitude for deposit/withdraw
    #[arg(long)]
    pub amount: Option<i64>,

    /// External reference (on-chain transaction hash)
    #[arg(long)]
    pub reference: Option<String>,

    /// Conversion rate percent, overriding configuration
    #[arg(long)]
    pub rate: Option<u32>,

    /// Provider whose credential is touched
    #[arg(long)]
    pub provider: Option<Provider>,

    /// Free-text reason
    #[arg(long)]
    pub reason: Option<String>,

    /// Traded resource
    #[arg(long)]
    pub resource: Option<String>,

    /// Related entity as `type:id` (repeatable)
    #[arg(long = "related", value_parser = parse_related)]
    pub related: Vec<RelatedEntity>,

    /// Payout destination recorded on withdraw
    #[arg(long)]
    pub withdraw_address: Option<String>,

    /// Free-post allowance handling
    #[arg(long, value_enum, default_value_t = Allowance::Charge)]
    pub allowance: Allowance,
}

/// Arguments for `history`
#[derive(Debug, clap::Args)]
pub struct HistoryArgs {
    /// Account owner
    #[arg(long)]
    pub owner: Option<UserId>,

    /// Operation filter
    #[arg(long)]
    pub operation: Option<OperationType>,

    /// Account kind filter
    #[arg(long)]
    pub kind: Option<AccountKind>,

    /// Flow filter (income, outcome)
    #[arg(long)]
    pub flow: Option<Flow>,

    /// Sort field
    #[arg(long, default_value = "created_at")]
    pub sort: SortField,

    /// Sort direction
    #[arg(long, default_value = "desc")]
    pub direction: SortDirection,

    /// Page number
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Page size
    #[arg(long, default_value = "20")]
    pub per_page: u32,
}

/// Free-post allowance handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Allowance {
    /// Always charge
    Charge,
    /// Use a free post when one is left, otherwise charge
    PreferFree,
    /// Fail when no free post is left
    FreeOnly,
}

impl From<Allowance> for AllowancePolicy {
    fn from(value: Allowance) -> Self {
        match value {
            Allowance::Charge => Self::Charge,
            Allowance::PreferFree => Self::PreferFree,
            Allowance::FreeOnly => Self::FreeOnly,
        }
    }
}

fn parse_related(raw: &str) -> Result<RelatedEntity, String> {
    let (kind, id) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected type:id, got '{raw}'"))?;
    if id.is_empty() {
        return Err(format!("missing id in '{raw}'"));
    }
    let kind: RelatedEntityType = kind.parse().map_err(|e| format!("{e}"))?;
    Ok(RelatedEntity::new(kind, id))
}
