//! Tally operator CLI.
//!
//! Runs ledger operations and inspections against the configured database.
//! Every command prints its result as JSON on stdout.

mod cli;

use anyhow::{Context, bail};
use clap::Parser;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tally_core::account::{Account, AccountKind};
use tally_core::catalog::ConversionRate;
use tally_core::credential::ProviderDetails;
use tally_core::ledger::{
    AccountReconciliation, LedgerFilter, LedgerSort, OperationContext, reconcile,
};
use tally_db::{AccountStore, SocialCredentialRepository, TransactionCoordinator, connect_with};
use tally_shared::AppConfig;
use tally_shared::config::LoggingConfig;
use tally_shared::types::{PageRequest, UserId};

use crate::cli::{Cli, Command, ExecuteArgs, HistoryArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    let db = connect_with(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    let coordinator = TransactionCoordinator::from_config(db.clone(), &config.ledger)?;
    let printer = Printer {
        compact: args.compact,
    };

    match args.command {
        Command::Execute(execute) => {
            let owner = execute.owner;
            let operation = execute.operation;
            let commit = coordinator
                .execute(owner, operation, context_from(execute)?)
                .await?;
            printer.print(&commit)
        }
        Command::OpenFunds { owner, address } => {
            let account = AccountStore::funds(db).create(owner, &address).await?;
            printer.print(&account)
        }
        Command::BindSocial { owner, details } => {
            let details: ProviderDetails =
                serde_json::from_str(&details).context("invalid provider details")?;
            let credential = SocialCredentialRepository::new(db)
                .register(owner, &details)
                .await?;
            printer.print(&credential)
        }
        Command::Balance { owner } => {
            let balances = AccountStore::balances(&db, owner).await?;
            let free_posts_remaining = coordinator
                .free_posts()
                .remaining(owner, chrono::Utc::now())
                .await?;
            let funds_display = balances.funds.as_ref().map(Account::display_balance);
            printer.print(&serde_json::json!({
                "balances": balances,
                "funds_display": funds_display,
                "free_posts_remaining": free_posts_remaining,
            }))
        }
        Command::History(history) => {
            let (filter, sort, page) = query_from(history);
            let page = coordinator.ledger().query(&filter, sort, page).await?;
            printer.print(&page)
        }
        Command::Verify { owner } => {
            let reports = verify(&db, &coordinator, owner).await?;
            printer.print(&reports)?;
            if reports.iter().any(|report| !report.is_consistent()) {
                bail!("ledger and stored balances disagree for {owner}");
            }
            Ok(())
        }
        Command::Catalog => {
            let specs: Vec<_> = coordinator.catalog().iter().collect();
            printer.print(&specs)
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.filter.clone().into());

    // Logs go to stderr so stdout stays pure JSON.
    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn context_from(args: ExecuteArgs) -> anyhow::Result<OperationContext> {
    let mut ctx = OperationContext::new().with_allowance(args.allowance.into());
    if let Some(amount) = args.amount {
        ctx = ctx.with_amount(amount);
    }
    if let Some(reference) = args.reference {
        ctx = ctx.with_reference(reference);
    }
    if let Some(percent) = args.rate {
        ctx = ctx.with_conversion_rate(ConversionRate::from_percent(percent)?);
    }
    if let Some(provider) = args.provider {
        ctx = ctx.with_provider(provider);
    }
    if let Some(reason) = args.reason {
        ctx = ctx.with_reason(reason);
    }
    if let Some(resource) = args.resource {
        ctx = ctx.with_resource(resource);
    }
    if let Some(address) = args.withdraw_address {
        ctx = ctx.with_withdraw_address(address);
    }
    for related in args.related {
        ctx = ctx.with_related(related);
    }
    Ok(ctx)
}

fn query_from(args: HistoryArgs) -> (LedgerFilter, LedgerSort, PageRequest) {
    let filter = LedgerFilter {
        owner_id: args.owner,
        operation: args.operation,
        account_kind: args.kind,
        flow: args.flow,
        ..LedgerFilter::default()
    };
    let sort = LedgerSort {
        field: args.sort,
        direction: args.direction,
    };
    (filter, sort, PageRequest::new(args.page, args.per_page))
}

/// Reconciles every existing account of `owner` against its history.
async fn verify(
    db: &DatabaseConnection,
    coordinator: &TransactionCoordinator,
    owner: UserId,
) -> anyhow::Result<Vec<AccountReconciliation>> {
    let mut reports = Vec::with_capacity(AccountKind::ALL.len());
    for kind in AccountKind::ALL {
        let Some(account) = coordinator.store(kind).find(db, owner).await? else {
            continue;
        };
        let history = coordinator.ledger().history_of(owner, kind).await?;
        reports.push(reconcile(&account, &history));
    }
    Ok(reports)
}

struct Printer {
    compact: bool,
}

impl Printer {
    fn print<T: Serialize + ?Sized>(&self, value: &T) -> anyhow::Result<()> {
        let rendered = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        println!("{rendered}");
        Ok(())
    }
}
