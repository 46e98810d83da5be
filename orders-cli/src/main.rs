//! Orders CLI
//!
//! Operator tools that talk to the ledger database directly.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use orders_hex::VoucherService;
use orders_repo::build_repo;
use orders_types::{
    BizType, LedgerStore, OrderDetailResponse, OrderItemResponse, OrderRef, UserId,
    VoucherEntryResponse, VoucherSummaryResponse,
};

#[derive(Parser)]
#[command(name = "orders-cli")]
#[command(author, version, about = "Order & ledger operator tools", long_about = None)]
struct Cli {
    /// Database URL (postgres://... or sqlite://...)
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update the schema
    Migrate,
    /// Recover voucher counts of legacy items from their titles
    BackfillVoucherCounts,
    /// Voucher balance operations
    Voucher {
        #[command(subcommand)]
        action: VoucherCommands,
    },
    /// Order lookups
    Order {
        #[command(subcommand)]
        action: OrderCommands,
    },
}

#[derive(Subcommand)]
enum VoucherCommands {
    /// Grant (positive) or deduct (negative) vouchers
    Adjust {
        /// User ID
        user: i64,
        /// Change to apply
        #[arg(allow_negative_numbers = true)]
        change: i32,
        /// Ledger remark
        #[arg(long, default_value = "operator adjustment")]
        remark: String,
        /// BUY or COST; defaults to the sign of the change
        #[arg(long)]
        biz_type: Option<String>,
    },
    /// Show balance and recent ledger entries
    Show {
        /// User ID
        user: i64,
        #[arg(long, default_value = "1")]
        page: i64,
        #[arg(long, default_value = "20")]
        page_size: i64,
    },
}

#[derive(Subcommand)]
enum OrderCommands {
    /// Show an order and its items
    Show {
        /// Order number
        order_no: String,
    },
}

fn parse_biz_type(explicit: Option<&str>, change: i32) -> Result<BizType> {
    match explicit {
        Some(s) => s.parse().map_err(|e: String| anyhow::anyhow!(e)),
        None if change > 0 => Ok(BizType::Buy),
        None => Ok(BizType::Cost),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let repo = Arc::new(build_repo(&cli.database_url).await?);

    match cli.command {
        Commands::Migrate => {
            repo.migrate().await?;
            println!("✓ Schema is up to date");
        }

        Commands::BackfillVoucherCounts => {
            let report = repo.backfill_voucher_counts().await?;
            println!(
                "✓ Backfill done: {} updated, {} unparseable",
                report.updated, report.unparseable
            );
        }

        Commands::Voucher { action } => {
            let vouchers = VoucherService::new(repo.clone());
            match action {
                VoucherCommands::Adjust {
                    user,
                    change,
                    remark,
                    biz_type,
                } => {
                    let biz_type = parse_biz_type(biz_type.as_deref(), change)?;
                    let balance = vouchers
                        .adjust_voucher(UserId::new(user), biz_type, change, &remark)
                        .await?;
                    println!("✓ User {} now has {} vouchers", user, balance);
                }
                VoucherCommands::Show {
                    user,
                    page,
                    page_size,
                } => {
                    let summary = vouchers
                        .voucher_summary(UserId::new(user), page, page_size)
                        .await?;
                    let response = VoucherSummaryResponse {
                        contact_voucher_num: summary.balance,
                        entries: summary
                            .entries
                            .into_iter()
                            .map(VoucherEntryResponse::from)
                            .collect(),
                        total: summary.total,
                        page: summary.page,
                        page_size: summary.page_size,
                    };
                    println!("{}", serde_json::to_string_pretty(&response)?);
                }
            }
        }

        Commands::Order { action } => match action {
            OrderCommands::Show { order_no } => {
                let order = repo
                    .get_order(&OrderRef::No(order_no.clone()))
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("Order {} not found", order_no))?;
                let items = repo.list_order_items(order.id).await?;
                let detail = OrderDetailResponse {
                    order: order.into(),
                    items: items.into_iter().map(OrderItemResponse::from).collect(),
                };
                println!("{}", serde_json::to_string_pretty(&detail)?);
            }
        },
    }

    Ok(())
}
