use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::utils::{order_lines, order_summary, output_success};
use crate::cli::OutputFormat;
use crate::database::orders;
use crate::database::{DatabaseManager, Filter};

#[derive(Subcommand)]
pub enum OrderCommands {
    #[command(about = "Count orders, show the latest ones and flag generated test data")]
    Check {
        #[arg(long, help = "How many recent orders to show", default_value = "5")]
        limit: i64,
    },

    #[command(about = "Delete every order")]
    Clear,

    #[command(about = "Delete orders that look like generated test data")]
    CleanMock,
}

pub async fn handle(cmd: OrderCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let result = match cmd {
        OrderCommands::Check { limit } => handle_check(limit, &output_format).await,
        OrderCommands::Clear => handle_delete(Filter::new(), "orders", &output_format).await,
        OrderCommands::CleanMock => handle_delete(orders::mock_orders(), "mock orders", &output_format).await,
    };
    DatabaseManager::close().await;
    result
}

async fn handle_check(limit: i64, output_format: &OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::pool().await?;
    let total = orders::count(&pool, &Filter::new()).await?;

    let recent = orders::list(&pool, &recent_orders(limit)).await?;
    let mock = orders::list(&pool, &orders::mock_orders()).await?;

    match output_format {
        OutputFormat::Json => {
            let report = json!({
                "totalOrders": total,
                "recent": recent.iter().map(order_summary).collect::<Vec<Value>>(),
                "mockOrders": mock.iter().map(order_summary).collect::<Vec<Value>>(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("Total orders in database: {}", total);
            if total == 0 {
                println!("No orders in database");
                return Ok(());
            }

            println!("\nRecent orders:");
            for (index, order) in recent.iter().enumerate() {
                for line in order_lines(index, order) {
                    println!("{}", line);
                }
                println!("   ---");
            }

            if mock.is_empty() {
                println!("\nNo mock data found in orders");
            } else {
                println!("\nFound {} orders that look like mock data:", mock.len());
                for order in &mock {
                    println!(
                        "   - {}: {} ({})",
                        order.id, order.shipping_info.full_name, order.shipping_info.email
                    );
                }
                println!("\nRun `daliyuan orders clean-mock` to remove them");
            }
        }
    }
    Ok(())
}

/// The `limit` newest orders; `orders::list` supplies the ordering
fn recent_orders(limit: i64) -> Filter {
    Filter::new().limit(limit)
}

async fn handle_delete(filter: Filter, what: &str, output_format: &OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::pool().await?;
    let deleted = orders::delete_matching(&pool, &filter).await?;
    let remaining = orders::count(&pool, &Filter::new()).await?;

    tracing::info!("Deleted {} {}", deleted, what);
    output_success(
        output_format,
        &format!("Deleted {} {} ({} orders remaining)", deleted, what, remaining),
        Some(json!({ "deleted": deleted, "remaining": remaining })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_orders_sort_once() {
        let filter = orders::newest_first(&recent_orders(5));
        let sql = filter.build("SELECT * FROM orders o").sql().to_string();
        assert_eq!(sql, "SELECT * FROM orders o ORDER BY o.created_at DESC LIMIT $1");
        assert_eq!(sql.matches("ORDER BY").count(), 1);
    }
}
