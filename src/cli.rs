use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use uuid::Uuid;

use crate::adapters::PostgresStore;
use crate::config::Config;
use crate::domain::{Actor, OrderStatus};
use crate::services::{OrderEngine, StatusChange};

#[derive(Parser)]
#[command(name = "order-core")]
#[command(about = "Order Core - order placement, fulfilment and sales reporting", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Order management commands
    #[command(subcommand)]
    Order(OrderCommands),

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

#[derive(Subcommand)]
pub enum OrderCommands {
    /// Force an order into a status, attributed to "system"
    SetStatus {
        /// Order UUID
        #[arg(value_name = "ORDER_ID")]
        order_id: Uuid,

        /// pending, confirmed, processing, delivered or cancelled
        #[arg(value_name = "STATUS")]
        status: OrderStatus,

        /// Timeline note; defaults to "Status changed from X to Y"
        #[arg(short, long)]
        note: Option<String>,
    },
}

pub async fn handle_order_set_status(
    config: &Config,
    order_id: Uuid,
    status: OrderStatus,
    note: Option<String>,
) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;
    let engine = OrderEngine::new(Arc::new(PostgresStore::new(pool)), config.policy.clone());

    let detail = engine
        .set_status(&Actor::system(), order_id, StatusChange { status, note })
        .await?;

    tracing::info!(order_id = %order_id, status = %status, "Order status forced from CLI");
    println!(
        "✓ Order {} is now {} ({} timeline entries)",
        detail.order.order_number,
        detail.order.status,
        detail.timeline.len()
    );
    Ok(())
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool).await?;

    println!("✓ Database migrations completed");
    Ok(())
}

pub async fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Database URL: {}", mask_password(&config.database_url));
    println!("  Order Number Prefix: {}", config.policy.order_number_prefix);
    println!(
        "  Page Size: {} (max {})",
        config.policy.default_page_size, config.policy.max_page_size
    );
    println!("  Low Stock Threshold: {}", config.policy.low_stock_threshold);

    // Lazy, so an unreachable database shows up in the report instead of
    // aborting it.
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect_lazy(&config.database_url)?;
    let report = crate::startup::validate_environment(config, &pool).await;
    report.print();

    if !report.is_valid() {
        anyhow::bail!("Configuration validation failed");
    }
    Ok(())
}

fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if let Some(slash_pos) = url[..colon_pos].rfind("//") {
                let prefix = &url[..slash_pos + 2];
                let user = &url[slash_pos + 2..colon_pos];
                let suffix = &url[at_pos..];
                return format!("{}{}:****{}", prefix, user, suffix);
            }
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_set_status_command() {
        let id = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "order-core",
            "order",
            "set-status",
            &id.to_string(),
            "Delivered",
            "--note",
            "Signed for at gate",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Order(OrderCommands::SetStatus {
                order_id,
                status,
                note,
            })) => {
                assert_eq!(order_id, id);
                assert_eq!(status, OrderStatus::Delivered);
                assert_eq!(note.as_deref(), Some("Signed for at gate"));
            }
            _ => panic!("expected order set-status"),
        }
    }

    #[test]
    fn rejects_unknown_status() {
        let id = Uuid::new_v4().to_string();
        assert!(Cli::try_parse_from(["order-core", "order", "set-status", &id, "shipped"]).is_err());
    }

    #[test]
    fn masks_database_password() {
        assert_eq!(
            mask_password("postgres://orders:secret@db:5432/orders"),
            "postgres://orders:****@db:5432/orders"
        );
        assert_eq!(mask_password("postgres://localhost/orders"), "postgres://localhost/orders");
    }
}
