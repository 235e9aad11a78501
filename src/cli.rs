//! Command-line surface: serve the gateway, run sync passes headless, or
//! inspect a tenant's integration state.

use crate::auth::TokenManager;
use crate::config::Config;
use crate::contaazul::ApiClient;
use crate::gateway;
use crate::storage::SqliteStore;
use crate::sync::SyncEngine;
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

/// `contabridge` - Conta Azul integration bridge.
#[derive(Parser, Debug)]
#[command(name = "contabridge")]
#[command(version = "0.1.0")]
#[command(about = "OAuth2 token lifecycle and bulk sync against Conta Azul.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run a sync pass for one tenant without the gateway
    Sync {
        /// Tenant to sync
        #[arg(long)]
        tenant_id: i64,

        /// Which collection to sync
        #[arg(long, value_enum, default_value_t = Collection::All)]
        collection: Collection,
    },

    /// Show a tenant's integration state
    Status {
        /// Tenant to inspect
        #[arg(long)]
        tenant_id: i64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Collection {
    Customers,
    Contracts,
    All,
}

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.host.clone());
            let port = port.unwrap_or(config.port);
            gateway::run_gateway(&host, port, config).await
        }
        Commands::Sync {
            tenant_id,
            collection,
        } => run_sync(&config, tenant_id, collection).await,
        Commands::Status { tenant_id } => show_status(&config, tenant_id).await,
    }
}

async fn run_sync(config: &Config, tenant_id: i64, collection: Collection) -> Result<()> {
    let engine = build_engine(config).await?;

    if matches!(collection, Collection::Customers | Collection::All) {
        let report = engine.sync_customers(tenant_id).await?;
        println!("customers: {} processed", report.processed);
    }
    if matches!(collection, Collection::Contracts | Collection::All) {
        let report = engine.sync_contracts(tenant_id).await?;
        println!(
            "contracts: {} processed, {} customers updated",
            report.processed, report.updated
        );
    }
    Ok(())
}

async fn show_status(config: &Config, tenant_id: i64) -> Result<()> {
    let store = SqliteStore::open(&config.database_path).await?;
    match store.find_token_record(tenant_id).await? {
        Some(record) => {
            let customers = store.count_customers(tenant_id).await?;
            println!("tenant {tenant_id}");
            println!("  client_id:  {}", record.client_id);
            println!("  authorized: {}", record.refresh_token.is_some());
            println!("  customers:  {customers}");
        }
        None => println!("tenant {tenant_id}: no credentials saved"),
    }
    Ok(())
}

async fn build_engine(config: &Config) -> Result<SyncEngine> {
    let store = SqliteStore::open(&config.database_path).await?;
    let client = ApiClient::new(&config.vendor.auth_base, &config.vendor.api_base);
    let tokens = TokenManager::new(store.clone(), client.clone(), config.oauth_redirect_uri());
    Ok(SyncEngine::new(
        store,
        tokens,
        client,
        config.vendor.page_size,
    ))
}
