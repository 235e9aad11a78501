use anyhow::Result;
use clap::Parser;
use contabridge::cli::{self, Cli};
use contabridge::Config;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Install default crypto provider for Rustls TLS before any client is
    // built; reqwest cannot pick one when several are compiled in.
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let cli = Cli::parse();
    let config = Config::load_or_init()?;
    cli::dispatch(cli, config).await
}
