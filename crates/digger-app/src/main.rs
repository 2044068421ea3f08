use clap::Parser;
use digger_app::{init_tracing, run_command, AppServices, Cli};
use digger_core::AppConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let config = AppConfig::load_with_env()?;
    init_tracing(&config.logging.filter);
    info!("Starting Digger v{}", env!("CARGO_PKG_VERSION"));

    let services = AppServices::new(config)?;
    let result = run_command(&args.command, &services).await;
    services.shutdown();

    println!("{}", result?);
    Ok(())
}
