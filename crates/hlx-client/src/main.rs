//! hlx client entry point.

use anyhow::Result;
use clap::Parser;
use hlx_client::{AppConfig, Application, Args, Command, CommandOutput};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize TLS crypto provider (must be before any WS connections)
    hlx_ws::init_crypto();

    let args = Args::parse();
    let config_path = args.config_path();
    let config = AppConfig::from_file(&config_path)?;

    hlx_telemetry::init_logging(&config.logging)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config_path = %config_path,
        network = %config.network.name,
        "Starting hlx client"
    );

    let app = Application::new(config)?;

    match args.command.unwrap_or(Command::Watch) {
        Command::Watch => app.run().await?,
        command => match app.execute(command).await? {
            CommandOutput::Address(address) => println!("{address}"),
            CommandOutput::Response(response) => {
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
            CommandOutput::Permit { permit, signature } => {
                let out = serde_json::json!({ "permit": permit, "signature": signature });
                println!("{}", serde_json::to_string_pretty(&out)?);
            }
        },
    }

    Ok(())
}
