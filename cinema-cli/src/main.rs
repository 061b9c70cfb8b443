use anyhow::Context;
use cinema_cli::Shell;
use cinema_store::{app_config::Config, Connector};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinema=info,cinema_cli=info,cinema_core=info,cinema_load=info,cinema_store=info".into()),
        )
        // The menu owns stdout.
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!(
        backend = ?config.cluster.backend,
        nodes = ?config.cluster.nodes,
        keyspace = %config.cluster.keyspace,
        "Starting cinema shell"
    );

    let mut shell = Shell::new(tokio::io::stdin(), tokio::io::stdout(), Connector::new(config));

    tokio::select! {
        result = shell.run() => result.context("Shell stopped")?,
        _ = tokio::signal::ctrl_c() => {
            println!("\nExiting...");
            // A pending stdin read would otherwise hold the runtime open.
            std::process::exit(0);
        }
    }
    Ok(())
}
