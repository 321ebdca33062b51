use signalhub::config::Config;
use signalhub::signaling::SignalingServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;

    println!("   signalhub {}", config.version);
    println!("   Binding to {}", config.listen);
    if config.turn_secret.is_empty() {
        println!("   TURN auth disabled (SIGNALHUB_TURN_SECRET not set)");
    }
    println!("   Press Ctrl+C to stop\n");

    let server = SignalingServer::new(&config);
    tokio::select! {
        result = server.run(&config.listen) => result?,
        result = tokio::signal::ctrl_c() => {
            result?;
            info!(
                "Received shutdown signal, {} sessions online",
                server.api().stats(false).count
            );
        }
    }
    Ok(())
}
