use hnet_bridge::options::Options;
use hnet_bridge::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let options = Options::new();

    // config decides the default log level, so load it before logging is up
    let config = ConfigWrapper::new(options.config_file.clone());
    let level = config
        .as_ref()
        .map(|c| c.loglevel().to_string())
        .unwrap_or_else(|_| "info".to_string());
    hnet_bridge::init_logging(&level);

    let config = config.unwrap_or_else(|err| {
        error!("Failed to load config {}: {:?}", options.config_file, err);
        std::process::exit(255);
    });

    if let Some(input) = options.decode {
        for line in hnet_bridge::decode_once(&config, &input)? {
            println!("{}", line);
        }
        return Ok(());
    }

    info!(
        "hnet-bridge {} starting with config file: {}",
        hnet_bridge::CARGO_PKG_VERSION,
        options.config_file
    );
    config.log_summary();

    // Create a channel for shutdown signaling
    let (shutdown_tx, _) = broadcast::channel(1);

    // Handle Ctrl+C
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        if let Err(e) = shutdown_tx_clone.send(()) {
            error!("Failed to send shutdown signal: {}", e);
        }
    });

    let app_handle = tokio::spawn(hnet_bridge::app(shutdown_tx.subscribe(), config));

    if let Err(e) = app_handle.await? {
        error!("Application error: {}", e);
    }

    Ok(())
}
