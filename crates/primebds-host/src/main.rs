use std::time::Duration;

use primebds::PrimeBds;
use primebds_host::config::HostConfig;
use primebds_host::console::Host;
use primebds_host::plugin_manager::PluginManager;
use tokio::io::AsyncBufReadExt;
use tracing::info;

#[tokio::main]
async fn main() {
    let config = match HostConfig::load("host.toml") {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load host.toml: {e}");
            std::process::exit(1);
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        "PrimeBDS console host v{} (level {}, port {})",
        env!("CARGO_PKG_VERSION"),
        config.server.level_name,
        config.server.port
    );

    let plugins_dir = config.plugins.directory.clone();
    let mut plugins = PluginManager::new(&plugins_dir);
    plugins.register(Box::new(PrimeBds::new(plugins_dir.join(primebds::PLUGIN_NAME))));

    let mut host = Host::new(&config, plugins);
    host.start();

    // Console REPL: read lines from stdin
    let (console_tx, mut console_rx) = tokio::sync::mpsc::channel::<String>(32);
    tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.send(line).await.is_err() {
                break;
            }
        }
    });

    let mut tick_interval = tokio::time::interval(Duration::from_millis(50));
    while host.is_running() {
        tokio::select! {
            _ = tick_interval.tick() => {
                host.game_tick();
            }
            Some(line) = console_rx.recv() => {
                for reply in host.handle_console_command(&line) {
                    println!("{reply}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                host.shutdown();
            }
        }
    }
    info!("Host shut down.");
}
