use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};

use crate::error::Result;
use crate::refresh::Refresher;
use crate::server::PacResponder;
use crate::settings::Settings;
use crate::system_proxy::{LoggingSystemProxy, SystemProxy};

mod constants;
mod error;
mod fetch;
mod logging;
mod refresh;
mod rewrite;
mod server;
mod settings;
mod system_proxy;

#[derive(Parser, Debug)]
#[command(author, version, about = "\n\nA system utility that serves a locally rewritten PAC file to the OS proxy resolver.", long_about = None)]
struct Args {
    /// Path to the settings file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Override the listening port from the settings file
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging(&args.log_level)?;
    info!("Starting pacserve...");

    let mut settings = Settings::load(&args.config);
    if let Some(port) = args.port {
        info!("Overriding port from command line: {}", port);
        settings.port = port;
    }

    let responder = Arc::new(PacResponder::new());
    let mut refresher = Refresher::new(Arc::clone(&responder), &settings.cache_file);

    // Serve the last known good document until the first refresh lands.
    refresher.preload_cache().await;

    responder.start(settings.port).await?;

    let registrar = LoggingSystemProxy;
    if let Some(url) = responder.server_url().await {
        if let Err(e) = registrar.set_pac_url(&url) {
            warn!("Failed to register system PAC URL: {}", e);
        }
    }

    run_refresh(&mut refresher, &settings).await;

    wait_for_triggers(&mut refresher, &args.config, settings).await;

    info!("Shutting down...");
    if let Err(e) = registrar.set_pac_url("") {
        warn!("Failed to clear system PAC URL: {}", e);
    }
    responder.stop().await;
    Ok(())
}

async fn run_refresh(refresher: &mut Refresher, settings: &Settings) {
    if settings.pac_url.is_empty() {
        warn!("No PAC URL configured; serving the cached document only");
    } else if let Err(e) = refresher
        .refresh(&settings.pac_url, &settings.proxy_server)
        .await
    {
        error!("PAC refresh failed: {}", e);
    }
}

/// Blocks until ctrl-c. On unix, SIGHUP reloads the settings file and
/// re-runs the refresh, standing in for the configuration front end's
/// save/update action. A port change in the reloaded file is ignored; the
/// responder keeps its socket until restart.
#[cfg(unix)]
async fn wait_for_triggers(refresher: &mut Refresher, config_path: &Path, initial: Settings) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            warn!("Could not install SIGHUP handler: {}", e);
            wait_for_shutdown().await;
            return;
        }
    };

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = hangup.recv() => {
                info!("SIGHUP received, refreshing PAC document");
                let mut settings = Settings::load(config_path);
                if settings.port != initial.port {
                    warn!(
                        "Port change in settings requires a restart; keeping port {}",
                        initial.port
                    );
                    settings.port = initial.port;
                }
                run_refresh(refresher, &settings).await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_triggers(_refresher: &mut Refresher, _config_path: &Path, _initial: Settings) {
    wait_for_shutdown().await;
}

async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to wait for shutdown signal: {}", e);
    }
}
