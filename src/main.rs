//! Command-line front-end: pick files, start sharing, watch who downloads.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use lanshare::host;
use lanshare::settings::DEFAULT_SETTINGS_FILE;
use lanshare::share::DISPLAY_LOG_TAIL;
use lanshare::{EventLog, HttpServer, ServerConfig, Settings, ShareState, SharedFileCatalog};

/// Share local files with devices on the same network.
#[derive(Debug, Parser)]
#[command(name = "lanshare", version, about)]
struct Cli {
    /// Files to add to the share.
    files: Vec<PathBuf>,

    /// Settings file holding the port and shared paths.
    #[arg(short, long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    /// Port to listen on; saved for later runs.
    #[arg(short, long)]
    port: Option<u16>,

    /// Stop sharing the file with this name.
    #[arg(short, long = "remove", value_name = "NAME")]
    remove: Vec<String>,

    /// Do not write changes back to the settings file.
    #[arg(long)]
    no_save: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.config)?;
    if let Some(port) = cli.port {
        settings.port = port;
    }

    let catalog = SharedFileCatalog::new();
    let dropped = settings.sync_catalog(&catalog);
    if dropped > 0 {
        warn!("{dropped} saved file(s) no longer exist and were removed from the share");
    }

    for path in &cli.files {
        let file = catalog
            .register(path)
            .with_context(|| format!("cannot share {}", path.display()))?;
        settings.add_shared_file(file.path);
    }
    for name in &cli.remove {
        if catalog.unregister(name).is_none() {
            warn!("'{name}' is not shared");
        }
        settings.remove_shared_file(name);
    }

    if !cli.no_save {
        settings.save(&cli.config)?;
    }

    let state = ShareState::new(catalog);
    tokio::spawn(report_events(state.events.clone()));

    info!("Share URL: {}", host::share_url(settings.port));
    let server = HttpServer::new(ServerConfig::with_port(settings.port), state);
    server.start().await?;

    Ok(())
}

/// Print events appended since the previous tick, at most a screenful.
async fn report_events(events: EventLog) {
    let mut seen = 0u64;
    let mut ticker = tokio::time::interval(Duration::from_secs(2));
    loop {
        ticker.tick().await;
        let (total, fresh) = events.since(seen);
        let skip = fresh.len().saturating_sub(DISPLAY_LOG_TAIL);
        for entry in &fresh[skip..] {
            println!("{}  {:<15}  {}", entry.time, entry.ip, entry.event);
        }
        seen = total;
    }
}
