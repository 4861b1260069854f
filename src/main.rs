// ComTerm - interactive serial port terminal
use clap::Parser;
use comterm::cli::args::Args;
use comterm::cli::output::ConsoleSink;
use comterm::core::receive;
use comterm::core::session::SessionController;
use comterm::domain::profile::ProfileStore;
use comterm::infrastructure::logging;
use comterm::infrastructure::ports::{PortOpener, SystemPorts};
use comterm::infrastructure::settings::{SettingsStore, TomlSettings};
use comterm::Connection;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::warn;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_logging(args.verbose).map_err(|e| anyhow::anyhow!("{}", e))?;

    if args.list {
        let ports = SystemPorts.enumerate()?;
        if ports.is_empty() {
            println!("No serial ports found.");
        }
        for name in ports {
            println!("{}", name);
        }
        return Ok(());
    }

    let settings = TomlSettings::new()?;
    let loaded = match settings.load() {
        Ok(profiles) => profiles,
        Err(e) => {
            warn!("could not load saved profiles: {}", e);
            Vec::new()
        }
    };
    let initial_port = loaded.iter().map(|p| p.name.clone()).min().or_else(|| {
        SystemPorts
            .enumerate()
            .ok()
            .and_then(|ports| ports.into_iter().next())
    });

    let conn = Arc::new(Connection::new(
        Box::new(SystemPorts),
        Box::new(ConsoleSink::new()),
        ProfileStore::from_profiles(loaded),
    ));

    let running = Arc::new(AtomicBool::new(true));
    let receive_task = tokio::spawn(receive::run(Arc::clone(&conn), Arc::clone(&running)));

    let controller = SessionController::new(
        Arc::clone(&conn),
        Box::new(settings),
        Arc::clone(&running),
    );

    if let Some(port) = args.port.clone() {
        // Positional arguments auto-open on startup, validated exactly like
        // the .open command
        let mut tokens = vec![port];
        for arg in [
            args.baud.clone(),
            args.data_bits.clone(),
            args.parity.clone(),
            args.stop_bits.clone(),
            args.handshake.clone(),
        ] {
            match arg {
                Some(token) => tokens.push(token),
                None => break,
            }
        }
        controller.auto_open(&tokens).await;
    } else if let Some(name) = initial_port {
        conn.set_current(&name).await;
    }

    controller.run(BufReader::new(tokio::io::stdin())).await?;

    running.store(false, Ordering::SeqCst);
    conn.close().await;
    let _ = receive_task.await;
    Ok(())
}
