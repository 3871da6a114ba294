//! Diagnostic client: watches zones by handle and logs their state as it changes.

use std::process::ExitCode;

use clap::Parser;
use ext_zones_client::{Event, Setup, ZoneEvent, Zones};
use tracing::metadata::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use wayland_client::Connection;

/// Watch ext-zones-v1 zones and log their state as it changes
#[derive(Parser, Debug)]
#[clap(about, author, version)]
struct Args {
    /// Wayland socket to connect to instead of $WAYLAND_DISPLAY.
    #[clap(short, long)]
    socket: Option<String>,

    /// Zone handles to watch.
    #[clap(required = true)]
    handles: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()
        .unwrap();
    let subscriber = FmtSubscriber::builder().with_env_filter(env_filter).finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Some(socket) = &args.socket {
        std::env::set_var("WAYLAND_DISPLAY", socket);
    }

    let conn = match Connection::connect_to_env() {
        Ok(conn) => conn,
        Err(err) => {
            tracing::error!(%err, "could not connect to the wayland display");
            return ExitCode::FAILURE;
        }
    };

    let mut zones = match Zones::new(&conn) {
        Ok(zones) => zones,
        Err(Setup::Io(err)) => {
            tracing::error!(%err, "could not set up the zones state");
            return ExitCode::FAILURE;
        }
        Err(err) => {
            tracing::error!("{err}");
            tracing::error!("Help: the compositor may not support the ext-zones-v1 protocol");
            return ExitCode::FAILURE;
        }
    };

    for handle in &args.handles {
        match zones.zone_from_handle(handle) {
            Ok(_) => tracing::info!(%handle, "watching zone"),
            Err(_) => {
                tracing::error!(%handle, "zone handles must not be empty");
                return ExitCode::FAILURE;
            }
        }
    }

    loop {
        if let Err(err) = zones.blocking_dispatch() {
            tracing::error!(%err, "lost the connection to the compositor");
            return ExitCode::FAILURE;
        }

        while let Some(event) = zones.read_event() {
            match event {
                Event::Zone(ZoneEvent::Described(zone)) => {
                    let handle = zones.zone_handle(zone).unwrap_or("?");
                    let (width, height) = zones.zone_size(zone).unwrap_or((0, 0));
                    tracing::info!(handle, width, height, "zone described");
                }
                Event::Zone(ZoneEvent::Resized(zone)) => {
                    let handle = zones.zone_handle(zone).unwrap_or("?");
                    let (width, height) = zones.zone_size(zone).unwrap_or((0, 0));
                    tracing::info!(handle, width, height, "zone resized");
                }
                // This client never creates items, so item events cannot name one of ours.
                Event::Item(event) => tracing::debug!(?event, "stray item event"),
            }
        }
    }
}
