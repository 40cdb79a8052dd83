//! # beacon
//!
//! Beacon bridge binary: wires settings, the datagram sockets and the HTTP
//! server together, plus a standalone listener, a one-shot sender and the
//! terminal kiosk.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use beacon_core::constants::{NAME, VERSION};
use beacon_core::{EventSink, InboundEvent, Language};
use beacon_kiosk::{KioskOptions, run_kiosk};
use beacon_server::send::SendMeta;
use beacon_server::{BeaconServer, ServerConfig};
use beacon_settings::{BeaconSettings, load_settings, load_settings_from_path};
use beacon_udp::{DatagramSender, ListenerOptions, start_listener};
use clap::{Args, Parser, Subcommand};
use tracing::info;

/// UDP to event-stream bridge.
#[derive(Parser, Debug)]
#[command(name = NAME, version = VERSION, about = "UDP to event-stream bridge")]
struct Cli {
    /// Log level when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (event stream, send and health endpoints).
    Serve(ServeArgs),
    /// Print every datagram received on an address.
    Listen(ListenArgs),
    /// Send one datagram.
    Send(SendArgs),
    /// Terminal wizard client.
    Kiosk(KioskArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Settings file (default `~/.beacon/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// HTTP port (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Start the UDP listener regardless of settings.
    #[arg(long)]
    listen: bool,
}

#[derive(Args, Debug)]
struct ListenArgs {
    /// Address to bind (default `127.0.0.1`, or `::1` with `--ipv6`).
    host: Option<String>,

    /// Port to bind.
    #[arg(default_value_t = 41234)]
    port: u16,

    /// Default to the IPv6 loopback.
    #[arg(long)]
    ipv6: bool,
}

#[derive(Args, Debug)]
struct SendArgs {
    /// Language whose configured message is sent.
    #[arg(required_unless_present = "message")]
    lang: Option<Language>,

    /// Send this text instead of a language message.
    #[arg(long, conflicts_with = "lang")]
    message: Option<String>,

    /// Destination host (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Destination port (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (default `~/.beacon/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct KioskArgs {
    /// Bridge server base URL.
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    url: String,

    /// Show single-digit Arabic results with Arabic-Indic digits.
    #[arg(long)]
    arabic_digits: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    beacon_core::logging::init_subscriber(&cli.log_level);

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Listen(args) => listen(args).await,
        Command::Send(args) => send(args).await,
        Command::Kiosk(args) => run_kiosk(KioskOptions {
            url: args.url,
            arabic_digits: args.arabic_digits,
        })
        .await
        .context("Kiosk failed"),
    }
}

fn load(path: Option<&Path>) -> Result<BeaconSettings> {
    let settings = match path {
        Some(path) => load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => load_settings().context("Failed to load settings")?,
    };
    Ok(settings)
}

async fn serve(args: ServeArgs) -> Result<()> {
    let mut settings = load(args.settings.as_deref())?;
    if let Some(port) = args.port {
        settings.web.port = port;
    }
    if args.listen {
        settings.udp.listener.enabled = true;
    }

    let sender = DatagramSender::bind()
        .await
        .context("Failed to bind sender socket")?;
    let server = BeaconServer::new(ServerConfig::from_settings(&settings), sender);

    let _ = server.start_configured_listener().await;
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;

    info!(
        udp_target = %format!("{}:{}", settings.udp.target.host, settings.udp.target.port),
        prefix = %settings.trigger.prefix,
        "beacon listening on http://{addr}"
    );

    shutdown_signal().await?;
    let _ = server.stop(handle).await;
    Ok(())
}

/// Prints each datagram dump to stdout.
struct StdoutSink;

impl EventSink for StdoutSink {
    fn publish(&self, event: &InboundEvent) {
        println!("{}\n", event.dump());
    }
}

async fn listen(args: ListenArgs) -> Result<()> {
    let host = args
        .host
        .unwrap_or_else(|| if args.ipv6 { "::1" } else { "127.0.0.1" }.to_owned());

    let handle = start_listener(
        &host,
        args.port,
        Arc::new(StdoutSink),
        ListenerOptions { log_packets: false },
    )
    .await
    .with_context(|| format!("Failed to bind UDP listener on {host}:{}", args.port))?;
    println!("listening on {}", handle.local_addr());

    shutdown_signal().await?;
    handle.close();
    handle.closed().await;
    Ok(())
}

async fn send(args: SendArgs) -> Result<()> {
    let settings = load(args.settings.as_deref())?;
    let payload = match (args.message, args.lang) {
        (Some(message), _) => message,
        (None, Some(lang)) => settings.udp.message_for(lang).to_owned(),
        (None, None) => anyhow::bail!("either a language or --message is required"),
    };
    let host = args.host.unwrap_or(settings.udp.target.host);
    let port = args.port.unwrap_or(settings.udp.target.port);

    let sender = DatagramSender::bind()
        .await
        .context("Failed to bind sender socket")?;
    let receipt = sender
        .send(payload.as_bytes(), &host, port)
        .await
        .with_context(|| format!("Failed to send to {host}:{port}"))?;
    sender.close();

    let meta = SendMeta {
        payload,
        host: receipt.host,
        port: receipt.port,
        bytes: receipt.bytes,
    };
    println!("{}", meta.summary());
    Ok(())
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term =
            signal(SignalKind::terminate()).context("Failed to listen for SIGTERM")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.context("Failed to listen for ctrl-c")?,
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    info!("shutdown signal received");
    Ok(())
}
