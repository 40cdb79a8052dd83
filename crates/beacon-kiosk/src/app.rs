//! Kiosk run loop: wires the bridge client, stdin commands and the wizard.

use std::sync::Arc;

use beacon_core::Language;
use beacon_core::constants::DEFAULT_TRIGGER_PREFIX;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::BridgeClient;
use crate::errors::ClientError;
use crate::view::TerminalView;
use crate::wizard::{READY_STATUS, Wizard, WizardInput, WizardOptions};

/// Status shown when the server did not answer the startup health check.
pub const OFFLINE_STATUS: &str = "Offline";

/// Command summary printed for unrecognized input.
pub const HELP: &str = "commands: start | en | ar | home | quit";

/// Kiosk settings.
#[derive(Clone, Debug)]
pub struct KioskOptions {
    /// Bridge server base URL.
    pub url: String,
    /// Arabic-Indic digits for single-digit results.
    pub arabic_digits: bool,
}

/// Map one line of user input to a wizard action.
pub fn parse_command(line: &str) -> Option<WizardInput> {
    let command = line.trim().to_ascii_lowercase();
    match command.as_str() {
        "start" | "s" => Some(WizardInput::Start),
        "home" | "h" => Some(WizardInput::Home),
        "quit" | "q" | "exit" => Some(WizardInput::Quit),
        other => other.parse::<Language>().ok().map(WizardInput::SelectLanguage),
    }
}

/// Forward commands read from `reader` to `tx`.
///
/// End of input or a read error counts as quit. Returns after sending
/// [`WizardInput::Quit`].
pub async fn read_commands<R>(reader: R, tx: mpsc::UnboundedSender<WizardInput>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        };
        match parse_command(&line) {
            Some(WizardInput::Quit) => break,
            Some(input) => {
                if tx.send(input).is_err() {
                    return;
                }
            }
            None if line.trim().is_empty() => {}
            None => println!("{HELP}"),
        }
    }
    let _ = tx.send(WizardInput::Quit);
}

/// Run the kiosk against `options.url` until the user quits.
pub async fn run_kiosk(options: KioskOptions) -> Result<(), ClientError> {
    let client = BridgeClient::new(options.url.as_str());

    let (trigger_prefix, initial_status) = match client.health().await {
        Ok(health) => {
            info!(
                status = %health.status,
                version = health.version.as_deref().unwrap_or("unknown"),
                connections = health.connections,
                "bridge reachable"
            );
            (health.trigger_prefix_or_default(), READY_STATUS)
        }
        Err(e) => {
            warn!(url = %client.base_url(), error = %e, "health check failed");
            (DEFAULT_TRIGGER_PREFIX.to_owned(), OFFLINE_STATUS)
        }
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let wizard = Wizard::new(
        TerminalView::stdout(),
        Arc::new(client.clone()),
        WizardOptions {
            trigger_prefix,
            arabic_digits: options.arabic_digits,
            initial_status: initial_status.to_owned(),
            ..WizardOptions::default()
        },
        tx.clone(),
    );
    println!("{HELP}");

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let subscription = {
        let cancel = cancel.clone();
        tokio::spawn(async move { client.run_subscription(event_tx, cancel).await })
    };
    let forward = {
        let tx = tx.clone();
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                if tx.send(WizardInput::Inbound(event)).is_err() {
                    break;
                }
            }
        })
    };
    let commands = tokio::spawn(read_commands(tokio::io::stdin(), tx));

    let _view = wizard.run(rx).await;

    cancel.cancel();
    let _ = subscription.await;
    forward.abort();
    commands.abort();
    info!("kiosk stopped");
    Ok(())
}
