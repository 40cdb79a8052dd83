//! # Step wizard
//!
//! Four mutually exclusive steps:
//!
//! ```text
//! Start ──start──▶ LanguageSelect ──en/ar──▶ Waiting ──trigger──▶ Result
//!   ▲                                                               │
//!   └──────────────── home, or auto-return after 10 s ──────────────┘
//! ```
//!
//! Every input (user actions, inbound events, timer expiries, send results)
//! arrives on one queue and is handled by [`Wizard::handle_input`] in order,
//! so timers and events never race. Language sends run in the background and
//! report back as [`WizardInput::SendCompleted`]; navigation never waits on
//! them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use beacon_core::constants::{AUTO_RETURN_DELAY, DEFAULT_TRIGGER_PREFIX, STATUS_RESET_DELAY};
use beacon_core::{InboundEvent, Language, parse_trigger};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::ClientError;
use crate::messages::{last_received_line, result_message};
use crate::timer::DeferredAction;

/// Idle status text.
pub const READY_STATUS: &str = "Ready";

/// Wizard screens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Step {
    /// Welcome screen.
    Start = 1,
    /// Language choice.
    LanguageSelect = 2,
    /// Waiting for the external trigger.
    Waiting = 3,
    /// Result display.
    Result = 4,
}

impl Step {
    /// Step number, 1 through 4.
    pub fn number(self) -> u8 {
        self as u8
    }
}

/// Everything the wizard reacts to.
#[derive(Debug)]
pub enum WizardInput {
    /// User pressed start.
    Start,
    /// User picked a language.
    SelectLanguage(Language),
    /// User pressed home.
    Home,
    /// Event from the bridge stream.
    Inbound(InboundEvent),
    /// Auto-return timer expiry for a generation.
    ReturnTimerFired(u64),
    /// Status reset timer expiry for a generation.
    StatusTimerFired(u64),
    /// Background send finished with a summary or an error message.
    SendCompleted(Result<String, String>),
    /// Stop the run loop.
    Quit,
}

/// Rendering surface.
pub trait WizardView {
    /// Switch to `step`.
    fn show_step(&mut self, step: Step, language: Option<Language>);
    /// Replace the transient status line.
    fn set_status(&mut self, status: &str);
    /// Show the result message on the result screen.
    fn show_result(&mut self, message: &str);
    /// Replace the "last received" line.
    fn set_last_received(&mut self, line: &str);
    /// Enable or disable the language controls.
    fn set_controls_enabled(&mut self, enabled: bool);
}

/// Sends the selected language to the bridge.
#[async_trait]
pub trait LanguageSender: Send + Sync {
    /// Send `language`; returns a human-readable summary.
    async fn send_language(&self, language: Language) -> Result<String, ClientError>;
}

/// Wizard tuning.
#[derive(Clone, Debug)]
pub struct WizardOptions {
    /// Trigger prefix, usually taken from the server's health response.
    pub trigger_prefix: String,
    /// Result screen timeout.
    pub auto_return: Duration,
    /// Send status lifetime.
    pub status_reset: Duration,
    /// Render single-digit results with Arabic-Indic digits on the Arabic screen.
    pub arabic_digits: bool,
    /// Status shown before the first send.
    pub initial_status: String,
}

impl Default for WizardOptions {
    fn default() -> Self {
        Self {
            trigger_prefix: DEFAULT_TRIGGER_PREFIX.to_owned(),
            auto_return: AUTO_RETURN_DELAY,
            status_reset: STATUS_RESET_DELAY,
            arabic_digits: false,
            initial_status: READY_STATUS.to_owned(),
        }
    }
}

/// Whether the run loop should keep going.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Keep processing inputs.
    Continue,
    /// Stop.
    Quit,
}

/// The wizard state machine.
pub struct Wizard<V> {
    view: V,
    sender: Arc<dyn LanguageSender>,
    options: WizardOptions,
    inputs: mpsc::UnboundedSender<WizardInput>,
    step: Step,
    language: Option<Language>,
    sending: bool,
    return_timer: DeferredAction,
    status_timer: DeferredAction,
}

impl<V: WizardView> Wizard<V> {
    /// Create a wizard on the start screen.
    ///
    /// `inputs` is the sending half of the queue the wizard is driven from;
    /// timers and background sends post back through it.
    pub fn new(
        mut view: V,
        sender: Arc<dyn LanguageSender>,
        options: WizardOptions,
        inputs: mpsc::UnboundedSender<WizardInput>,
    ) -> Self {
        view.show_step(Step::Start, None);
        view.set_status(&options.initial_status);
        view.set_controls_enabled(true);
        Self {
            view,
            sender,
            options,
            inputs,
            step: Step::Start,
            language: None,
            sending: false,
            return_timer: DeferredAction::new(),
            status_timer: DeferredAction::new(),
        }
    }

    /// Current step.
    pub fn step(&self) -> Step {
        self.step
    }

    /// Language picked in step 2, cleared on return home.
    pub fn selected_language(&self) -> Option<Language> {
        self.language
    }

    /// Whether a language send has not reported back yet.
    pub fn send_in_flight(&self) -> bool {
        self.sending
    }

    /// Whether the auto-return timer is pending.
    pub fn return_pending(&self) -> bool {
        self.return_timer.is_pending()
    }

    /// Rendering surface.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// Apply one input.
    pub fn handle_input(&mut self, input: WizardInput) -> Flow {
        match input {
            WizardInput::Start => {
                if self.step == Step::Start {
                    self.go_to(Step::LanguageSelect);
                }
            }
            WizardInput::SelectLanguage(language) => {
                if self.sending {
                    debug!(
                        language = language.code(),
                        "language ignored while a send is in flight"
                    );
                } else if self.step == Step::LanguageSelect {
                    self.select_language(language);
                }
            }
            WizardInput::Home => self.go_home(),
            WizardInput::Inbound(event) => self.on_event(&event),
            WizardInput::ReturnTimerFired(generation) => {
                if self.return_timer.fire(generation) && self.step == Step::Result {
                    info!("auto-returning to start");
                    self.go_home();
                }
            }
            WizardInput::StatusTimerFired(generation) => {
                if self.status_timer.fire(generation) {
                    self.view.set_status(READY_STATUS);
                }
            }
            WizardInput::SendCompleted(result) => self.on_send_completed(result),
            WizardInput::Quit => {
                let _ = self.return_timer.cancel();
                let _ = self.status_timer.cancel();
                return Flow::Quit;
            }
        }
        Flow::Continue
    }

    /// Process inputs from `rx` until [`WizardInput::Quit`] or the queue closes.
    /// Returns the view.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<WizardInput>) -> V {
        while let Some(input) = rx.recv().await {
            if self.handle_input(input) == Flow::Quit {
                break;
            }
        }
        self.view
    }

    fn go_to(&mut self, step: Step) {
        debug!(from = self.step.number(), to = step.number(), "wizard step");
        self.step = step;
        self.view.show_step(step, self.language);
    }

    fn go_home(&mut self) {
        let _ = self.return_timer.cancel();
        self.language = None;
        self.go_to(Step::Start);
    }

    fn select_language(&mut self, language: Language) {
        self.language = Some(language);
        self.sending = true;
        let _ = self.status_timer.cancel();
        self.view.set_status("Sending...");
        self.view.set_controls_enabled(false);

        let sender = Arc::clone(&self.sender);
        let inputs = self.inputs.clone();
        drop(tokio::spawn(async move {
            let result = sender
                .send_language(language)
                .await
                .map_err(|e| e.to_string());
            let _ = inputs.send(WizardInput::SendCompleted(result));
        }));

        self.go_to(Step::Waiting);
    }

    fn on_send_completed(&mut self, result: Result<String, String>) {
        self.sending = false;
        match result {
            Ok(summary) => self.view.set_status(&format!("Sent: {summary}")),
            Err(reason) => {
                debug!(%reason, "language send failed");
                self.view.set_status(&format!("Error: {reason}"));
            }
        }
        self.view.set_controls_enabled(true);
        let _ = self.status_timer.schedule(
            self.options.status_reset,
            self.inputs.clone(),
            WizardInput::StatusTimerFired,
        );
    }

    fn on_event(&mut self, event: &InboundEvent) {
        self.view.set_last_received(&last_received_line(event));

        let prefix = self.options.trigger_prefix.as_str();
        let Some(n) = parse_trigger(Some(event.text.as_str()), Some(prefix)) else {
            return;
        };
        if self.step != Step::Waiting {
            debug!(step = self.step.number(), n, "trigger ignored outside the waiting step");
            return;
        }

        info!(n, "trigger received");
        let language = self.language.unwrap_or_default();
        let message = result_message(n, language, self.options.arabic_digits);
        self.go_to(Step::Result);
        self.view.show_result(&message);
        let _ = self.return_timer.schedule(
            self.options.auto_return,
            self.inputs.clone(),
            WizardInput::ReturnTimerFired,
        );
    }
}
