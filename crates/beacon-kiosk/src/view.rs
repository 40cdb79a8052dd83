//! Line-oriented terminal rendering.

use std::io::{self, Write};

use beacon_core::Language;

use crate::messages::step_title;
use crate::wizard::{Step, WizardView};

/// Renders wizard updates as plain lines on a writer (stdout by default).
pub struct TerminalView<W = io::Stdout> {
    out: W,
}

impl TerminalView {
    /// View on stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalView<W> {
    /// View on `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        // A closed terminal is not worth failing the wizard over.
        let _ = writeln!(self.out, "{text}");
        let _ = self.out.flush();
    }
}

impl<W: Write> WizardView for TerminalView<W> {
    fn show_step(&mut self, step: Step, language: Option<Language>) {
        self.line("");
        self.line(&format!("[{}/4] {}", step.number(), step_title(step, language)));
    }

    fn set_status(&mut self, status: &str) {
        self.line(&format!("status: {status}"));
    }

    fn show_result(&mut self, message: &str) {
        self.line(&format!("  {message}"));
    }

    fn set_last_received(&mut self, line: &str) {
        self.line(&format!("last received: {line}"));
    }

    fn set_controls_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.line("(sending, please wait)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut TerminalView<Vec<u8>>)) -> String {
        let mut view = TerminalView::new(Vec::new());
        f(&mut view);
        String::from_utf8(view.into_inner()).unwrap()
    }

    #[test]
    fn step_header_is_numbered() {
        let out = render(|v| v.show_step(Step::Waiting, Some(Language::En)));
        assert!(out.contains("[3/4] Waiting for your result..."));
    }

    #[test]
    fn arabic_titles() {
        let out = render(|v| v.show_step(Step::Result, Some(Language::Ar)));
        assert!(out.contains("[4/4] نتيجتك"));
    }

    #[test]
    fn status_and_result_lines() {
        let out = render(|v| {
            v.set_status("Ready");
            v.show_result("Congratulations! You reached level 2.");
            v.set_controls_enabled(true);
        });
        assert_eq!(
            out,
            "status: Ready\n  Congratulations! You reached level 2.\n"
        );
    }
}
