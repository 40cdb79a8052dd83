//! Localized kiosk text.

use beacon_core::{InboundEvent, Language};

/// Longest payload preview shown on the "last received" line, in characters.
pub const PREVIEW_CHARS: usize = 120;

const ARABIC_INDIC_DIGITS: [char; 10] = ['٠', '١', '٢', '٣', '٤', '٥', '٦', '٧', '٨', '٩'];

/// Result text for trigger value `n`.
///
/// `0` means no progress; anything else is reported with its numeral as-is.
/// With `arabic_digits`, a single-digit count is rendered in Arabic-Indic
/// digits on the Arabic screen.
pub fn result_message(n: i64, language: Language, arabic_digits: bool) -> String {
    if n == 0 {
        return match language {
            Language::En => "No progress this time. Give it another try!".to_owned(),
            Language::Ar => "لم يتم تحقيق أي تقدم هذه المرة. حاول مرة أخرى!".to_owned(),
        };
    }
    match language {
        Language::En => format!("Congratulations! You reached level {n}."),
        Language::Ar => {
            let numeral = if arabic_digits {
                arabic_indic(n)
            } else {
                n.to_string()
            };
            format!("تهانينا! لقد وصلت إلى المستوى {numeral}.")
        }
    }
}

/// Arabic-Indic numeral for 0-9; other values are returned as-is.
pub fn arabic_indic(n: i64) -> String {
    match usize::try_from(n) {
        Ok(digit) if digit < ARABIC_INDIC_DIGITS.len() => ARABIC_INDIC_DIGITS[digit].to_string(),
        _ => n.to_string(),
    }
}

/// Prompt for a step screen.
pub fn step_title(step: crate::wizard::Step, language: Option<Language>) -> &'static str {
    use crate::wizard::Step;

    match (step, language.unwrap_or_default()) {
        (Step::Start, _) => "Welcome! Type `start` to begin.",
        (Step::LanguageSelect, _) => "Choose a language: `en` (English) or `ar` (العربية).",
        (Step::Waiting, Language::En) => "Waiting for your result...",
        (Step::Waiting, Language::Ar) => "في انتظار النتيجة...",
        (Step::Result, Language::En) => "Your result (type `home` to start over):",
        (Step::Result, Language::Ar) => "نتيجتك (اكتب `home` للبدء من جديد):",
    }
}

/// `<timestamp> - <address>:<port> → <text> (<n> bytes)`, text truncated.
pub fn last_received_line(event: &InboundEvent) -> String {
    format!(
        "{} - {}:{} → {} ({} bytes)",
        event.timestamp,
        event.from.address,
        event.from.port,
        preview(&event.text),
        event.bytes
    )
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_owned(),
    }
}
