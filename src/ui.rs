//! Terminal output for the REPL: ANSI colors and one-line event rendering.
//!
//! The engine never produces prose; this prints the symbolic event
//! (type, message id, parameters) so a story author can see exactly what a
//! text service would be handed. Respects `NO_COLOR` and `TERM=dumb`.

use std::sync::OnceLock;

use serde_json::Value;

use crate::events::{kinds, SemanticEvent};

pub fn color_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| {
        if std::env::var_os("NO_COLOR").is_some() {
            return false;
        }
        !matches!(std::env::var("TERM").as_deref(), Ok("dumb"))
    })
}

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const FG_RED: &str = "\x1b[31m";
const FG_GREEN: &str = "\x1b[32m";
const FG_YELLOW: &str = "\x1b[33m";
const FG_CYAN: &str = "\x1b[36m";
const FG_MAGENTA: &str = "\x1b[35m";

fn styled(codes: &[&str], text: &str) -> String {
    if !color_enabled() || codes.is_empty() {
        return text.to_string();
    }
    format!("{}{}{}", codes.concat(), text, RESET)
}

pub fn bold(text: &str) -> String {
    styled(&[BOLD], text)
}

pub fn dim(text: &str) -> String {
    styled(&[DIM], text)
}

pub fn red(text: &str) -> String {
    styled(&[FG_RED], text)
}

pub fn green(text: &str) -> String {
    styled(&[FG_GREEN], text)
}

pub fn yellow(text: &str) -> String {
    styled(&[FG_YELLOW], text)
}

pub fn cyan(text: &str) -> String {
    styled(&[FG_CYAN], text)
}

pub fn banner(name: &str, version: &str, subtitle: &str) -> String {
    format!("{} {}\n{}", bold(name), dim(version), dim(subtitle))
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(param_text).collect();
            format!("[{}]", parts.join(", "))
        }
        other => other.to_string(),
    }
}

/// `  if.event.taken  taken  item=brass lamp`
pub fn event_line(ev: &SemanticEvent) -> String {
    let kind = match ev.event_type.as_str() {
        kinds::ACTION_SUCCESS => green(&ev.event_type),
        kinds::ACTION_BLOCKED => yellow(&ev.event_type),
        kinds::COMMAND_FAILED => yellow(&ev.event_type),
        kinds::SYSTEM_ERROR => red(&ev.event_type),
        kinds::SYSTEM_PARSER | kinds::SYSTEM_VALIDATION => styled(&[FG_MAGENTA], &ev.event_type),
        _ => cyan(&ev.event_type),
    };
    let params: Vec<String> = ev
        .data
        .params
        .iter()
        .map(|(k, v)| format!("{}={}", dim(k), param_text(v)))
        .collect();
    let indent = "  ".repeat(ev.chain_depth as usize + 1);
    format!("{}{}  {}  {}", indent, kind, bold(ev.message_id()), params.join(" "))
        .trim_end()
        .to_string()
}
