use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::process;

use chores_core::models::Chore;
use chores_core::schedule::configured_days;
use chores_core::week::DAY_SHORT_NAMES;

/// Parse a CLI date relative to `today` (the household's current date).
pub(crate) fn parse_date(date_str: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
    match date_str {
        None | Some("today") => Ok(today),
        Some("yesterday") => Ok(today - chrono::Duration::days(1)),
        Some("tomorrow") => Ok(today + chrono::Duration::days(1)),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| {
            format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
        }),
    }
}

/// Report a missing record the way scripts expect: message on stderr (or a
/// JSON error on stdout) and exit status 2.
pub(crate) fn exit_not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// "Mon, Thu", or "any day" for unscheduled chores.
pub(crate) fn format_days(chore: &Chore) -> String {
    let days = configured_days(chore);
    if days.is_empty() {
        return "any day".to_string();
    }
    days.iter()
        .map(|d| DAY_SHORT_NAMES[usize::from(d)])
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
