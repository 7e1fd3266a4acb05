//! Reading harmony events from JSON or the compact token form.

use anyhow::{Context, Result};
use formfunction::{Figures, HarmonyEvent};

/// Parse a whole input document.
///
/// A document whose first non-blank character is `[` is a JSON array of
/// `{ "degree", "figures", "duration" }` objects; anything else is tokens.
pub fn parse_events(input: &str) -> Result<Vec<HarmonyEvent>> {
    if input.trim_start().starts_with('[') {
        return serde_json::from_str(input).context("Failed to parse JSON harmony events");
    }

    let mut events = Vec::new();
    for (line_no, line) in input.lines().enumerate() {
        let content = line.split('#').next().unwrap_or_default();
        for token in content.split_whitespace() {
            let event = parse_token(token)
                .with_context(|| format!("line {}: bad token '{}'", line_no + 1, token))?;
            events.push(event);
        }
    }
    Ok(events)
}

/// `degree[:figures][@duration]`, e.g. `5:7`, `1@2`, `2:43@0.5`.
pub fn parse_token(token: &str) -> Result<HarmonyEvent> {
    let (head, duration) = match token.split_once('@') {
        Some((head, dur)) => {
            let dur: f64 = dur
                .parse()
                .with_context(|| format!("duration '{}' is not a number", dur))?;
            (head, dur)
        }
        None => (token, 1.0),
    };

    let (degree, shorthand) = head.split_once(':').unwrap_or((head, ""));
    let degree: u8 = degree
        .parse()
        .with_context(|| format!("degree '{}' is not a number", degree))?;

    let figures = Figures::from_shorthand(shorthand)?;
    Ok(HarmonyEvent::new(degree, figures, duration)?)
}
