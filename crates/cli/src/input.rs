//! Interactive collection and validation of run parameters.
//!
//! Everything the core consumes is validated here; the core itself never
//! re-checks its inputs.

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::NaiveDateTime;

pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Reads one trimmed line from stdin after printing `prompt`.
pub fn prompt(prompt: &str) -> Result<String> {
    print!("{prompt}");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(line.trim().to_string())
}

/// Reads a secret without echoing it.
pub fn prompt_password(text: &str) -> Result<String> {
    rpassword::prompt_password(text).context("failed to read password")
}

/// Asks a Y/N question, re-prompting until the answer is one of the two.
pub fn confirm(question: &str) -> Result<bool> {
    loop {
        match prompt(question)?.as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            _ => println!("請輸入 Y/N"),
        }
    }
}

/// Parses one `YYYY-mm-ddTHH:MM:SS` instant that must lie in the future.
pub fn parse_future_datetime(text: &str, now: NaiveDateTime) -> Result<NaiveDateTime> {
    let parsed = NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
        .with_context(|| format!("'{text}' does not match {DATETIME_FORMAT}"))?;
    if parsed < now {
        bail!("目標時間 {parsed} 早於當下時間");
    }
    Ok(parsed)
}

/// Parses a comma-separated list of future instants; no spaces allowed.
pub fn parse_booking_periods(text: &str, now: NaiveDateTime) -> Result<Vec<NaiveDateTime>> {
    if text.is_empty() {
        bail!("slot list is empty");
    }
    text.split(',')
        .map(|part| parse_future_datetime(part, now))
        .collect()
}
