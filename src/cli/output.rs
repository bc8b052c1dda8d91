//! CLI output helpers.

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Table};
use console::style;
use serde::Serialize;

/// Print a value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Build a condensed table with a header row.
pub fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(headers.iter().map(|h| Cell::new(h)));
    table
}

/// Styled success line.
pub fn success(message: &str) {
    println!("{} {message}", style("✓").green().bold());
}

/// Styled failure line.
pub fn failure(message: &str) {
    eprintln!("{} {message}", style("✗").red().bold());
}

/// Styled informational line.
pub fn note(message: &str) {
    println!("{} {message}", style("•").dim());
}

/// Truncate a string for table display.
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let cut = s
            .char_indices()
            .take_while(|(i, _)| *i < max.saturating_sub(1))
            .count();
        format!("{}…", s.chars().take(cut).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("0123456789abc", 10), "012345678…");
    }
}
