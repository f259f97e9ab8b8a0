//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Parse a format name from the config file, ignoring unknown names
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_str(name, true).ok()
    }
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            println!("{}", render_table(items));
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

pub fn render_table<T: Tabled>(items: &[T]) -> String {
    Table::new(items).with(Style::rounded()).to_string()
}

/// Print pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format currency
pub fn format_currency(amount: f64, currency: &str) -> String {
    match currency {
        "USD" => format!("${:.2}", amount),
        "EUR" => format!("€{:.2}", amount),
        "GBP" => format!("£{:.2}", amount),
        _ => format!("{:.2} {}", amount, currency),
    }
}

/// Format timestamp for display
pub fn format_timestamp(ts: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(ts) {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        ts.to_string()
    }
}

/// Color a resource or project state
pub fn color_state(state: &str) -> String {
    match state.to_uppercase().as_str() {
        "RUNNING" | "ACTIVE" | "READY" | "IN_USE" => state.green().to_string(),
        "STOPPED" | "SUSPENDED" | "RESERVED" | "STOPPING" => state.yellow().to_string(),
        "DELETE_REQUESTED" | "FAILED" | "ERROR" => state.red().to_string(),
        _ => state.to_string(),
    }
}

/// Color a recommendation priority (`P1` most urgent)
pub fn color_priority(priority: &str) -> String {
    match priority {
        "P1" => priority.red().bold().to_string(),
        "P2" => priority.yellow().to_string(),
        "P3" | "P4" => priority.blue().to_string(),
        _ => priority.dimmed().to_string(),
    }
}
