//! Subcommand implementations

pub mod inventory;
pub mod report;
