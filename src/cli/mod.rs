// CLI module - argument surface, help text, console output sink
pub mod args;
pub mod help;
pub mod output;
