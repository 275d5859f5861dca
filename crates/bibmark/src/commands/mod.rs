//! Command implementations for the bibmark CLI
//!
//! Each command module handles the CLI interface and delegates to
//! bibmark-core for actual implementation.

pub mod process;
