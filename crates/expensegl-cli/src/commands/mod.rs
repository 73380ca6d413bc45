//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (settings, reference data, today)
//! - `dates` - Travel date parsing
//! - `import` - GL import CSV generation
//! - `ledger` - Account code and department lookups
//! - `per_diem` - Per diem rate lookup
//! - `serve` - Web server command

pub mod core;
pub mod dates;
pub mod import;
pub mod ledger;
pub mod per_diem;
pub mod serve;

// Re-export command functions for main.rs
pub use core::*;
pub use dates::*;
pub use import::*;
pub use ledger::*;
pub use per_diem::*;
pub use serve::*;
