//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod codes;
pub mod dates;
pub mod health;
pub mod import;
pub mod orgchart;
pub mod per_diem;
pub mod receipts;
pub mod reports;

// Re-export all handlers for use in router
pub use codes::*;
pub use dates::*;
pub use health::*;
pub use import::*;
pub use orgchart::*;
pub use per_diem::*;
pub use receipts::*;
pub use reports::*;
