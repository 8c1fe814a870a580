//! Data models
//!
//! Two record shapes feed the renderer: the full structured ticket and the
//! pre-flattened print-ready slots. Field names serialize in PascalCase so
//! layouts reference them as `{{.LineItems}}`, `{{.TicketNo}}` and so on.

pub mod print_ready;
pub mod ticket;

// Re-exports
pub use print_ready::*;
pub use ticket::*;
