//! Shared types for the till printing stack
//!
//! Data records consumed by the rendering engine and the rendered
//! document handed to the transport dispatcher.

pub mod document;
pub mod models;

// Re-exports
pub use document::RenderedDocument;
pub use models::{
    LineItem, NamedAmount, Payment, PaymentInfo, PrintReadyFields, StructuredTicket,
};
pub use serde::{Deserialize, Serialize};
