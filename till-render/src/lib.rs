//! # till-render
//!
//! Template rendering engine for receipts.
//!
//! A layout is literal text with `{{ ... }}` actions: field references
//! (`{{.Terminal}}`, `{{$.TicketNo}}`), control blocks (`if`, `with`,
//! `range`, each closed by `{{end}}`), and function calls
//! (`{{FormatDecimal .Price 2}}`, `{{FormatDate .Date "02/01/2006"}}`).
//! In a pipeline the piped value becomes the last argument, so
//! `{{"02/01/2006" | FormatDate .Date}}` is the piped form of the latter.
//!
//! Records are bound through `serde`, so any `Serialize` type can be
//! rendered. Rendering is pure: no I/O and no shared state.
//!
//! ## Example
//!
//! ```
//! use shared::PrintReadyFields;
//! use till_render::ReceiptRenderer;
//!
//! let fields = PrintReadyFields {
//!     ticket_no: "1000".to_string(),
//!     ..Default::default()
//! };
//! let doc = ReceiptRenderer::new()
//!     .render_print_ready("Receipt No: {{.TicketNo}}", &fields)
//!     .unwrap();
//! assert_eq!(doc.as_str(), "Receipt No: 1000");
//! ```

mod error;
mod exec;
mod funcs;
mod lexer;
mod parse;
mod renderer;
pub mod templates;
mod value;

// Re-exports
pub use error::{RenderError, RenderResult};
pub use funcs::{Functions, TemplateFn, format_date, format_decimal, format_naive_date};
pub use renderer::{ReceiptRenderer, Template, render};
pub use shared::RenderedDocument;
