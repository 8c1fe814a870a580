//! Receipt renderer
//!
//! Parses a layout and binds a record to it. Every call parses its own
//! template instance, so the renderer holds no mutable state and can be
//! shared freely between threads.

use serde::Serialize;
use shared::{PrintReadyFields, RenderedDocument, StructuredTicket};
use tracing::{debug, instrument};

use crate::error::{RenderError, RenderResult};
use crate::exec;
use crate::funcs::Functions;
use crate::lexer;
use crate::parse::{self, Node};

/// A parsed layout, ready to be executed against any number of records
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Node>,
    functions: Functions,
}

impl Template {
    /// Parse a layout; unknown functions and malformed actions fail here
    pub fn parse(source: &str, functions: &Functions) -> RenderResult<Self> {
        let items = lexer::lex(source)?;
        let nodes = parse::parse(items, functions)?;
        Ok(Self {
            nodes,
            functions: functions.clone(),
        })
    }

    /// Bind a record and produce the document
    ///
    /// Either the whole document is returned or an error; partial output
    /// never escapes.
    pub fn execute<T: Serialize + ?Sized>(&self, data: &T) -> RenderResult<RenderedDocument> {
        if self.nodes.is_empty() {
            return Ok(RenderedDocument::default());
        }

        let root = serde_json::to_value(data)
            .map_err(|e| RenderError::binding(format!("record cannot be bound: {e}")))?;
        let out = exec::execute(&self.nodes, &root, &self.functions)?;
        Ok(RenderedDocument::from(out))
    }
}

/// Parse `source` and bind `data` in one step
///
/// Without `functions` the layout may only use fields and control blocks.
pub fn render<T: Serialize + ?Sized>(
    source: &str,
    data: &T,
    functions: Option<&Functions>,
) -> RenderResult<RenderedDocument> {
    let template = match functions {
        Some(functions) => Template::parse(source, functions)?,
        None => Template::parse(source, &Functions::new())?,
    };
    template.execute(data)
}

/// Renders the two receipt record shapes
#[derive(Debug, Clone, Default)]
pub struct ReceiptRenderer {
    extra: Functions,
}

impl ReceiptRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renderer with caller-supplied functions
    ///
    /// Extra functions are available to both record shapes and override
    /// built-ins of the same name.
    pub fn with_functions(extra: Functions) -> Self {
        Self { extra }
    }

    /// Substitute pre-composed slots into a receipt skeleton
    #[instrument(skip_all, fields(template_len = template.len()))]
    pub fn render_print_ready(
        &self,
        template: &str,
        fields: &PrintReadyFields,
    ) -> RenderResult<RenderedDocument> {
        let document = render(template, fields, Some(&self.extra))?;
        debug!(bytes = document.len(), "print-ready receipt rendered");
        Ok(document)
    }

    /// Render a structured ticket with `FormatDecimal` and `FormatDate` available
    #[instrument(skip_all, fields(template_len = template.len(), terminal = %ticket.terminal))]
    pub fn render_ticket(
        &self,
        template: &str,
        ticket: &StructuredTicket,
    ) -> RenderResult<RenderedDocument> {
        let mut functions = Functions::builtin();
        functions.extend(&self.extra);

        let document = render(template, ticket, Some(&functions))?;
        debug!(
            bytes = document.len(),
            line_items = ticket.line_items.len(),
            "ticket rendered"
        );
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_template_renders_empty_document() {
        let renderer = ReceiptRenderer::new();
        let doc = renderer.render_ticket("", &StructuredTicket::default()).unwrap();
        assert!(doc.is_empty());
        let doc = renderer
            .render_print_ready("", &PrintReadyFields::default())
            .unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_syntax_error_before_binding() {
        // record would fail to bind too; the parse error must win
        let err = render("{{range .Items}}", &json!({}), None).unwrap_err();
        assert!(err.is_syntax());
    }

    #[test]
    fn test_print_ready_has_no_builtins() {
        let err = ReceiptRenderer::new()
            .render_print_ready("{{FormatDecimal 1 2}}", &PrintReadyFields::default())
            .unwrap_err();
        assert!(err.is_syntax());
    }

    #[test]
    fn test_extra_functions() {
        let extra = Functions::new().with("Upper", |args| match args {
            [serde_json::Value::String(s)] => Ok(json!(s.to_uppercase())),
            _ => Err("expected one string".to_string()),
        });
        let renderer = ReceiptRenderer::with_functions(extra);

        let ticket = StructuredTicket {
            terminal: "bar".to_string(),
            ..Default::default()
        };
        let doc = renderer.render_ticket("{{Upper .Terminal}}", &ticket).unwrap();
        assert_eq!(doc.as_str(), "BAR");
    }

    #[test]
    fn test_template_reuse() {
        let template = Template::parse("#{{.N}}", &Functions::new()).unwrap();
        assert_eq!(template.execute(&json!({"N": 1})).unwrap().as_str(), "#1");
        assert_eq!(template.execute(&json!({"N": 2})).unwrap().as_str(), "#2");
    }
}
