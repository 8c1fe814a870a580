//! One-shot print job: load record, render, deliver

use std::borrow::Cow;
use std::path::Path;

use anyhow::Context;
use shared::{PrintReadyFields, RenderedDocument, StructuredTicket};
use till_printer::{Ack, Dispatcher};
use till_render::ReceiptRenderer;
use till_render::templates::{PRINT_READY_RECEIPT, TICKET_SUMMARY};
use tracing::{info, instrument};

use crate::config::{Config, DataKind};

/// A record loaded from the job data file
#[derive(Debug, Clone)]
pub enum Record {
    Fields(PrintReadyFields),
    Ticket(StructuredTicket),
}

impl Record {
    pub fn parse(json: &str, kind: DataKind) -> anyhow::Result<Self> {
        let record = match kind {
            DataKind::Fields => Self::Fields(
                serde_json::from_str(json).context("data is not a print-ready fields record")?,
            ),
            DataKind::Ticket => Self::Ticket(
                serde_json::from_str(json).context("data is not a structured ticket")?,
            ),
        };
        Ok(record)
    }

    /// Built-in layout for this record shape
    pub fn default_template(&self) -> &'static str {
        match self {
            Self::Fields(_) => PRINT_READY_RECEIPT,
            Self::Ticket(_) => TICKET_SUMMARY,
        }
    }

    pub fn render(
        &self,
        renderer: &ReceiptRenderer,
        template: &str,
    ) -> till_render::RenderResult<RenderedDocument> {
        match self {
            Self::Fields(fields) => renderer.render_print_ready(template, fields),
            Self::Ticket(ticket) => renderer.render_ticket(template, ticket),
        }
    }
}

pub async fn load_record(path: &Path, kind: DataKind) -> anyhow::Result<Record> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read data file {}", path.display()))?;
    Record::parse(&json, kind).with_context(|| format!("invalid data file {}", path.display()))
}

async fn load_template<'r>(
    path: Option<&Path>,
    record: &'r Record,
) -> anyhow::Result<Cow<'r, str>> {
    match path {
        Some(path) => {
            let source = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read template {}", path.display()))?;
            Ok(Cow::Owned(source))
        }
        None => Ok(Cow::Borrowed(record.default_template())),
    }
}

/// Run one job described by `config`
#[instrument(skip_all, fields(transport = %config.transport, data = %config.data_path.display()))]
pub async fn run(config: &Config, dispatcher: &Dispatcher) -> anyhow::Result<Ack> {
    let target = config.target().context("invalid printer target")?;

    let record = load_record(&config.data_path, config.data_kind).await?;
    let template = load_template(config.template_path.as_deref(), &record).await?;

    let document = record
        .render(&ReceiptRenderer::new(), &template)
        .context("failed to render receipt")?;
    info!(bytes = document.len(), "Receipt rendered");

    let ack = dispatcher
        .deliver_within(&document, &target, config.delivery_timeout())
        .await
        .with_context(|| format!("{} delivery failed", target.kind()))?;

    info!(
        transport = %ack.transport,
        bytes = ack.bytes,
        printer = ack.printer.as_deref(),
        "Receipt printed"
    );
    Ok(ack)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fields_record() {
        let record = Record::parse(r#"{"TicketNo": "1000", "Date": "12/08/2024"}"#, DataKind::Fields)
            .unwrap();
        let Record::Fields(fields) = &record else {
            panic!("expected fields");
        };
        assert_eq!(fields.ticket_no, "1000");
        assert_eq!(fields.time, "");
        assert_eq!(record.default_template(), PRINT_READY_RECEIPT);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Record::parse("not json", DataKind::Ticket).is_err());
        assert!(Record::parse(r#"{"TicketNo": 5}"#, DataKind::Fields).is_err());
    }

    #[test]
    fn test_ticket_default_template() {
        let record = Record::parse("{}", DataKind::Ticket).unwrap();
        assert_eq!(record.default_template(), TICKET_SUMMARY);
    }
}
