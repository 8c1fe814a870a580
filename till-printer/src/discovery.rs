//! Printer-name discovery from spooler status text
//!
//! `lpstat -p -d` prints lines like `printer Kitchen is idle.  enabled since ...`.
//! The name is the field right after the literal `printer` marker.

use tracing::{debug, instrument, warn};

use crate::error::{PrintError, PrintResult};
use crate::exec::CommandRunner;

const MARKER: &str = "printer";

pub(crate) const STATUS_PROGRAM: &str = "lpstat";

pub(crate) fn status_args() -> Vec<String> {
    vec!["-p".to_string(), "-d".to_string()]
}

/// Name from the first line whose first field is exactly `printer`
///
/// `printers ...` or `printer-1 ...` do not match.
///
/// ```
/// use till_printer::parse_printer_name;
///
/// let status = "printer Test_Printer_1 is idle.  enabled since Mon\n";
/// assert_eq!(parse_printer_name(status).as_deref(), Some("Test_Printer_1"));
/// assert_eq!(parse_printer_name("no destinations added."), None);
/// ```
pub fn parse_printer_name(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next()) {
            (Some(MARKER), Some(name)) => Some(name.to_string()),
            _ => None,
        }
    })
}

/// Run the local status query and extract the printer name
#[instrument(skip(runner))]
pub async fn discover_local_printer(runner: &dyn CommandRunner) -> PrintResult<String> {
    let output = runner
        .run(STATUS_PROGRAM, &status_args())
        .await
        .and_then(|output| output.check(STATUS_PROGRAM))
        .map_err(|e| {
            warn!(error = %e, "Printer status query failed");
            PrintError::StatusQuery(e)
        })?;

    resolve(&output.stdout)
}

pub(crate) fn resolve(status: &str) -> PrintResult<String> {
    match parse_printer_name(status) {
        Some(name) => {
            debug!(printer = %name, "Discovered printer");
            Ok(name)
        }
        None => {
            warn!("No printer line in status output");
            Err(PrintError::PrinterNotFound)
        }
    }
}
