//! Error types for the printer library

use std::fmt;

use thiserror::Error;

/// Failure of a collaborator process (spool, scp, ssh)
#[derive(Debug, Error)]
pub enum ExecError {
    /// The program could not be started
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran but reported failure
    #[error("{program} exited with {}: {stderr}", .status.map_or_else(|| "signal".to_string(), |c| format!("status {c}")))]
    Status {
        program: String,
        status: Option<i32>,
        stderr: String,
    },
}

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// No printer name could be discovered from the status query
    #[error("Printer not found: no `printer` line in status output")]
    PrinterNotFound,

    /// The printer status query itself failed
    #[error("Printer status query failed: {0}")]
    StatusQuery(#[source] ExecError),

    /// The local spooler refused the job
    #[error("Spool submission to {printer} failed: {source}")]
    SpoolSubmission {
        printer: String,
        #[source]
        source: ExecError,
    },

    /// Copying the document to the remote host failed
    #[error("Remote transfer to {host} failed: {source}")]
    RemoteTransfer {
        host: String,
        #[source]
        source: ExecError,
    },

    /// The remote spooler refused the staged document
    #[error("Remote print on {host} ({printer}) failed: {source}")]
    RemotePrint {
        host: String,
        printer: String,
        #[source]
        source: ExecError,
    },

    /// USB device could not be opened, claimed, or has no bulk OUT endpoint
    #[error("USB device {vendor_id:04x}:{product_id:04x} unavailable: {reason}")]
    DeviceUnavailable {
        vendor_id: u16,
        product_id: u16,
        reason: String,
    },

    /// Fewer bytes reached the device than were sent
    #[error("Partial write: {written} of {expected} bytes")]
    PartialWrite { written: usize, expected: usize },

    /// Network connection error
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Writing to an open connection or device failed
    #[error("Transmission failed: {0}")]
    Transmission(String),

    /// The caller's deadline expired
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The scratch artifact could not be created or written
    #[error("Scratch artifact error: {0}")]
    Scratch(#[source] std::io::Error),
}

/// Delivery stage a [`PrintError`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStage {
    Config,
    Scratch,
    Resolve,
    Transport,
    Deadline,
}

impl fmt::Display for DeliveryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Config => "config",
            Self::Scratch => "scratch",
            Self::Resolve => "resolve",
            Self::Transport => "transport",
            Self::Deadline => "deadline",
        };
        f.write_str(name)
    }
}

impl PrintError {
    /// Stage of the delivery that failed
    pub fn stage(&self) -> DeliveryStage {
        match self {
            Self::InvalidConfig(_) => DeliveryStage::Config,
            Self::Scratch(_) => DeliveryStage::Scratch,
            Self::PrinterNotFound | Self::StatusQuery(_) => DeliveryStage::Resolve,
            Self::Timeout(_) => DeliveryStage::Deadline,
            Self::SpoolSubmission { .. }
            | Self::RemoteTransfer { .. }
            | Self::RemotePrint { .. }
            | Self::DeviceUnavailable { .. }
            | Self::PartialWrite { .. }
            | Self::Connection(_)
            | Self::Transmission(_) => DeliveryStage::Transport,
        }
    }
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
