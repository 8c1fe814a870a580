//! # till-printer
//!
//! Delivery of rendered receipts to printers.
//!
//! ## Transports
//!
//! - Local spooler (`lp`), with default-printer discovery via `lpstat`
//! - Remote spooler over `scp` + `ssh`
//! - USB bulk endpoint (libusb via the `usb` feature)
//! - Raw TCP socket (port 9100)
//!
//! Rendering lives in `till-render`; this crate only moves bytes.
//!
//! ## Example
//!
//! ```ignore
//! use till_printer::{Dispatcher, NetworkTarget, TransportTarget};
//!
//! let dispatcher = Dispatcher::system();
//! let target = TransportTarget::NetworkSocket(NetworkTarget::from_addr("192.168.1.100:9100")?);
//! let ack = dispatcher.deliver(&document, &target).await?;
//! ```

mod discovery;
mod dispatcher;
mod error;
mod exec;
mod network;
mod scratch;
mod spool;
mod target;
mod usb;

// Re-exports
pub use discovery::{discover_local_printer, parse_printer_name};
pub use dispatcher::{Ack, Dispatcher};
pub use error::{DeliveryStage, ExecError, PrintError, PrintResult};
pub use exec::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use spool::REMOTE_STAGING_DIR;
pub use target::{
    DEFAULT_NETWORK_HOST, DEFAULT_NETWORK_PORT, LocalTarget, NetworkTarget, RemoteCredential,
    RemoteTarget, TransportKind, TransportTarget, UsbTarget,
};
pub use usb::{UsbBackend, UsbError, UsbSink};

#[cfg(feature = "usb")]
pub use usb::{RusbBackend, RusbDevice};
