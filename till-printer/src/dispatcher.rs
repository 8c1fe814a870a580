//! Delivery of rendered documents
//!
//! Every delivery follows the same lifecycle: write the document to a fresh
//! scratch file, hand it (or its bytes) to the handler for the target's
//! transport, drop the scratch file. Nothing is shared between deliveries,
//! so one [`Dispatcher`] can serve concurrent jobs.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use shared::RenderedDocument;
use tracing::{error, info, instrument, warn};

use crate::error::{PrintError, PrintResult};
use crate::exec::{CommandRunner, SystemCommandRunner};
use crate::network;
use crate::scratch::ScratchArtifact;
use crate::spool;
use crate::target::{TransportKind, TransportTarget, UsbTarget};
use crate::usb::UsbSink;

/// Successful delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub transport: TransportKind,
    /// Bytes handed to the transport
    pub bytes: usize,
    /// Spool queue used, for local and remote deliveries
    pub printer: Option<String>,
}

#[derive(Clone)]
pub struct Dispatcher {
    runner: Arc<dyn CommandRunner>,
    usb: Option<Arc<dyn UsbSink>>,
    scratch_dir: Option<PathBuf>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("usb", &self.usb.is_some())
            .field("scratch_dir", &self.scratch_dir)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Dispatcher running external tools through `runner`, without USB support
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            usb: None,
            scratch_dir: None,
        }
    }

    /// Real processes, plus libusb when built with the `usb` feature
    pub fn system() -> Self {
        let dispatcher = Self::new(Arc::new(SystemCommandRunner));
        #[cfg(feature = "usb")]
        let dispatcher = dispatcher.with_usb(crate::usb::RusbBackend);
        dispatcher
    }

    pub fn with_usb<S: UsbSink + 'static>(mut self, sink: S) -> Self {
        self.usb = Some(Arc::new(sink));
        self
    }

    /// Create scratch files in `dir` instead of the system temp dir
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Deliver `document` to `target`
    ///
    /// The scratch file is gone when this returns, whatever the outcome.
    #[instrument(skip(self, document, target), fields(transport = %target.kind(), bytes = document.len()))]
    pub async fn deliver(
        &self,
        document: &RenderedDocument,
        target: &TransportTarget,
    ) -> PrintResult<Ack> {
        let scratch = ScratchArtifact::create(self.scratch_dir.as_deref(), document.as_bytes())
            .inspect_err(|e| error!(error = %e, "Failed to create scratch artifact"))?;

        let outcome = self.dispatch(document, target, &scratch).await;
        drop(scratch);

        match outcome {
            Ok((bytes, printer)) => {
                info!(printer = printer.as_deref(), "Delivery complete");
                Ok(Ack {
                    transport: target.kind(),
                    bytes,
                    printer,
                })
            }
            Err(e) => {
                error!(stage = %e.stage(), error = %e, "Delivery failed");
                Err(e)
            }
        }
    }

    /// [`deliver`](Self::deliver) bounded by `deadline`
    ///
    /// On expiry the in-flight delivery is dropped, which removes its
    /// scratch file, and [`PrintError::Timeout`] is returned.
    pub async fn deliver_within(
        &self,
        document: &RenderedDocument,
        target: &TransportTarget,
        deadline: Duration,
    ) -> PrintResult<Ack> {
        tokio::time::timeout(deadline, self.deliver(document, target))
            .await
            .unwrap_or_else(|_| {
                warn!(transport = %target.kind(), ?deadline, "Delivery deadline expired");
                Err(PrintError::Timeout(format!(
                    "{} delivery exceeded {:?}",
                    target.kind(),
                    deadline
                )))
            })
    }

    async fn dispatch(
        &self,
        document: &RenderedDocument,
        target: &TransportTarget,
        scratch: &ScratchArtifact,
    ) -> PrintResult<(usize, Option<String>)> {
        match target {
            TransportTarget::LocalSpool(local) => {
                let printer = spool::print_local(&*self.runner, local, scratch.path()).await?;
                Ok((document.len(), Some(printer)))
            }
            TransportTarget::RemoteSpool(remote) => {
                let file_name = scratch.file_name()?;
                let printer =
                    spool::print_remote(&*self.runner, remote, scratch.path(), &file_name).await?;
                Ok((document.len(), Some(printer)))
            }
            TransportTarget::UsbDevice(usb) => {
                let written = self.write_usb(usb, document.as_bytes()).await?;
                Ok((written, None))
            }
            TransportTarget::NetworkSocket(net) => {
                let written = network::send(net, document.as_bytes()).await?;
                Ok((written, None))
            }
        }
    }

    async fn write_usb(&self, target: &UsbTarget, bytes: &[u8]) -> PrintResult<usize> {
        let sink = self.usb.clone().ok_or_else(|| PrintError::DeviceUnavailable {
            vendor_id: target.vendor_id(),
            product_id: target.product_id(),
            reason: "USB support not configured".to_string(),
        })?;

        let target = target.clone();
        let bytes = bytes.to_vec();
        match tokio::task::spawn_blocking(move || sink.write_document(&target, &bytes)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(PrintError::Transmission(format!("usb worker cancelled: {e}"))),
        }
    }
}
