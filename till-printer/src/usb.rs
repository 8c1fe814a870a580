//! USB bulk transport
//!
//! Four resources are acquired in order (context, device handle, interface
//! claim, OUT endpoint). Each one is held by a scope that owns the previous
//! one, so dropping the outermost scope releases them in reverse order on
//! every exit path.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::error::{PrintError, PrintResult};
use crate::target::UsbTarget;

/// Failure reported by a [`UsbBackend`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct UsbError(pub String);

impl UsbError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Blocking USB capability
///
/// Release methods cannot fail; implementations log and move on.
pub trait UsbBackend: Send + Sync + 'static {
    type Context;
    type Device;

    fn open_context(&self) -> Result<Self::Context, UsbError>;
    fn close_context(&self, context: Self::Context);

    fn open_device(
        &self,
        context: &Self::Context,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<Self::Device, UsbError>;
    fn close_device(&self, device: Self::Device);

    fn claim_interface(&self, device: &mut Self::Device, interface: u8) -> Result<(), UsbError>;
    fn release_interface(&self, device: &mut Self::Device, interface: u8);

    /// Bulk OUT endpoint address on `interface`, `preferred` when given
    fn find_out_endpoint(
        &self,
        device: &Self::Device,
        interface: u8,
        preferred: Option<u8>,
    ) -> Result<u8, UsbError>;
    fn release_endpoint(&self, device: &Self::Device, endpoint: u8);

    /// Bytes actually written
    fn write_bulk(
        &self,
        device: &Self::Device,
        endpoint: u8,
        bytes: &[u8],
        timeout: Duration,
    ) -> Result<usize, UsbError>;
}

/// Object-safe view of a [`UsbBackend`], held by the dispatcher
pub trait UsbSink: Send + Sync {
    /// Write the whole document to the device, blocking
    fn write_document(&self, target: &UsbTarget, bytes: &[u8]) -> PrintResult<usize>;
}

impl<B: UsbBackend> UsbSink for B {
    fn write_document(&self, target: &UsbTarget, bytes: &[u8]) -> PrintResult<usize> {
        write_document(self, target, bytes)
    }
}

struct ContextScope<'b, B: UsbBackend> {
    backend: &'b B,
    context: Option<B::Context>,
}

impl<'b, B: UsbBackend> ContextScope<'b, B> {
    fn open(backend: &'b B) -> Result<Self, UsbError> {
        let context = backend.open_context()?;
        Ok(Self {
            backend,
            context: Some(context),
        })
    }
}

impl<B: UsbBackend> Drop for ContextScope<'_, B> {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            self.backend.close_context(context);
        }
    }
}

struct DeviceScope<'b, B: UsbBackend> {
    device: Option<B::Device>,
    context: ContextScope<'b, B>,
}

impl<'b, B: UsbBackend> DeviceScope<'b, B> {
    fn open(context: ContextScope<'b, B>, vendor_id: u16, product_id: u16) -> Result<Self, UsbError> {
        let device = match &context.context {
            Some(ctx) => context.backend.open_device(ctx, vendor_id, product_id)?,
            None => return Err(UsbError::new("context already closed")),
        };
        Ok(Self {
            device: Some(device),
            context,
        })
    }

    fn backend(&self) -> &'b B {
        self.context.backend
    }
}

impl<B: UsbBackend> Drop for DeviceScope<'_, B> {
    fn drop(&mut self) {
        if let Some(device) = self.device.take() {
            self.backend().close_device(device);
        }
    }
}

struct InterfaceScope<'b, B: UsbBackend> {
    interface: u8,
    claimed: bool,
    device: DeviceScope<'b, B>,
}

impl<'b, B: UsbBackend> InterfaceScope<'b, B> {
    fn claim(mut device: DeviceScope<'b, B>, interface: u8) -> Result<Self, UsbError> {
        let backend = device.backend();
        match device.device.as_mut() {
            Some(dev) => backend.claim_interface(dev, interface)?,
            None => return Err(UsbError::new("device already closed")),
        }
        Ok(Self {
            interface,
            claimed: true,
            device,
        })
    }
}

impl<B: UsbBackend> Drop for InterfaceScope<'_, B> {
    fn drop(&mut self) {
        let backend = self.device.backend();
        if let (true, Some(dev)) = (self.claimed, self.device.device.as_mut()) {
            backend.release_interface(dev, self.interface);
            self.claimed = false;
        }
    }
}

struct EndpointScope<'b, B: UsbBackend> {
    endpoint: u8,
    interface: InterfaceScope<'b, B>,
}

impl<'b, B: UsbBackend> EndpointScope<'b, B> {
    fn find(interface: InterfaceScope<'b, B>, preferred: Option<u8>) -> Result<Self, UsbError> {
        let endpoint = match interface.device.device.as_ref() {
            Some(dev) => {
                interface
                    .device
                    .backend()
                    .find_out_endpoint(dev, interface.interface, preferred)?
            }
            None => return Err(UsbError::new("device already closed")),
        };
        Ok(Self {
            endpoint,
            interface,
        })
    }

    fn write(&self, bytes: &[u8], timeout: Duration) -> Result<usize, UsbError> {
        match self.interface.device.device.as_ref() {
            Some(dev) => self
                .interface
                .device
                .backend()
                .write_bulk(dev, self.endpoint, bytes, timeout),
            None => Err(UsbError::new("device already closed")),
        }
    }
}

impl<B: UsbBackend> Drop for EndpointScope<'_, B> {
    fn drop(&mut self) {
        if let Some(dev) = self.interface.device.device.as_ref() {
            self.interface
                .device
                .backend()
                .release_endpoint(dev, self.endpoint);
        }
    }
}

/// Acquire, write, release; blocking
#[instrument(skip(backend, bytes), fields(
    vendor_id = target.vendor_id(),
    product_id = target.product_id(),
    data_len = bytes.len()
))]
pub(crate) fn write_document<B: UsbBackend>(
    backend: &B,
    target: &UsbTarget,
    bytes: &[u8],
) -> PrintResult<usize> {
    let unavailable = |e: UsbError| {
        warn!(error = %e, "USB device unavailable");
        PrintError::DeviceUnavailable {
            vendor_id: target.vendor_id(),
            product_id: target.product_id(),
            reason: e.to_string(),
        }
    };

    let context = ContextScope::open(backend).map_err(unavailable)?;
    let device = DeviceScope::open(context, target.vendor_id(), target.product_id())
        .map_err(unavailable)?;
    let interface = InterfaceScope::claim(device, target.interface()).map_err(unavailable)?;
    let endpoint = EndpointScope::find(interface, target.endpoint()).map_err(unavailable)?;
    debug!(endpoint = endpoint.endpoint, "Claimed USB endpoint");

    let written = endpoint.write(bytes, target.timeout()).map_err(|e| {
        warn!(error = %e, "USB bulk write failed");
        PrintError::Transmission(format!("usb bulk write: {e}"))
    })?;

    if written < bytes.len() {
        warn!(written, expected = bytes.len(), "Short USB write");
        return Err(PrintError::PartialWrite {
            written,
            expected: bytes.len(),
        });
    }

    info!(written, "USB write complete");
    Ok(written)
}

#[cfg(feature = "usb")]
pub use self::rusb_backend::{RusbBackend, RusbDevice};

#[cfg(feature = "usb")]
mod rusb_backend {
    use std::time::Duration;

    use rusb::{Context, DeviceHandle, Direction, TransferType, UsbContext};
    use tracing::{debug, warn};

    use super::{UsbBackend, UsbError};

    impl From<rusb::Error> for UsbError {
        fn from(e: rusb::Error) -> Self {
            Self(e.to_string())
        }
    }

    /// [`UsbBackend`] over libusb
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RusbBackend;

    /// Open handle plus the interface whose kernel driver we detached
    pub struct RusbDevice {
        handle: DeviceHandle<Context>,
        detached: Option<u8>,
    }

    impl UsbBackend for RusbBackend {
        type Context = Context;
        type Device = RusbDevice;

        fn open_context(&self) -> Result<Context, UsbError> {
            Ok(Context::new()?)
        }

        fn close_context(&self, context: Context) {
            drop(context);
        }

        fn open_device(
            &self,
            context: &Context,
            vendor_id: u16,
            product_id: u16,
        ) -> Result<RusbDevice, UsbError> {
            let handle = context
                .open_device_with_vid_pid(vendor_id, product_id)
                .ok_or_else(|| {
                    UsbError::new(format!(
                        "no device {vendor_id:04x}:{product_id:04x} (missing or no permission)"
                    ))
                })?;
            Ok(RusbDevice {
                handle,
                detached: None,
            })
        }

        fn close_device(&self, device: RusbDevice) {
            drop(device);
        }

        fn claim_interface(&self, device: &mut RusbDevice, interface: u8) -> Result<(), UsbError> {
            // usblp holds thermal printers on Linux
            if let Ok(true) = device.handle.kernel_driver_active(interface) {
                device.handle.detach_kernel_driver(interface)?;
                device.detached = Some(interface);
                debug!(interface, "Detached kernel driver");
            }
            device.handle.claim_interface(interface)?;
            Ok(())
        }

        fn release_interface(&self, device: &mut RusbDevice, interface: u8) {
            if let Err(e) = device.handle.release_interface(interface) {
                warn!(interface, error = %e, "Failed to release USB interface");
            }
            if let Some(detached) = device.detached.take() {
                if let Err(e) = device.handle.attach_kernel_driver(detached) {
                    warn!(interface = detached, error = %e, "Failed to reattach kernel driver");
                }
            }
        }

        fn find_out_endpoint(
            &self,
            device: &RusbDevice,
            interface: u8,
            preferred: Option<u8>,
        ) -> Result<u8, UsbError> {
            if let Some(endpoint) = preferred {
                return Ok(endpoint);
            }

            let config = device.handle.device().active_config_descriptor()?;
            config
                .interfaces()
                .filter(|iface| iface.number() == interface)
                .flat_map(|iface| iface.descriptors())
                .flat_map(|desc| desc.endpoint_descriptors().collect::<Vec<_>>())
                .find(|ep| {
                    ep.transfer_type() == TransferType::Bulk && ep.direction() == Direction::Out
                })
                .map(|ep| ep.address())
                .ok_or_else(|| UsbError::new(format!("no bulk OUT endpoint on interface {interface}")))
        }

        fn release_endpoint(&self, _device: &RusbDevice, _endpoint: u8) {}

        fn write_bulk(
            &self,
            device: &RusbDevice,
            endpoint: u8,
            bytes: &[u8],
            timeout: Duration,
        ) -> Result<usize, UsbError> {
            Ok(device.handle.write_bulk(endpoint, bytes, timeout)?)
        }
    }
}
