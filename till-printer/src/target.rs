//! Delivery targets
//!
//! A [`TransportTarget`] is validated when it is built, so a delivery only
//! fails for reasons found while talking to the printer.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PrintError, PrintResult};

/// Default raw socket host
pub const DEFAULT_NETWORK_HOST: &str = "127.0.0.1";
/// Default raw socket port (JetDirect)
pub const DEFAULT_NETWORK_PORT: u16 = 9100;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_USB_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a rendered document goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportTarget {
    LocalSpool(LocalTarget),
    RemoteSpool(RemoteTarget),
    UsbDevice(UsbTarget),
    NetworkSocket(NetworkTarget),
}

impl TransportTarget {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::LocalSpool(_) => TransportKind::Local,
            Self::RemoteSpool(_) => TransportKind::Remote,
            Self::UsbDevice(_) => TransportKind::Usb,
            Self::NetworkSocket(_) => TransportKind::Network,
        }
    }
}

impl From<LocalTarget> for TransportTarget {
    fn from(target: LocalTarget) -> Self {
        Self::LocalSpool(target)
    }
}

impl From<RemoteTarget> for TransportTarget {
    fn from(target: RemoteTarget) -> Self {
        Self::RemoteSpool(target)
    }
}

impl From<UsbTarget> for TransportTarget {
    fn from(target: UsbTarget) -> Self {
        Self::UsbDevice(target)
    }
}

impl From<NetworkTarget> for TransportTarget {
    fn from(target: NetworkTarget) -> Self {
        Self::NetworkSocket(target)
    }
}

/// Transport variant tag, used in logs and acknowledgements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Local,
    Remote,
    Usb,
    Network,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Usb => "usb",
            Self::Network => "network",
        })
    }
}

fn non_blank(value: impl Into<String>, what: &str) -> PrintResult<String> {
    let value = value.into();
    if value.trim().is_empty() {
        return Err(PrintError::InvalidConfig(format!("{what} must not be empty")));
    }
    Ok(value)
}

/// Characters a spool queue name may contain besides ASCII alphanumerics
const QUEUE_NAME_PUNCT: &[char] = &['-', '_', '.', '@', '+'];

/// Queue names end up on a remote shell command line
fn is_queue_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || QUEUE_NAME_PUNCT.contains(&c))
}

fn queue_name(value: impl Into<String>) -> PrintResult<String> {
    let value = non_blank(value, "printer name")?;
    if !is_queue_name(&value) {
        return Err(PrintError::InvalidConfig(format!(
            "printer name {value:?} may only contain letters, digits and - _ . @ +"
        )));
    }
    Ok(value)
}

/// Printer attached to this host's spooler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTarget {
    printer: Option<String>,
}

impl LocalTarget {
    /// Print to a named queue
    pub fn named(printer: impl Into<String>) -> PrintResult<Self> {
        Ok(Self {
            printer: Some(queue_name(printer)?),
        })
    }

    /// Print to the spooler's default printer, discovered at delivery
    pub fn default_printer() -> Self {
        Self { printer: None }
    }

    pub fn printer(&self) -> Option<&str> {
        self.printer.as_deref()
    }
}

/// How the secure shell authenticates against the remote host
#[derive(Clone, PartialEq, Eq)]
pub enum RemoteCredential {
    /// Keys already loaded in the user's ssh agent
    Agent,
    /// Private key file, passed as `-i <path>`
    IdentityFile(PathBuf),
    /// Password, fed through `sshpass -p`
    ///
    /// The secret appears on the `sshpass` argument list, so other local
    /// users can read it from the process table while a delivery runs.
    /// Prefer `IdentityFile` or `Agent` on shared hosts.
    Password(String),
}

impl fmt::Debug for RemoteCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agent => f.write_str("Agent"),
            Self::IdentityFile(path) => f.debug_tuple("IdentityFile").field(path).finish(),
            Self::Password(_) => f.write_str("Password(***)"),
        }
    }
}

/// Printer attached to another host's spooler, reached over scp/ssh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    host: String,
    username: String,
    credential: RemoteCredential,
    printer: Option<String>,
}

impl RemoteTarget {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        credential: RemoteCredential,
    ) -> PrintResult<Self> {
        let credential = match credential {
            RemoteCredential::IdentityFile(path) if path.as_os_str().is_empty() => {
                return Err(PrintError::InvalidConfig(
                    "identity file path must not be empty".to_string(),
                ));
            }
            other => other,
        };

        Ok(Self {
            host: non_blank(host, "remote host")?,
            username: non_blank(username, "remote username")?,
            credential,
            printer: None,
        })
    }

    /// Name the remote queue instead of discovering it
    pub fn with_printer(mut self, printer: impl Into<String>) -> PrintResult<Self> {
        self.printer = Some(queue_name(printer)?);
        Ok(self)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn credential(&self) -> &RemoteCredential {
        &self.credential
    }

    pub fn printer(&self) -> Option<&str> {
        self.printer.as_deref()
    }

    /// `user@host`
    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }
}

/// Printer on the USB bus, addressed by vendor/product id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbTarget {
    vendor_id: u16,
    product_id: u16,
    endpoint: Option<u8>,
    interface: u8,
    timeout: Duration,
}

impl UsbTarget {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            endpoint: None,
            interface: 0,
            timeout: DEFAULT_USB_TIMEOUT,
        }
    }

    /// Use this bulk OUT endpoint address instead of the first one found
    pub fn with_endpoint(mut self, endpoint: u8) -> PrintResult<Self> {
        // bit 7 set means IN
        if endpoint & 0x80 != 0 {
            return Err(PrintError::InvalidConfig(format!(
                "endpoint {endpoint:#04x} is not an OUT endpoint"
            )));
        }
        self.endpoint = Some(endpoint);
        Ok(self)
    }

    pub fn with_interface(mut self, interface: u8) -> Self {
        self.interface = interface;
        self
    }

    /// Bulk transfer timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    pub fn endpoint(&self) -> Option<u8> {
        self.endpoint
    }

    pub fn interface(&self) -> u8 {
        self.interface
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Printer listening on a raw TCP socket
///
/// The host may be an IP literal or a name; names are resolved at
/// delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkTarget {
    host: String,
    port: u16,
    timeout: Duration,
}

impl NetworkTarget {
    /// Missing host or port fall back to `127.0.0.1` / `9100`
    pub fn new(host: Option<&str>, port: Option<u16>) -> PrintResult<Self> {
        let host = host
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .unwrap_or(DEFAULT_NETWORK_HOST);
        let port = port.unwrap_or(DEFAULT_NETWORK_PORT);
        Self::validated(host, port)
    }

    /// Create from an address string (e.g., "192.168.1.100:9100",
    /// "kitchen-printer.lan:9100", "[::1]:9100")
    pub fn from_addr(addr: &str) -> PrintResult<Self> {
        if let Ok(addr) = addr.parse::<SocketAddr>() {
            return Self::validated(&addr.ip().to_string(), addr.port());
        }

        let invalid = || PrintError::InvalidConfig(format!("Invalid address: {addr}"));
        let (host, port) = addr.rsplit_once(':').ok_or_else(invalid)?;
        let port = port.parse::<u16>().map_err(|_| invalid())?;
        Self::validated(host, port)
    }

    fn validated(host: &str, port: u16) -> PrintResult<Self> {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() || host.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(PrintError::InvalidConfig(format!("Invalid host: {host:?}")));
        }
        if port == 0 {
            return Err(PrintError::InvalidConfig(format!(
                "Invalid port in address: {host}:{port}"
            )));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, with IPv6 literals bracketed
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for NetworkTarget {
    fn default() -> Self {
        Self {
            host: DEFAULT_NETWORK_HOST.to_string(),
            port: DEFAULT_NETWORK_PORT,
            timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_target_rejects_blank_name() {
        assert!(matches!(
            LocalTarget::named("  "),
            Err(PrintError::InvalidConfig(_))
        ));
        assert_eq!(LocalTarget::named("Kitchen").unwrap().printer(), Some("Kitchen"));
        assert_eq!(LocalTarget::default_printer().printer(), None);
    }

    #[test]
    fn test_remote_target_validation() {
        assert!(RemoteTarget::new("", "pos", RemoteCredential::Agent).is_err());
        assert!(RemoteTarget::new("till-2", " ", RemoteCredential::Agent).is_err());
        assert!(
            RemoteTarget::new("till-2", "pos", RemoteCredential::IdentityFile(PathBuf::new()))
                .is_err()
        );

        let target = RemoteTarget::new("till-2", "pos", RemoteCredential::Agent)
            .unwrap()
            .with_printer("Bar")
            .unwrap();
        assert_eq!(target.destination(), "pos@till-2");
        assert_eq!(target.printer(), Some("Bar"));
    }

    #[test]
    fn test_printer_name_rejects_shell_syntax() {
        let remote = || RemoteTarget::new("till-2", "pos", RemoteCredential::Agent).unwrap();
        for name in ["Bar; touch /tmp/x #", "Bar Kitchen", "$(reboot)", "a|b", "q'uote", "a`b`", "a&b"] {
            assert!(
                matches!(remote().with_printer(name), Err(PrintError::InvalidConfig(_))),
                "{name:?} accepted"
            );
            assert!(LocalTarget::named(name).is_err(), "{name:?} accepted");
        }
        for name in ["Bar", "EPSON_TM-T20II", "kitchen.2", "lp@host", "Star+1"] {
            assert_eq!(remote().with_printer(name).unwrap().printer(), Some(name));
        }
    }

    #[test]
    fn test_password_is_not_logged() {
        let credential = RemoteCredential::Password("hunter2".to_string());
        assert_eq!(format!("{credential:?}"), "Password(***)");
    }

    #[test]
    fn test_usb_target_defaults() {
        let target = UsbTarget::new(0x04b8, 0x0202);
        assert_eq!(target.interface(), 0);
        assert_eq!(target.endpoint(), None);
        assert_eq!(target.timeout(), Duration::from_secs(5));

        assert!(target.clone().with_endpoint(0x81).is_err());
        assert_eq!(target.with_endpoint(0x01).unwrap().endpoint(), Some(0x01));
    }

    #[test]
    fn test_network_target_defaults() {
        let target = NetworkTarget::new(None, None).unwrap();
        assert_eq!(target.address(), "127.0.0.1:9100");
        assert_eq!(target, NetworkTarget::default());

        let target = NetworkTarget::new(Some("192.168.1.50"), None).unwrap();
        assert_eq!(target.port(), 9100);

        let target = NetworkTarget::new(None, Some(9101)).unwrap();
        assert_eq!(target.address(), "127.0.0.1:9101");
    }

    #[test]
    fn test_network_target_accepts_hostnames() {
        let target = NetworkTarget::new(Some("kitchen-printer.lan"), None).unwrap();
        assert_eq!(target.host(), "kitchen-printer.lan");
        assert_eq!(target.address(), "kitchen-printer.lan:9100");

        let target = NetworkTarget::from_addr("localhost:9101").unwrap();
        assert_eq!((target.host(), target.port()), ("localhost", 9101));

        let target = NetworkTarget::from_addr("[::1]:9100").unwrap();
        assert_eq!(target.host(), "::1");
        assert_eq!(target.address(), "[::1]:9100");
    }

    #[test]
    fn test_network_target_rejects_bad_address() {
        assert!(matches!(
            NetworkTarget::new(Some("not a host"), None),
            Err(PrintError::InvalidConfig(_))
        ));
        assert!(NetworkTarget::new(Some("printer.lan"), Some(0)).is_err());
        assert!(NetworkTarget::from_addr("10.0.0.1:0").is_err());
        assert!(NetworkTarget::from_addr("10.0.0.1").is_err());
        assert!(NetworkTarget::from_addr(":9100").is_err());
        assert!(NetworkTarget::from_addr("printer.lan:http").is_err());
    }

    #[test]
    fn test_kind_display() {
        let target: TransportTarget = NetworkTarget::default().into();
        assert_eq!(target.kind(), TransportKind::Network);
        assert_eq!(target.kind().to_string(), "network");
        assert_eq!(TransportKind::Remote.to_string(), "remote");
    }
}
