//! Agent configuration
//!
//! Everything comes from environment variables (a `.env` file is loaded
//! first by [`crate::setup_environment`]).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use till_printer::{
    DEFAULT_NETWORK_HOST, DEFAULT_NETWORK_PORT, LocalTarget, NetworkTarget, PrintError,
    RemoteCredential, RemoteTarget, TransportKind, TransportTarget, UsbTarget,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid {var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Target(#[from] PrintError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Which record shape `TILL_DATA` holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataKind {
    /// `PrintReadyFields`
    #[default]
    Fields,
    /// `StructuredTicket`
    Ticket,
}

impl FromStr for DataKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fields" => Ok(Self::Fields),
            "ticket" => Ok(Self::Ticket),
            other => Err(format!("expected `fields` or `ticket`, got `{other}`")),
        }
    }
}

fn parse_transport(s: &str) -> Result<TransportKind, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "local" => Ok(TransportKind::Local),
        "remote" => Ok(TransportKind::Remote),
        "usb" => Ok(TransportKind::Usb),
        "network" => Ok(TransportKind::Network),
        other => Err(format!("unknown transport `{other}`")),
    }
}

/// Agent configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | TILL_TRANSPORT | local | local / remote / usb / network |
/// | TILL_PRINTER | - | spool queue name, discovered when unset |
/// | TILL_REMOTE_HOST | - | remote spool host |
/// | TILL_REMOTE_USER | - | remote spool user |
/// | TILL_REMOTE_IDENTITY | - | ssh private key |
/// | TILL_REMOTE_PASSWORD | - | ssh password (via sshpass) |
/// | TILL_USB_VENDOR_ID | - | hex (0x04b8) or decimal |
/// | TILL_USB_PRODUCT_ID | - | hex or decimal |
/// | TILL_USB_ENDPOINT | - | bulk OUT endpoint address |
/// | TILL_NETWORK_HOST | 127.0.0.1 | raw socket host |
/// | TILL_NETWORK_PORT | 9100 | raw socket port |
/// | TILL_DATA | required | JSON record file |
/// | TILL_DATA_KIND | fields | fields / ticket |
/// | TILL_TEMPLATE | - | layout file, built-in layout when unset |
/// | TILL_SCRATCH_DIR | system temp | scratch file directory |
/// | TILL_DELIVERY_TIMEOUT_MS | 30000 | deadline for one delivery |
///
/// # Example
///
/// ```ignore
/// TILL_TRANSPORT=network TILL_NETWORK_HOST=192.168.1.100 TILL_DATA=receipt.json cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub transport: TransportKind,
    pub printer: Option<String>,
    pub remote_host: Option<String>,
    pub remote_user: Option<String>,
    /// Identity file wins over password; neither means the ssh agent
    pub remote_credential: RemoteCredential,
    pub usb_vendor_id: Option<u16>,
    pub usb_product_id: Option<u16>,
    pub usb_endpoint: Option<u8>,
    pub network_host: String,
    pub network_port: u16,
    pub data_path: PathBuf,
    pub data_kind: DataKind,
    pub template_path: Option<PathBuf>,
    pub scratch_dir: Option<PathBuf>,
    pub delivery_timeout_ms: u64,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`
    ///
    /// Used by tests to avoid touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let transport = match var("TILL_TRANSPORT") {
            Some(value) => parse_transport(&value).map_err(|reason| ConfigError::Invalid {
                var: "TILL_TRANSPORT",
                value,
                reason,
            })?,
            None => TransportKind::Local,
        };

        let remote_credential = match (var("TILL_REMOTE_IDENTITY"), var("TILL_REMOTE_PASSWORD")) {
            (Some(identity), _) => RemoteCredential::IdentityFile(PathBuf::from(identity)),
            (None, Some(password)) => RemoteCredential::Password(password),
            (None, None) => RemoteCredential::Agent,
        };

        Ok(Self {
            transport,
            printer: var("TILL_PRINTER"),
            remote_host: var("TILL_REMOTE_HOST"),
            remote_user: var("TILL_REMOTE_USER"),
            remote_credential,
            usb_vendor_id: parse_opt("TILL_USB_VENDOR_ID", var("TILL_USB_VENDOR_ID"), parse_id)?,
            usb_product_id: parse_opt("TILL_USB_PRODUCT_ID", var("TILL_USB_PRODUCT_ID"), parse_id)?,
            usb_endpoint: parse_opt("TILL_USB_ENDPOINT", var("TILL_USB_ENDPOINT"), parse_id)?,
            network_host: var("TILL_NETWORK_HOST").unwrap_or_else(|| DEFAULT_NETWORK_HOST.into()),
            network_port: parse_opt("TILL_NETWORK_PORT", var("TILL_NETWORK_PORT"), parse_num)?
                .unwrap_or(DEFAULT_NETWORK_PORT),
            data_path: var("TILL_DATA")
                .map(PathBuf::from)
                .ok_or(ConfigError::Missing("TILL_DATA"))?,
            data_kind: parse_opt("TILL_DATA_KIND", var("TILL_DATA_KIND"), |v| v.parse::<DataKind>())?
                .unwrap_or_default(),
            template_path: var("TILL_TEMPLATE").map(PathBuf::from),
            scratch_dir: var("TILL_SCRATCH_DIR").map(PathBuf::from),
            delivery_timeout_ms: parse_opt(
                "TILL_DELIVERY_TIMEOUT_MS",
                var("TILL_DELIVERY_TIMEOUT_MS"),
                parse_num,
            )?
            .unwrap_or(30000),
        })
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }

    /// Build the delivery target for the configured transport
    pub fn target(&self) -> ConfigResult<TransportTarget> {
        let target = match self.transport {
            TransportKind::Local => {
                let local = match &self.printer {
                    Some(name) => LocalTarget::named(name.as_str())?,
                    None => LocalTarget::default_printer(),
                };
                TransportTarget::LocalSpool(local)
            }
            TransportKind::Remote => {
                let host = self
                    .remote_host
                    .as_deref()
                    .ok_or(ConfigError::Missing("TILL_REMOTE_HOST"))?;
                let user = self
                    .remote_user
                    .as_deref()
                    .ok_or(ConfigError::Missing("TILL_REMOTE_USER"))?;
                let mut remote = RemoteTarget::new(host, user, self.remote_credential.clone())?;
                if let Some(name) = &self.printer {
                    remote = remote.with_printer(name.as_str())?;
                }
                TransportTarget::RemoteSpool(remote)
            }
            TransportKind::Usb => {
                let vendor_id = self
                    .usb_vendor_id
                    .ok_or(ConfigError::Missing("TILL_USB_VENDOR_ID"))?;
                let product_id = self
                    .usb_product_id
                    .ok_or(ConfigError::Missing("TILL_USB_PRODUCT_ID"))?;
                let mut usb = UsbTarget::new(vendor_id, product_id);
                if let Some(endpoint) = self.usb_endpoint {
                    usb = usb.with_endpoint(endpoint)?;
                }
                TransportTarget::UsbDevice(usb)
            }
            TransportKind::Network => TransportTarget::NetworkSocket(NetworkTarget::new(
                Some(&self.network_host),
                Some(self.network_port),
            )?),
        };
        Ok(target)
    }
}

fn parse_opt<T>(
    var: &'static str,
    value: Option<String>,
    parse: impl Fn(&str) -> Result<T, String>,
) -> ConfigResult<Option<T>> {
    value
        .map(|value| {
            parse(&value).map_err(|reason| ConfigError::Invalid { var, value, reason })
        })
        .transpose()
}

fn parse_num<T>(value: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| e.to_string())
}

/// `0x`-prefixed hex or decimal
fn parse_id<T>(value: &str) -> Result<T, String>
where
    T: TryFrom<u32>,
{
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse::<u32>(),
    }
    .map_err(|e| e.to_string())?;

    T::try_from(parsed).map_err(|_| format!("{value} is out of range"))
}
