//! Raw TCP transport (port 9100)
//!
//! Most thermal printers accept raw bytes on a plain socket.

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, instrument, warn};

use crate::error::{PrintError, PrintResult};
use crate::target::NetworkTarget;

/// Connect, send everything, close
///
/// Host names are resolved here; a lookup failure is a connection error.
#[instrument(skip(target, data), fields(addr = %target.address(), data_len = data.len()))]
pub(crate) async fn send(target: &NetworkTarget, data: &[u8]) -> PrintResult<usize> {
    info!("Connecting to printer");

    let address = target.address();
    let connect = TcpStream::connect((target.host(), target.port()));
    let mut stream = tokio::time::timeout(target.timeout(), connect)
        .await
        .map_err(|_| {
            warn!("Connection timeout");
            PrintError::Connection(format!("{address}: connect timed out"))
        })?
        .map_err(|e| {
            warn!(error = %e, "Connection failed");
            PrintError::Connection(format!("{address}: {e}"))
        })?;

    info!("Connected, sending {} bytes", data.len());

    let transmission = |e: std::io::Error| {
        warn!(error = %e, "Write failed");
        PrintError::Transmission(format!("{address}: {e}"))
    };
    stream.write_all(data).await.map_err(transmission)?;
    stream.flush().await.map_err(transmission)?;

    if let Err(e) = stream.shutdown().await {
        // data already handed to the kernel
        warn!(error = %e, "Socket shutdown failed");
    }

    info!("Print job sent successfully");
    Ok(data.len())
}
