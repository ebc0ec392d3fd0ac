//! Transport seam between the API client and the network stack

use embedded_io_async::{Read, Write};

/// Opens TCP connections to named hosts.
///
/// Firmware implements this over embassy-net (DNS + `TcpSocket`); tests use
/// in-memory connections.
pub trait TcpConnector {
    type Error: core::fmt::Debug;

    type Connection<'a>: Read + Write
    where
        Self: 'a;

    /// Whether the station currently has a usable network link.
    fn is_connected(&self) -> bool;

    /// Resolve `host` and open a connection to `port`.
    fn connect<'a>(
        &'a mut self,
        host: &'a str,
        port: u16,
    ) -> impl Future<Output = Result<Self::Connection<'a>, Self::Error>>;
}
