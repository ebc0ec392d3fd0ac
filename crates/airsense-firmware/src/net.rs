//! embassy-net transport for the cloud API client

use airsense_core::net::TcpConnector;
use embassy_net::dns::{self, DnsQueryType};
use embassy_net::tcp::{self, TcpSocket};
use embassy_net::{IpEndpoint, Stack};
use embassy_time::Duration;
use log::{debug, warn};
use thiserror_no_std::Error;

const RX_BUFFER_LEN: usize = 2048;
const TX_BUFFER_LEN: usize = 1024;
const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("Network is down")]
    NetworkDown,
    #[error("DNS lookup failed: {0:?}")]
    Dns(dns::Error),
    #[error("No address for host")]
    NoAddress,
    #[error("TCP connect failed: {0:?}")]
    Tcp(tcp::ConnectError),
}

/// Opens one TCP connection at a time over the Wi-Fi station stack.
///
/// The socket buffers live in the connector, so a connection borrows it
/// mutably for its whole lifetime.
pub struct EmbassyConnector {
    stack: Stack<'static>,
    rx_buffer: [u8; RX_BUFFER_LEN],
    tx_buffer: [u8; TX_BUFFER_LEN],
}

impl EmbassyConnector {
    pub const fn new(stack: Stack<'static>) -> Self {
        Self {
            stack,
            rx_buffer: [0; RX_BUFFER_LEN],
            tx_buffer: [0; TX_BUFFER_LEN],
        }
    }

    pub fn stack(&self) -> Stack<'static> {
        self.stack
    }
}

impl TcpConnector for EmbassyConnector {
    type Error = ConnectError;
    type Connection<'a>
        = TcpSocket<'a>
    where
        Self: 'a;

    fn is_connected(&self) -> bool {
        self.stack.is_config_up()
    }

    async fn connect<'a>(
        &'a mut self,
        host: &'a str,
        port: u16,
    ) -> Result<Self::Connection<'a>, Self::Error> {
        if !self.stack.is_config_up() {
            return Err(ConnectError::NetworkDown);
        }

        let addresses = self
            .stack
            .dns_query(host, DnsQueryType::A)
            .await
            .map_err(ConnectError::Dns)?;
        let address = *addresses.first().ok_or(ConnectError::NoAddress)?;
        debug!("Resolved {} to {}", host, address);

        let mut socket = TcpSocket::new(self.stack, &mut self.rx_buffer, &mut self.tx_buffer);
        socket.set_timeout(Some(SOCKET_TIMEOUT));
        if let Err(e) = socket.connect(IpEndpoint::new(address, port)).await {
            warn!("Connect to {}:{} failed: {:?}", host, port, e);
            return Err(ConnectError::Tcp(e));
        }
        Ok(socket)
    }
}
