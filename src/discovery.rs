//! Device discovery via UDP multicast search.

use std::net::SocketAddr;

use log::debug;
use tokio::net::UdpSocket;

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// SSDP-style multicast group and port bulbs listen on.
pub const MULTICAST_ADDR: &str = "239.255.255.250:1982";

/// Local port historically used for the search socket; falls back to an
/// ephemeral port when taken.
const SEARCH_LOCAL_PORT: u16 = 43210;

const SEARCH_MESSAGE: &str = "M-SEARCH * HTTP/1.1\r\n\
    HOST: 239.255.255.250:1982\r\n\
    MAN: \"ssdp:discover\"\r\n\
    ST: wifi_bulb\r\n";

/// An in-flight discovery sweep.
///
/// `start` binds a socket and sends one search request; bulbs reply with
/// one datagram each, in any order and at any rate. This type enforces no
/// timeout and performs no deduplication; the caller bounds the listening
/// window (see [`crate::Yeelight::discover`]) and the [`crate::Registry`]
/// dedupes by id while ingesting.
pub struct DiscoverySearch {
    socket: UdpSocket,
}

impl DiscoverySearch {
    /// Bind the search socket and send one multicast search request.
    pub async fn start() -> Result<Self> {
        let socket = match UdpSocket::bind(("0.0.0.0", SEARCH_LOCAL_PORT)).await {
            Ok(socket) => socket,
            Err(e) => {
                debug!("local port {SEARCH_LOCAL_PORT} unavailable ({e}); binding ephemeral");
                UdpSocket::bind("0.0.0.0:0")
                    .await
                    .map_err(|e| Error::socket("bind", e))?
            }
        };

        socket
            .send_to(SEARCH_MESSAGE.as_bytes(), MULTICAST_ADDR)
            .await
            .map_err(|e| Error::socket("send_to", e))?;

        Ok(DiscoverySearch { socket })
    }

    /// Receive the next raw response datagram and its sender address.
    pub async fn recv(&self) -> Result<(Vec<u8>, SocketAddr)> {
        let mut buffer = [0u8; 2048];
        let (size, addr) = self
            .socket
            .recv_from(&mut buffer)
            .await
            .map_err(|e| Error::socket("recv_from", e))?;
        Ok((buffer[..size].to_vec(), addr))
    }
}
