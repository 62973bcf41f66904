//! Exchange websocket plumbing for the depth diff channel.
//!
//! Connections are plain blocking sockets: each ingestor owns one and parks its thread in
//! the read until the next frame arrives.

pub mod binance;

use std::net::TcpStream;

use tungstenite::{stream::MaybeTlsStream, Message, WebSocket};
use url::Url;

use crate::error::IngestError;

pub type DepthSocket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Open the websocket and complete the TLS and websocket handshakes.
pub fn connect(url: Url) -> Result<DepthSocket, IngestError> {
    let (socket, _response) = tungstenite::connect(url).map_err(IngestError::Connect)?;
    Ok(socket)
}

/// Blocking reads off `socket` as an endless stream of frames.
/// Callers stop at the first error.
pub fn frames(mut socket: DepthSocket) -> impl Iterator<Item = Result<Message, tungstenite::Error>> {
    std::iter::from_fn(move || Some(socket.read_message()))
}
