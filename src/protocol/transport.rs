use std::io::{self, Write};
use std::net::{Shutdown, TcpStream};

use log::{debug, info};
use thiserror::Error;

use super::frame::{self, FrameDecoder, FrameError};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection not established, call connect() first")]
    ConnectionNotEstablished,
    #[error("connection already closed")]
    NotConnected,
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("Transport IO Error: {0}")]
    Io(#[from] io::Error),
}

/// One blocking TCP session with a Permafrost server.
///
/// The session owns its stream outright; there is no process-wide
/// instance. Requests on one session are strictly serialized, which
/// the `&mut self` receivers enforce at compile time. Independent
/// sessions against the same server share no state.
pub struct Connection {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
    decoder: FrameDecoder,
}

impl Connection {
    /// Create a session for the given endpoint without dialing it.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            stream: None,
            decoder: FrameDecoder::new(),
        }
    }

    /// Dial the server. Replaces any previous stream and discards
    /// buffered bytes from it.
    pub fn connect(&mut self) -> Result<(), TransportError> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))?;
        info!("connected to {}:{}", self.host, self.port);

        self.decoder = FrameDecoder::new();
        self.stream = Some(stream);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Frame and write a payload. `write_all` loops until every byte
    /// is delivered or the connection errors; a short write is never
    /// observed.
    pub fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream_mut()?;
        stream.write_all(&frame::encode(payload))?;
        stream.flush()?;
        debug!("sent frame of {} bytes", payload.len());
        Ok(())
    }

    /// Read one frame. `None` means the peer closed the stream
    /// between frames.
    pub fn receive(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or(TransportError::ConnectionNotEstablished)?;
        Ok(self.decoder.decode(stream)?)
    }

    /// Shut the session down. Not idempotent: closing an unconnected
    /// or already-closed session fails with
    /// [`TransportError::NotConnected`].
    pub fn close(&mut self) -> Result<(), TransportError> {
        match self.stream.take() {
            Some(stream) => {
                if let Err(e) = stream.shutdown(Shutdown::Both) {
                    debug!("shutdown after peer close: {e}");
                }
                self.decoder = FrameDecoder::new();
                info!("closed connection to {}:{}", self.host, self.port);
                Ok(())
            }
            None => Err(TransportError::NotConnected),
        }
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream, TransportError> {
        self.stream
            .as_mut()
            .ok_or(TransportError::ConnectionNotEstablished)
    }
}
