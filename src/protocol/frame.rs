use std::io::{self, Read};

use thiserror::Error;

/// Separates the textual header block from the frame body.
pub const HEADER_DELIMITER: &[u8] = b"\r\n\r\n";
/// Header line carrying the body length in decimal.
pub const LENGTH_HEADER: &str = "QUERY_LENGTH";

const READ_CHUNK_SIZE: usize = 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("stream closed before the header delimiter was received")]
    IncompleteHeader,
    #[error("QUERY_LENGTH header missing")]
    MissingLength,
    #[error("invalid QUERY_LENGTH value '{0}'")]
    InvalidLength(String),
    #[error("frame body truncated: expected {expected} bytes, received {received}")]
    TruncatedBody { expected: usize, received: usize },
    #[error("Frame IO Error: {0}")]
    Io(#[from] io::Error),
}

/// Encode a payload as a self-delimited frame.
///
/// The declared length makes escaping unnecessary; payload bytes are
/// written verbatim and never scanned for the delimiter.
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let header = format!("{LENGTH_HEADER}: {}\r\n\r\n", payload.len());
    let mut frame = Vec::with_capacity(header.len() + payload.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Streaming decoder for length-prefixed frames.
///
/// Bytes read past the current frame boundary are retained and seed
/// the next [`decode`](FrameDecoder::decode) call, so back-to-back
/// frames arriving in a single chunk are not lost.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    residual: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one frame from `source`, blocking until the body is
    /// complete.
    ///
    /// Returns `Ok(None)` when the peer closes the stream before any
    /// byte of a new frame arrives. A close at any later point is an
    /// error: [`FrameError::IncompleteHeader`] inside the header,
    /// [`FrameError::TruncatedBody`] inside the body.
    pub fn decode<R: Read>(&mut self, source: &mut R) -> Result<Option<Vec<u8>>, FrameError> {
        let mut buffer = std::mem::take(&mut self.residual);

        let header_end = loop {
            if let Some(pos) = find_delimiter(&buffer) {
                break pos;
            }
            if !read_chunk(source, &mut buffer)? {
                if buffer.is_empty() {
                    return Ok(None);
                }
                return Err(FrameError::IncompleteHeader);
            }
        };

        let header = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
        let mut body = buffer.split_off(header_end + HEADER_DELIMITER.len());
        let expected = parse_length(&header)?;

        while body.len() < expected {
            if !read_chunk(source, &mut body)? {
                return Err(FrameError::TruncatedBody {
                    expected,
                    received: body.len(),
                });
            }
        }

        self.residual = body.split_off(expected);
        log::debug!(
            "decoded frame of {expected} bytes ({} residual)",
            self.residual.len()
        );
        Ok(Some(body))
    }
}

/// Read one chunk into `buffer`; false means the source is closed.
fn read_chunk<R: Read>(source: &mut R, buffer: &mut Vec<u8>) -> Result<bool, FrameError> {
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    loop {
        match source.read(&mut chunk) {
            Ok(0) => return Ok(false),
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                return Ok(true);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

fn find_delimiter(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(HEADER_DELIMITER.len())
        .position(|w| w == HEADER_DELIMITER)
}

/// Extract the declared body length from the first matching header line.
fn parse_length(header: &str) -> Result<usize, FrameError> {
    let line = header
        .lines()
        .find(|line| line.starts_with(LENGTH_HEADER))
        .ok_or(FrameError::MissingLength)?;

    let value = line
        .split(':')
        .nth(1)
        .ok_or_else(|| FrameError::InvalidLength(line.to_string()))?;

    value
        .trim()
        .parse::<usize>()
        .map_err(|_| FrameError::InvalidLength(value.trim().to_string()))
}
