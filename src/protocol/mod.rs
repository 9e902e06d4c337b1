//! Client-server wire protocol.
//!
//! This module defines how the client and a Permafrost server
//! exchange well-formed, self-delimited messages: the frame format,
//! the JSON envelope layered on each frame body, and the transport
//! session that carries them over one TCP connection.
//!
//! # Key Components
//!
//! - [`frame`]: encodes and decodes header-delimited frames over a
//!   byte stream.
//! - [`transport`]: [`Connection`], one blocking TCP session with
//!   send/receive/close.
//! - [`envelope`]: the request/response schema: [`Command`] typed
//!   per action, lowered into the fixed-key [`Request`] envelope,
//!   and [`Response`] with its ERROR payload shape.
//!
//! # Wire Format
//!
//! Each frame is a textual header block, a blank-line delimiter, and
//! a body of exactly the declared length:
//!
//! ```text
//! QUERY_LENGTH: <decimal byte count>\r\n\r\n<body bytes>
//! ```
//!
//! The body length is explicit, so payload bytes are never escaped
//! or scanned. Frame boundaries carry no alignment guarantees with
//! read chunks; the decoder buffers across reads and carries bytes
//! past the frame boundary into the next call.
//!
//! Bodies are JSON envelopes. Requests always serialize the same
//! five keys (`table`, `query`, `action`, `payload`, `auth`);
//! responses carry `action_type` and `payload`. Sessions
//! authenticate once via LOGIN immediately after connect, and every
//! later request repeats the issued token in `auth`.

pub mod envelope;
pub mod frame;
pub mod transport;

pub use envelope::{Action, Command, Credentials, EnvelopeError, ErrorPayload, Request, Response};
pub use frame::{FrameDecoder, FrameError};
pub use transport::{Connection, TransportError};
