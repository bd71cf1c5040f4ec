//! Wire protocol shared by the word duel server and client.
//!
//! Every message travels as one frame:
//!
//! ```text
//! [4-byte BE payload length][2-byte BE type code][payload bytes]
//! ```
//!
//! The payload is UTF-8 text whose meaning depends on the type code.

pub mod transport;

pub use transport::{FramedTransport, SharedTransport, Transport};

use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const HEADER_LEN: usize = 6;
pub const LENGTH_FIELD_LEN: usize = 4;
/// Largest payload a peer may declare before the frame is rejected.
pub const MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

/// Type code carried in every frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Disconnect,
    GetPlayers,
    InitGame,
    Invalid,
    Message,
    GiveUp,
    GameStarted,
    GameTerminated,
    /// A code outside the protocol vocabulary, kept so the receiver can reject it.
    Unknown(u16),
}

impl MessageType {
    pub fn code(self) -> u16 {
        match self {
            MessageType::Disconnect => 0,
            MessageType::GetPlayers => 1,
            MessageType::InitGame => 2,
            MessageType::Invalid => 3,
            MessageType::Message => 4,
            MessageType::GiveUp => 5,
            MessageType::GameStarted => 6,
            MessageType::GameTerminated => 7,
            MessageType::Unknown(code) => code,
        }
    }

    pub fn from_code(code: u16) -> Self {
        match code {
            0 => MessageType::Disconnect,
            1 => MessageType::GetPlayers,
            2 => MessageType::InitGame,
            3 => MessageType::Invalid,
            4 => MessageType::Message,
            5 => MessageType::GiveUp,
            6 => MessageType::GameStarted,
            7 => MessageType::GameTerminated,
            other => MessageType::Unknown(other),
        }
    }
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageType,
    pub payload: String,
}

impl Message {
    pub fn new(kind: MessageType, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("payload of {0} bytes exceeds the frame limit")]
    TooLarge(usize),
}

impl FrameError {
    /// True when the peer closed the stream, cleanly or mid-frame.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, FrameError::Io(e) if matches!(
            e.kind(),
            io::ErrorKind::UnexpectedEof
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
        ))
    }
}

/// Encodes a single frame: header followed by the payload bytes.
pub fn encode(kind: MessageType, payload: &str) -> Result<Vec<u8>, FrameError> {
    let data = payload.as_bytes();
    let len = u32::try_from(data.len()).map_err(|_| FrameError::TooLarge(data.len()))?;

    let mut frame = Vec::with_capacity(HEADER_LEN + data.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&kind.code().to_be_bytes());
    frame.extend_from_slice(data);
    Ok(frame)
}

/// Splits a header into the declared payload length and the message type.
pub fn parse_header(header: &[u8; HEADER_LEN]) -> (usize, MessageType) {
    let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let code = u16::from_be_bytes([header[LENGTH_FIELD_LEN], header[LENGTH_FIELD_LEN + 1]]);
    (len, MessageType::from_code(code))
}

/// Reads exactly one frame from the stream.
///
/// A stream that closes before the declared number of bytes arrives yields
/// an `UnexpectedEof` I/O error, which callers treat as a dead connection.
pub async fn read_message<R>(reader: &mut R) -> Result<Message, FrameError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await?;

    let (len, kind) = parse_header(&header);
    if len > MAX_PAYLOAD_LEN {
        return Err(FrameError::TooLarge(len));
    }

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).await?;

    Ok(Message {
        kind,
        payload: String::from_utf8_lossy(&data).into_owned(),
    })
}

/// Writes one frame as a single buffer and flushes it.
pub async fn write_message<W>(
    writer: &mut W,
    kind: MessageType,
    payload: &str,
) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let frame = encode(kind, payload)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
