//! Message transport over a framed byte stream.
//!
//! A connection is split into a read half and a write half, each behind its
//! own lock. The owning session is the only reader; writes may come from the
//! owning session or from an opponent's session relaying game traffic, so the
//! write lock keeps frames from interleaving.

use crate::{read_message, write_message, FrameError, Message, MessageType};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Send/receive interface every connection exposes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, kind: MessageType, payload: &str) -> Result<(), FrameError>;

    async fn receive(&self) -> Result<Message, FrameError>;
}

pub type SharedTransport = Arc<dyn Transport>;

pub struct FramedTransport<R, W> {
    reader: Mutex<R>,
    writer: Mutex<W>,
}

impl<R, W> FramedTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        }
    }
}

impl FramedTransport<tokio::net::tcp::OwnedReadHalf, tokio::net::tcp::OwnedWriteHalf> {
    pub fn from_tcp(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self::new(reader, writer)
    }
}

#[cfg(unix)]
impl FramedTransport<tokio::net::unix::OwnedReadHalf, tokio::net::unix::OwnedWriteHalf> {
    pub fn from_unix(stream: tokio::net::UnixStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self::new(reader, writer)
    }
}

#[async_trait]
impl<R, W> Transport for FramedTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, kind: MessageType, payload: &str) -> Result<(), FrameError> {
        let mut writer = self.writer.lock().await;
        write_message(&mut *writer, kind, payload).await
    }

    async fn receive(&self) -> Result<Message, FrameError> {
        let mut reader = self.reader.lock().await;
        read_message(&mut *reader).await
    }
}
