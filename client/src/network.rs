use crate::input::parse_request;
use log::{debug, error, info};
use shared::{FramedTransport, Message, MessageType, SharedTransport};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpStream, UnixStream};

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Unix(PathBuf),
}

/// Reply the client sends automatically after certain server notices.
pub fn acknowledgment(kind: MessageType) -> Option<Message> {
    match kind {
        MessageType::GameStarted => Some(Message::new(
            MessageType::GameStarted,
            "starting a new game",
        )),
        MessageType::GameTerminated | MessageType::GiveUp => Some(Message::new(
            MessageType::GameTerminated,
            "game over confirmed",
        )),
        _ => None,
    }
}

pub struct Client {
    transport: SharedTransport,
}

impl Client {
    pub async fn connect(endpoint: &Endpoint) -> Result<Self, Box<dyn std::error::Error>> {
        let transport: SharedTransport = match endpoint {
            Endpoint::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port)).await?;
                info!("Connected to {}:{}", host, port);
                Arc::new(FramedTransport::from_tcp(stream))
            }
            Endpoint::Unix(path) => {
                let stream = UnixStream::connect(path).await?;
                info!("Connected to {}", path.display());
                Arc::new(FramedTransport::from_unix(stream))
            }
        };

        Ok(Self::from_transport(transport))
    }

    pub fn from_transport(transport: SharedTransport) -> Self {
        Self { transport }
    }

    /// Prints a server notice and sends the matching acknowledgment.
    /// Returns false once the server has ended the connection.
    pub async fn handle_message(
        &self,
        message: &Message,
    ) -> Result<bool, Box<dyn std::error::Error>> {
        match message.kind {
            MessageType::Disconnect => {
                if !message.payload.is_empty() {
                    println!("{}", message.payload);
                }
                println!("Server terminated the connection");
                return Ok(false);
            }
            MessageType::Message
            | MessageType::Invalid
            | MessageType::GameStarted
            | MessageType::GameTerminated
            | MessageType::GiveUp => println!("{}", message.payload),
            other => {
                debug!("Ignoring {:?} from server", other);
                println!("Received invalid message type from server");
            }
        }

        if let Some(ack) = acknowledgment(message.kind) {
            self.transport.send(ack.kind, &ack.payload).await?;
        }
        Ok(true)
    }

    /// Reads commands from stdin and prints server notices until the server
    /// disconnects.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let outgoing = Arc::clone(&self.transport);
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match parse_request(&line) {
                        Some(request) => {
                            if let Err(e) = outgoing.send(request.kind, &request.payload).await {
                                error!("Failed to send request: {}", e);
                                break;
                            }
                        }
                        None => println!("Invalid request"),
                    },
                    Ok(None) => break,
                    Err(e) => {
                        error!("Error reading from standard input: {}", e);
                        break;
                    }
                }
            }
        });

        loop {
            let message = self.transport.receive().await?;
            if !self.handle_message(&message).await? {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Transport;
    use tokio::io::{duplex, split};

    fn pair() -> (Client, SharedTransport) {
        let (near, far) = duplex(4096);
        let (near_read, near_write) = split(near);
        let (far_read, far_write) = split(far);
        (
            Client::from_transport(Arc::new(FramedTransport::new(near_read, near_write))),
            Arc::new(FramedTransport::new(far_read, far_write)),
        )
    }

    /// Tests which notices get an automatic acknowledgment
    #[test]
    fn test_acknowledgments() {
        assert_eq!(
            acknowledgment(MessageType::GameStarted).map(|m| m.kind),
            Some(MessageType::GameStarted)
        );
        assert_eq!(
            acknowledgment(MessageType::GiveUp).map(|m| m.kind),
            Some(MessageType::GameTerminated)
        );
        assert_eq!(
            acknowledgment(MessageType::GameTerminated).map(|m| m.kind),
            Some(MessageType::GameTerminated)
        );
        assert!(acknowledgment(MessageType::Message).is_none());
    }

    /// Tests that a game start notice is acknowledged to the server
    #[tokio::test]
    async fn test_game_started_is_acknowledged() {
        let (client, server) = pair();

        let keep_going = client
            .handle_message(&Message::new(MessageType::GameStarted, "go"))
            .await
            .unwrap();
        assert!(keep_going);

        let ack = server.receive().await.unwrap();
        assert_eq!(ack.kind, MessageType::GameStarted);
    }

    /// Tests that a disconnect from the server stops the client
    #[tokio::test]
    async fn test_disconnect_stops_client() {
        let (client, _server) = pair();

        let keep_going = client
            .handle_message(&Message::new(MessageType::Disconnect, "bye"))
            .await
            .unwrap();
        assert!(!keep_going);
    }
}
