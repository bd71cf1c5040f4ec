//! Connection coordinator: accepts players over TCP and a local domain socket

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::lobby::Lobby;
use crate::session::Session;
use log::{debug, error, info, warn};
use shared::{FramedTransport, SharedTransport};
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::{TcpListener, UnixListener};

/// Both listeners plus the lobby every accepted session shares.
pub struct Server {
    lobby: Arc<Lobby>,
    password: Arc<str>,
    socket_path: PathBuf,
    tcp: TcpListener,
    unix: UnixListener,
}

impl Server {
    /// Binds the TCP listener and the domain socket. Either failing is fatal
    /// to startup.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let address = config.tcp_address();
        let tcp = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                endpoint: address.clone(),
                source,
            })?;
        info!("TCP server listening on {}", tcp.local_addr()?);

        let unix = UnixListener::bind(&config.socket_path).map_err(|source| ServerError::Bind {
            endpoint: config.socket_path.display().to_string(),
            source,
        })?;
        info!(
            "Unix socket server listening on {}",
            config.socket_path.display()
        );

        Ok(Server {
            lobby: Arc::new(Lobby::new()),
            password: Arc::from(config.password),
            socket_path: config.socket_path,
            tcp,
            unix,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.tcp.local_addr()
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn lobby(&self) -> Arc<Lobby> {
        Arc::clone(&self.lobby)
    }

    /// Accepts on both listeners until both have failed. Sessions run as
    /// independent tasks and are not drained when this returns.
    pub async fn run(self) -> Result<(), ServerError> {
        let tcp_task = tokio::spawn(accept_tcp(
            self.tcp,
            Arc::clone(&self.lobby),
            Arc::clone(&self.password),
        ));
        let unix_task = tokio::spawn(accept_unix(
            self.unix,
            Arc::clone(&self.lobby),
            Arc::clone(&self.password),
        ));

        let (tcp_result, unix_result) = tokio::join!(tcp_task, unix_task);
        for result in [tcp_result, unix_result] {
            if let Err(e) = result {
                error!("Listener task panicked: {}", e);
            }
        }

        info!("All listeners stopped");
        Ok(())
    }
}

async fn accept_tcp(listener: TcpListener, lobby: Arc<Lobby>, password: Arc<str>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("Accepted TCP connection from {}", addr);
                spawn_session(Arc::new(FramedTransport::from_tcp(stream)), &lobby, &password);
            }
            Err(e) => {
                error!("Error accepting TCP connection: {}", e);
                break;
            }
        }
    }
}

async fn accept_unix(listener: UnixListener, lobby: Arc<Lobby>, password: Arc<str>) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                info!("Accepted Unix socket connection");
                spawn_session(Arc::new(FramedTransport::from_unix(stream)), &lobby, &password);
            }
            Err(e) => {
                error!("Error accepting Unix socket connection: {}", e);
                break;
            }
        }
    }
}

fn spawn_session(transport: SharedTransport, lobby: &Arc<Lobby>, password: &str) {
    let session = Session::new(Arc::clone(lobby), transport, password);
    tokio::spawn(session.run());
}

/// Removes the domain-socket file left behind by a bound listener.
pub fn remove_socket_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed socket file {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove socket file {}: {}", path.display(), e),
    }
}
