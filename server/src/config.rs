use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/word-duel.sock";

/// Startup parameters of the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Shared password every player must present.
    pub password: String,
    pub host: String,
    pub port: u16,
    /// Path of the local domain socket; removed on shutdown.
    pub socket_path: PathBuf,
}

impl ServerConfig {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
        }
    }

    pub fn tcp_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
