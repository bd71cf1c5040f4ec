use clap::Parser;
use log::info;
use server::config::{ServerConfig, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SOCKET_PATH};
use server::network::{remove_socket_file, Server};
use std::path::PathBuf;
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Shared password players must send to join
    #[arg(long, alias = "pswd")]
    password: String,

    /// Host for the TCP listener
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port for the TCP listener
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Path of the local domain socket
    #[arg(short, long, default_value = DEFAULT_SOCKET_PATH)]
    socket_addr: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    if args.password.is_empty() {
        return Err("the server password must not be empty".into());
    }

    let config = ServerConfig {
        password: args.password,
        host: args.host,
        port: args.port,
        socket_path: args.socket_addr,
    };
    let socket_path = config.socket_path.clone();

    let server = Server::bind(config).await?;
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::select! {
        result = server.run() => {
            remove_socket_file(&socket_path);
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            remove_socket_file(&socket_path);
        }
        _ = terminate.recv() => {
            info!("Received SIGTERM, shutting down");
            remove_socket_file(&socket_path);
        }
    }

    Ok(())
}
