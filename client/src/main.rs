use clap::{Parser, ValueEnum};
use client::network::{Client, Endpoint};
use log::info;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ConnectionType {
    Tcp,
    Unix,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Connection type
    #[arg(short = 't', long = "type", value_enum)]
    connection_type: ConnectionType,

    /// Host for a TCP connection
    #[arg(short = 'H', long, default_value = "localhost")]
    host: String,

    /// Port for a TCP connection
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Path of the server's domain socket
    #[arg(short, long, default_value = "/tmp/word-duel.sock")]
    socket_addr: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let endpoint = match args.connection_type {
        ConnectionType::Tcp => Endpoint::Tcp {
            host: args.host,
            port: args.port,
        },
        ConnectionType::Unix => Endpoint::Unix(args.socket_addr),
    };

    info!("Connecting to {:?}", endpoint);
    let client = Client::connect(&endpoint).await?;
    client.run().await?;

    Ok(())
}
