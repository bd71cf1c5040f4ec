//! # Word Duel Server Library
//!
//! Matchmaking and gameplay server for a two-player word-guessing game. One
//! player (the setter) picks a secret word, the other (the guesser) submits
//! guesses until the word is found, the guesser gives up, or someone leaves.
//!
//! ## Architecture
//!
//! ### One Task Per Connection
//! Every accepted connection gets its own [`session::Session`] running on a
//! dedicated tokio task. A session blocks on a single receive at a time and
//! advances its state machine once per message.
//!
//! ### Shared Lobby
//! Players and games live in two registries owned by [`lobby::Lobby`], each
//! behind its own `RwLock`. Sessions never touch the registries directly:
//! starting a game claims both players atomically, and ending a game reverts
//! both players and removes the game in one step, exactly once. A player
//! leaving takes its game down with it under the same locks.
//!
//! ### Two Transports
//! The coordinator in [`network`] listens on TCP and on a local domain socket
//! at the same time. Both speak the same framed protocol from the `shared`
//! crate.
//!
//! ## Module Organization
//!
//! - `player`: identifiers, player state, id generation
//! - `registry`: the matchmaking registry of authenticated players
//! - `game`: games and the game registry
//! - `lobby`: lock-guarded facade over both registries
//! - `session`: the per-connection state machine
//! - `network`: listeners and session spawning
//! - `config`, `error`: startup parameters and error types
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::new("secret")).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod game;
pub mod lobby;
pub mod network;
pub mod player;
pub mod registry;
pub mod session;
