//! # Word Duel Client Library
//!
//! Interactive terminal client for the word duel server. Lines typed at the
//! prompt are parsed into protocol requests by the `input` module; the
//! `network` module connects over TCP or a local domain socket, forwards
//! requests, prints every server notice, and answers game start and game
//! end notices with the acknowledgments the server expects.

pub mod input;
pub mod network;
