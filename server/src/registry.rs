//! Matchmaking registry of authenticated players.
//!
//! The registry is a plain data structure; the lobby wraps it in a lock and
//! is responsible for making sequences of operations atomic.

use crate::player::{GameId, Player, PlayerId, PlayerState};
use log::info;
use shared::SharedTransport;
use std::collections::HashMap;
use thiserror::Error;

/// Reasons a game cannot be started. The display text is sent to the
/// initiator as an invalid-request notice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("You cannot play against yourself")]
    SelfTarget,

    #[error("Opponent with ID {0} is not free or does not exist")]
    Unavailable(PlayerId),

    #[error("You are already in a game")]
    Busy,
}

/// Authenticated players indexed by identifier.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<PlayerId, Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
        }
    }

    /// Inserts a player. Returns false, leaving the registry untouched, if the
    /// identifier is already taken.
    pub fn register(&mut self, player: Player) -> bool {
        if self.players.contains_key(&player.id) {
            return false;
        }

        info!("Player {} registered", player.id);
        self.players.insert(player.id.clone(), player);
        true
    }

    pub fn deregister(&mut self, id: &str) -> Option<Player> {
        let removed = self.players.remove(id);
        if removed.is_some() {
            info!("Player {} deregistered", id);
        }
        removed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.players.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    /// All players without an active game except `excluding`, ordered by id.
    pub fn list_free(&self, excluding: &str) -> Vec<&Player> {
        let mut free: Vec<&Player> = self
            .players
            .values()
            .filter(|player| player.state.is_free() && player.id != excluding)
            .collect();
        free.sort_by(|a, b| a.id.cmp(&b.id));
        free
    }

    pub fn lookup_free(&self, id: &str, excluding: &str) -> Option<&Player> {
        if id == excluding {
            return None;
        }
        self.players.get(id).filter(|player| player.state.is_free())
    }

    /// Moves `setter` to `Playing` and `guesser` to `Guessing` in one step,
    /// provided both are registered and free. Nothing changes on failure.
    pub fn claim_pair(
        &mut self,
        setter: &str,
        guesser: &str,
        game_id: &GameId,
    ) -> Result<(SharedTransport, SharedTransport), MatchError> {
        if setter == guesser {
            return Err(MatchError::SelfTarget);
        }

        match self.players.get(setter) {
            Some(player) if player.state.is_free() => {}
            _ => return Err(MatchError::Busy),
        }
        if self.lookup_free(guesser, setter).is_none() {
            return Err(MatchError::Unavailable(guesser.to_string()));
        }

        let setter_transport = self.assign(setter, PlayerState::Playing(game_id.clone()));
        let guesser_transport = self.assign(guesser, PlayerState::Guessing(game_id.clone()));
        match (setter_transport, guesser_transport) {
            (Some(s), Some(g)) => Ok((s, g)),
            _ => Err(MatchError::Unavailable(guesser.to_string())),
        }
    }

    /// Returns `id` to the lobby if its current game is `game_id`, handing
    /// back its transport so the caller can notify it.
    pub fn release(&mut self, id: &str, game_id: &str) -> Option<SharedTransport> {
        let player = self.players.get_mut(id)?;
        if player.state.current_game().map(String::as_str) != Some(game_id) {
            return None;
        }

        player.restore_initial_state();
        Some(player.transport.clone())
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    fn assign(&mut self, id: &str, state: PlayerState) -> Option<SharedTransport> {
        let player = self.players.get_mut(id)?;
        player.state = state;
        Some(player.transport.clone())
    }
}
