use rand::Rng;
use shared::SharedTransport;
use std::fmt;

pub type PlayerId = String;
pub type GameId = String;

/// Where a registered player stands.
///
/// Connections that have not authenticated yet, or are closing, are tracked
/// by their session and never reach the registry. The active game travels
/// inside the state, so a player has a current game exactly when it is
/// playing or guessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerState {
    Authenticated,
    /// Setter of the given game.
    Playing(GameId),
    /// Guesser of the given game.
    Guessing(GameId),
}

impl PlayerState {
    pub fn current_game(&self) -> Option<&GameId> {
        match self {
            PlayerState::Playing(game_id) | PlayerState::Guessing(game_id) => Some(game_id),
            _ => None,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, PlayerState::Authenticated)
    }
}

/// An authenticated participant as held by the registry.
pub struct Player {
    pub id: PlayerId,
    pub transport: SharedTransport,
    pub state: PlayerState,
}

impl Player {
    pub fn new(id: PlayerId, transport: SharedTransport) -> Self {
        Self {
            id,
            transport,
            state: PlayerState::Authenticated,
        }
    }

    /// Drops any game reference and returns to the lobby.
    pub fn restore_initial_state(&mut self) {
        self.state = PlayerState::Authenticated;
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Random opaque identifier: four random bytes, hex encoded.
pub fn generate_id() -> String {
    let bytes: [u8; 4] = rand::thread_rng().gen();
    hex::encode(bytes)
}
