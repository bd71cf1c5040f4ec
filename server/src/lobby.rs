//! Shared matchmaking state behind a narrow async interface.
//!
//! The lobby owns the player registry and the game registry, each behind its
//! own `RwLock`. Operations that touch both always take the game lock first
//! and the player lock second. Starting a game claims both players and
//! stores the game under both write locks, so two initiators racing for the
//! same opponent cannot both win; the loser sees the opponent as busy.
//!
//! Locks are never held while writing to a connection: operations hand back
//! cloned transports and callers send after the guards are dropped.

use crate::game::{Game, GameRegistry};
use crate::player::{generate_id, GameId, Player, PlayerId, PlayerState};
use crate::registry::{MatchError, PlayerRegistry};
use shared::SharedTransport;
use tokio::sync::RwLock;

/// A game that was just created, with both participants' transports.
pub struct StartedGame {
    pub game: Game,
    pub setter: SharedTransport,
    pub guesser: SharedTransport,
}

/// A game that was just removed. Transports are present for participants
/// that were still registered at removal time.
pub struct EndedGame {
    pub game: Game,
    pub setter: Option<SharedTransport>,
    pub guesser: Option<SharedTransport>,
}

/// How a player left the lobby. A player seated at a game ends it on the
/// way out.
pub enum Departure {
    Idle,
    Setter(EndedGame),
    Guesser(EndedGame),
}

/// The game a player is seated at and a handle to the other participant.
pub struct ActiveGame {
    pub game: Game,
    pub opponent: Option<SharedTransport>,
}

/// Consistent snapshot of where a registered player currently stands.
pub enum Seat {
    Idle,
    Setter(ActiveGame),
    Guesser(ActiveGame),
}

#[derive(Default)]
pub struct Lobby {
    players: RwLock<PlayerRegistry>,
    games: RwLock<GameRegistry>,
}

impl Lobby {
    pub fn new() -> Self {
        Self {
            players: RwLock::new(PlayerRegistry::new()),
            games: RwLock::new(GameRegistry::new()),
        }
    }

    /// Registers an authenticated connection under a fresh identifier.
    pub async fn register(&self, transport: SharedTransport) -> PlayerId {
        let mut players = self.players.write().await;
        loop {
            let id = generate_id();
            if players.register(Player::new(id.clone(), transport.clone())) {
                return id;
            }
        }
    }

    pub async fn deregister(&self, id: &str) -> bool {
        self.players.write().await.deregister(id).is_some()
    }

    /// Identifiers of every free player except `excluding`.
    pub async fn list_free(&self, excluding: &str) -> Vec<PlayerId> {
        self.players
            .read()
            .await
            .list_free(excluding)
            .into_iter()
            .map(|player| player.id.clone())
            .collect()
    }

    pub async fn lookup_free(&self, id: &str, excluding: &str) -> Option<SharedTransport> {
        self.players
            .read()
            .await
            .lookup_free(id, excluding)
            .map(|player| player.transport.clone())
    }

    /// Claims `guesser` for a new game set by `setter`, if both are free.
    pub async fn start_game(
        &self,
        setter: &str,
        guesser: &str,
        secret_word: &str,
    ) -> Result<StartedGame, MatchError> {
        let mut games = self.games.write().await;
        let mut game_id: GameId = generate_id();
        while games.contains(&game_id) {
            game_id = generate_id();
        }

        let mut players = self.players.write().await;
        let (setter_transport, guesser_transport) =
            players.claim_pair(setter, guesser, &game_id)?;

        let game = Game::new(
            game_id,
            setter.to_string(),
            guesser.to_string(),
            secret_word.to_string(),
        );
        games.insert(game.clone());

        Ok(StartedGame {
            game,
            setter: setter_transport,
            guesser: guesser_transport,
        })
    }

    /// Removes the game and returns its still-registered participants to the
    /// lobby. Only the first caller for a given game gets `Some`.
    pub async fn end_game(&self, game_id: &str) -> Option<EndedGame> {
        let mut games = self.games.write().await;
        let game = games.remove(game_id)?;

        let mut players = self.players.write().await;
        let setter = players.release(&game.setter, game_id);
        let guesser = players.release(&game.guesser, game_id);

        Some(EndedGame {
            game,
            setter,
            guesser,
        })
    }

    /// Deregisters `id` and ends the game named in its state under the same
    /// locks, so the player cannot be claimed between the two steps. Returns
    /// `None` if the player was not registered.
    pub async fn leave(&self, id: &str) -> Option<Departure> {
        let mut games = self.games.write().await;
        let mut players = self.players.write().await;
        let player = players.deregister(id)?;

        let (game_id, as_setter) = match &player.state {
            PlayerState::Playing(game_id) => (game_id, true),
            PlayerState::Guessing(game_id) => (game_id, false),
            _ => return Some(Departure::Idle),
        };
        let Some(game) = games.remove(game_id) else {
            return Some(Departure::Idle);
        };

        let setter = players.release(&game.setter, game_id);
        let guesser = players.release(&game.guesser, game_id);
        let ended = EndedGame {
            game,
            setter,
            guesser,
        };

        Some(if as_setter {
            Departure::Setter(ended)
        } else {
            Departure::Guesser(ended)
        })
    }

    pub async fn seat(&self, id: &str) -> Option<Seat> {
        let games = self.games.read().await;
        let players = self.players.read().await;
        let player = players.get(id)?;

        let active = |game_id: &str| {
            let game = games.get(game_id)?.clone();
            let opponent = game
                .opponent_of(id)
                .and_then(|other| players.get(other))
                .map(|other| other.transport.clone());
            Some(ActiveGame { game, opponent })
        };

        let seat = match &player.state {
            PlayerState::Playing(game_id) => active(game_id.as_str()).map(Seat::Setter),
            PlayerState::Guessing(game_id) => active(game_id.as_str()).map(Seat::Guesser),
            _ => None,
        };
        Some(seat.unwrap_or(Seat::Idle))
    }

    pub async fn state_of(&self, id: &str) -> Option<PlayerState> {
        self.players
            .read()
            .await
            .get(id)
            .map(|player| player.state.clone())
    }

    pub async fn player_count(&self) -> usize {
        self.players.read().await.len()
    }

    pub async fn game_count(&self) -> usize {
        self.games.read().await.len()
    }

    pub async fn has_game(&self, game_id: &str) -> bool {
        self.games.read().await.contains(game_id)
    }
}
