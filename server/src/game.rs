use crate::player::{GameId, PlayerId};
use log::info;
use std::collections::HashMap;

/// A setter and a guesser paired around one secret word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub id: GameId,
    pub setter: PlayerId,
    pub guesser: PlayerId,
    secret_word: String,
}

impl Game {
    pub fn new(id: GameId, setter: PlayerId, guesser: PlayerId, secret_word: String) -> Self {
        Self {
            id,
            setter,
            guesser,
            secret_word,
        }
    }

    pub fn secret_word(&self) -> &str {
        &self.secret_word
    }

    /// Case-insensitive comparison against the secret word.
    pub fn is_correct(&self, guess: &str) -> bool {
        guess.to_lowercase() == self.secret_word.to_lowercase()
    }

    pub fn opponent_of(&self, player: &str) -> Option<&PlayerId> {
        if player == self.setter {
            Some(&self.guesser)
        } else if player == self.guesser {
            Some(&self.setter)
        } else {
            None
        }
    }
}

/// Running games indexed by identifier.
#[derive(Debug, Default)]
pub struct GameRegistry {
    games: HashMap<GameId, Game>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self {
            games: HashMap::new(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.games.contains_key(id)
    }

    pub fn insert(&mut self, game: Game) {
        info!(
            "Game {} started: {} sets, {} guesses",
            game.id, game.setter, game.guesser
        );
        self.games.insert(game.id.clone(), game);
    }

    pub fn get(&self, id: &str) -> Option<&Game> {
        self.games.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Game> {
        let removed = self.games.remove(id);
        if removed.is_some() {
            info!("Game {} terminated", id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}
