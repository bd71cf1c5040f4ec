//! Translation of typed command lines into protocol requests

use shared::{Message, MessageType};

pub const REQ_DISCONNECT: &str = "exit";
pub const REQ_GET_PLAYERS: &str = "list_players";
pub const REQ_INIT_GAME: &str = "start_game";
pub const REQ_GIVE_UP: &str = "give_up";

/// Parses one line typed at the prompt.
///
/// Returns `None` for lines that should not be sent: empty input and
/// `start_game` without exactly an opponent id and a secret word. Any line
/// that is not a command is sent verbatim as a plain message; that covers
/// the password, hints and guesses.
pub fn parse_request(line: &str) -> Option<Message> {
    let line = line.trim_end_matches(['\r', '\n']);
    let parts: Vec<&str> = line.split_whitespace().collect();
    let command = parts.first()?;

    let request = match *command {
        REQ_DISCONNECT => Message::new(MessageType::Disconnect, ""),
        REQ_GET_PLAYERS => Message::new(MessageType::GetPlayers, ""),
        REQ_INIT_GAME => match parts.as_slice() {
            [_, opponent, secret_word] => {
                Message::new(MessageType::InitGame, format!("{opponent} {secret_word}"))
            }
            _ => return None,
        },
        REQ_GIVE_UP => Message::new(MessageType::GiveUp, ""),
        _ => Message::new(MessageType::Message, line),
    };

    Some(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(line: &str) -> Option<MessageType> {
        parse_request(line).map(|message| message.kind)
    }

    /// Tests the argument-free commands
    #[test]
    fn test_commands() {
        assert_eq!(kind_of("exit\n"), Some(MessageType::Disconnect));
        assert_eq!(kind_of("list_players"), Some(MessageType::GetPlayers));
        assert_eq!(kind_of("give_up\r\n"), Some(MessageType::GiveUp));
    }

    /// Tests start_game argument validation
    #[test]
    fn test_start_game_requires_two_arguments() {
        let request = parse_request("start_game 1a2b3c4d banana\n").unwrap();
        assert_eq!(request.kind, MessageType::InitGame);
        assert_eq!(request.payload, "1a2b3c4d banana");

        assert!(parse_request("start_game").is_none());
        assert!(parse_request("start_game 1a2b3c4d").is_none());
        assert!(parse_request("start_game 1a2b3c4d banana split").is_none());
    }

    /// Tests that free text is sent as a plain message
    #[test]
    fn test_free_text_is_a_message() {
        let request = parse_request("is it a fruit?\n").unwrap();
        assert_eq!(request.kind, MessageType::Message);
        assert_eq!(request.payload, "is it a fruit?");
    }

    /// Tests that blank lines are not sent
    #[test]
    fn test_empty_line_is_ignored() {
        assert!(parse_request("\n").is_none());
        assert!(parse_request("").is_none());
        assert!(parse_request("   ").is_none());
    }
}
