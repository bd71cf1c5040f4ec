//! Per-connection state machine.
//!
//! ```text
//! Connected -> Registered -> Closed
//!      \                       ^
//!       `----------------------'
//! ```
//!
//! Each session owns the read side of its connection and blocks on exactly
//! one receive per step. While registered, the player's role (idle, setter
//! or guesser) lives in the lobby, because an opponent's session can move
//! this player into or out of a game at any time. The seat is looked up
//! after each message arrives and the message is handled in that seat.

use crate::lobby::{ActiveGame, Departure, Lobby, Seat};
use crate::player::PlayerId;
use log::{debug, info, warn};
use shared::{Message, MessageType, SharedTransport};
use std::ops::ControlFlow;
use std::sync::Arc;

const PASSWORD_PROMPT: &str = "Enter secret Password!";
const WRONG_PASSWORD: &str = "Password is incorrect... you will be disconnected.";
const INVALID_REQUEST: &str = "Invalid request";
const SETTER_ONLY: &str =
    "You are setting a word. Send hints to your opponent or wait for their guesses";
const GUESSER_ONLY: &str = "You are guessing. Send a guess or give up";

/// Where the connection stands from this session's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Connected,
    Registered(PlayerId),
    Closed,
}

pub struct Session {
    lobby: Arc<Lobby>,
    transport: SharedTransport,
    password: String,
}

impl Session {
    pub fn new(lobby: Arc<Lobby>, transport: SharedTransport, password: impl Into<String>) -> Self {
        Self {
            lobby,
            transport,
            password: password.into(),
        }
    }

    /// Drives the connection until it is closed.
    pub async fn run(self) {
        let mut phase = Phase::Connected;

        loop {
            phase = match phase {
                Phase::Connected => self.authenticate().await,
                Phase::Registered(id) => match self.serve(&id).await {
                    ControlFlow::Continue(()) => Phase::Registered(id),
                    ControlFlow::Break(()) => {
                        debug!("Closing connection of player {}", id);
                        Phase::Closed
                    }
                },
                Phase::Closed => break,
            };
        }
    }

    async fn authenticate(&self) -> Phase {
        if let Err(e) = self.transport.send(MessageType::Message, PASSWORD_PROMPT).await {
            debug!("Failed to prompt for password: {}", e);
            return Phase::Closed;
        }

        let message = match self.transport.receive().await {
            Ok(message) => message,
            Err(e) => {
                debug!("Connection lost before authentication: {}", e);
                return Phase::Closed;
            }
        };

        if message.payload != self.password {
            warn!("Rejected connection with incorrect password");
            self.reply(MessageType::Disconnect, WRONG_PASSWORD).await;
            return Phase::Closed;
        }

        let id = self.lobby.register(Arc::clone(&self.transport)).await;
        info!("Player {} authenticated", id);
        self.reply(
            MessageType::Message,
            &format!(
                "Correct password! Your ID is: {id}\n\
                 Now, you can pick an opponent or just wait until someone picks you..."
            ),
        )
        .await;

        Phase::Registered(id)
    }

    /// Receives one message and handles it according to the player's seat.
    async fn serve(&self, id: &str) -> ControlFlow<()> {
        let message = match self.transport.receive().await {
            Ok(message) => message,
            Err(e) => {
                info!("Player {} disconnected: {}", id, e);
                return self.leave(id).await;
            }
        };

        match self.lobby.seat(id).await {
            Some(Seat::Idle) => self.handle_lobby_request(id, message).await,
            Some(Seat::Setter(active)) => self.handle_setter_message(id, active, message).await,
            Some(Seat::Guesser(active)) => self.handle_guess(id, active, message).await,
            None => ControlFlow::Break(()),
        }
    }

    async fn handle_lobby_request(&self, id: &str, message: Message) -> ControlFlow<()> {
        match message.kind {
            MessageType::Disconnect => {
                self.reply(MessageType::Disconnect, "").await;
                return self.leave(id).await;
            }
            MessageType::GetPlayers => {
                let mut listing = String::from("You can play against these users:\n");
                for other in self.lobby.list_free(id).await {
                    listing.push_str(&other);
                    listing.push('\n');
                }
                self.reply(MessageType::Message, &listing).await;
            }
            MessageType::InitGame => self.start_game(id, &message.payload).await,
            MessageType::GameStarted | MessageType::GameTerminated => {}
            MessageType::Invalid
            | MessageType::Message
            | MessageType::GiveUp
            | MessageType::Unknown(_) => {
                self.reply(MessageType::Invalid, INVALID_REQUEST).await;
            }
        }

        ControlFlow::Continue(())
    }

    async fn start_game(&self, id: &str, request: &str) {
        let fields: Vec<&str> = request.split_whitespace().collect();
        let &[opponent, secret_word] = fields.as_slice() else {
            self.reply(MessageType::Invalid, INVALID_REQUEST).await;
            return;
        };

        match self.lobby.start_game(id, opponent, secret_word).await {
            Ok(started) => {
                notify(
                    Some(&started.guesser),
                    MessageType::GameStarted,
                    &format!(
                        "Player {id} has started a game against you. Now guess their word..."
                    ),
                )
                .await;
                self.reply(
                    MessageType::GameStarted,
                    &format!(
                        "You started a game against player {opponent}. \
                         You can send them hints if they struggle with your word"
                    ),
                )
                .await;
            }
            Err(e) => {
                debug!("Player {} could not start a game: {}", id, e);
                self.reply(MessageType::Invalid, &e.to_string()).await;
            }
        }
    }

    /// The setter's messages are hints relayed to the guesser. Game endings
    /// are driven by the guesser, so give-up and acknowledgments are ignored.
    async fn handle_setter_message(
        &self,
        id: &str,
        active: ActiveGame,
        message: Message,
    ) -> ControlFlow<()> {
        match message.kind {
            MessageType::Message => {
                notify(active.opponent.as_ref(), MessageType::Message, &message.payload).await;
            }
            MessageType::Disconnect => {
                self.reply(MessageType::Disconnect, "").await;
                return self.leave(id).await;
            }
            MessageType::GiveUp | MessageType::GameStarted | MessageType::GameTerminated => {}
            MessageType::GetPlayers
            | MessageType::InitGame
            | MessageType::Invalid
            | MessageType::Unknown(_) => {
                self.reply(MessageType::Invalid, SETTER_ONLY).await;
            }
        }

        ControlFlow::Continue(())
    }

    async fn handle_guess(
        &self,
        id: &str,
        active: ActiveGame,
        message: Message,
    ) -> ControlFlow<()> {
        match message.kind {
            MessageType::GiveUp => {
                if let Some(ended) = self.lobby.end_game(&active.game.id).await {
                    notify(
                        ended.setter.as_ref(),
                        MessageType::GiveUp,
                        "Opponent gave up. You can pick another game now",
                    )
                    .await;
                    self.reply(
                        MessageType::Message,
                        &format!(
                            "You gave up. The secret word was: {}. You can start another game now",
                            ended.game.secret_word()
                        ),
                    )
                    .await;
                }
            }
            MessageType::Message if active.game.is_correct(&message.payload) => {
                if let Some(ended) = self.lobby.end_game(&active.game.id).await {
                    info!("Player {} guessed the word in game {}", id, ended.game.id);
                    self.reply(
                        MessageType::Message,
                        "This is correct! You have won! Pick another game if you wish",
                    )
                    .await;
                    notify(
                        ended.setter.as_ref(),
                        MessageType::GameTerminated,
                        "Opponent guessed your word correctly! Pick another game if you wish",
                    )
                    .await;
                }
            }
            MessageType::Message => {
                self.reply(
                    MessageType::Message,
                    "This is not the secret word. Take another guess!",
                )
                .await;
                notify(
                    active.opponent.as_ref(),
                    MessageType::Message,
                    &format!("Opponent guessed incorrect word: {}", message.payload),
                )
                .await;
            }
            MessageType::Disconnect => {
                self.reply(MessageType::Disconnect, "").await;
                return self.leave(id).await;
            }
            MessageType::GameStarted | MessageType::GameTerminated => {}
            MessageType::GetPlayers
            | MessageType::InitGame
            | MessageType::Invalid
            | MessageType::Unknown(_) => {
                self.reply(MessageType::Invalid, GUESSER_ONLY).await;
            }
        }

        ControlFlow::Continue(())
    }

    /// Deregisters the player and ends whatever game it holds at that
    /// moment. The secret word is revealed to the guesser only when the
    /// setter is the one leaving.
    async fn leave(&self, id: &str) -> ControlFlow<()> {
        match self.lobby.leave(id).await {
            Some(Departure::Setter(ended)) => {
                notify(
                    ended.guesser.as_ref(),
                    MessageType::GameTerminated,
                    &format!(
                        "Game was terminated. Opponent disconnected from the server. \
                         Secret word was '{}'. Pick another game",
                        ended.game.secret_word()
                    ),
                )
                .await;
            }
            Some(Departure::Guesser(ended)) => {
                notify(
                    ended.setter.as_ref(),
                    MessageType::GameTerminated,
                    "Game was terminated. Opponent disconnected from the server. \
                     Pick another game",
                )
                .await;
            }
            Some(Departure::Idle) | None => {}
        }

        ControlFlow::Break(())
    }

    /// Best-effort write to this session's own connection. A failure here
    /// surfaces on the next receive.
    async fn reply(&self, kind: MessageType, payload: &str) {
        if let Err(e) = self.transport.send(kind, payload).await {
            debug!("Failed to reply with {:?}: {}", kind, e);
        }
    }
}

/// Best-effort write to another player's connection.
async fn notify(target: Option<&SharedTransport>, kind: MessageType, payload: &str) {
    let Some(target) = target else {
        return;
    };
    if let Err(e) = target.send(kind, payload).await {
        warn!("Failed to deliver {:?} to opponent: {}", kind, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerState;
    use async_trait::async_trait;
    use shared::{FrameError, Transport};
    use std::io;
    use std::time::Duration;
    use tokio::sync::{mpsc, Mutex, Notify, Semaphore};
    use tokio::time::timeout;

    const PASSWORD: &str = "secret";

    /// Holds back sends of one message type until the test opens it.
    struct SendGate {
        kind: MessageType,
        reached: Notify,
        open: Semaphore,
    }

    impl SendGate {
        fn new(kind: MessageType) -> Arc<Self> {
            Arc::new(Self {
                kind,
                reached: Notify::new(),
                open: Semaphore::new(0),
            })
        }
    }

    /// Channel-backed transport standing in for a socket.
    struct FakeTransport {
        inbox: Mutex<mpsc::UnboundedReceiver<Message>>,
        outbox: mpsc::UnboundedSender<Message>,
        gate: Option<Arc<SendGate>>,
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, kind: MessageType, payload: &str) -> Result<(), FrameError> {
            if let Some(gate) = self.gate.as_ref().filter(|gate| gate.kind == kind) {
                gate.reached.notify_one();
                let _permit = gate.open.acquire().await.unwrap();
            }
            self.outbox
                .send(Message::new(kind, payload))
                .map_err(|_| FrameError::Io(io::ErrorKind::BrokenPipe.into()))
        }

        async fn receive(&self) -> Result<Message, FrameError> {
            self.inbox
                .lock()
                .await
                .recv()
                .await
                .ok_or_else(|| FrameError::Io(io::ErrorKind::UnexpectedEof.into()))
        }
    }

    /// The client end of a fake connection.
    struct Peer {
        to_server: mpsc::UnboundedSender<Message>,
        from_server: mpsc::UnboundedReceiver<Message>,
    }

    impl Peer {
        fn send(&self, kind: MessageType, payload: &str) {
            self.to_server.send(Message::new(kind, payload)).unwrap();
        }

        async fn next(&mut self) -> Option<Message> {
            timeout(Duration::from_secs(2), self.from_server.recv())
                .await
                .expect("timed out waiting for the server")
        }

        async fn expect(&mut self, kind: MessageType) -> Message {
            let message = self.next().await.expect("connection closed");
            assert_eq!(message.kind, kind, "unexpected message: {:?}", message);
            message
        }
    }

    fn connect(lobby: &Arc<Lobby>) -> Peer {
        connect_gated(lobby, None)
    }

    fn connect_gated(lobby: &Arc<Lobby>, gate: Option<Arc<SendGate>>) -> Peer {
        let (to_server, inbox) = mpsc::unbounded_channel();
        let (outbox, from_server) = mpsc::unbounded_channel();
        let transport = Arc::new(FakeTransport {
            inbox: Mutex::new(inbox),
            outbox,
            gate,
        });

        tokio::spawn(Session::new(Arc::clone(lobby), transport, PASSWORD).run());
        Peer {
            to_server,
            from_server,
        }
    }

    async fn login(lobby: &Arc<Lobby>) -> (Peer, PlayerId) {
        log_in(connect(lobby)).await
    }

    async fn log_in(mut peer: Peer) -> (Peer, PlayerId) {
        peer.expect(MessageType::Message).await;
        peer.send(MessageType::Message, PASSWORD);

        let welcome = peer.expect(MessageType::Message).await;
        let id = welcome
            .payload
            .lines()
            .next()
            .and_then(|line| line.rsplit(' ').next())
            .unwrap()
            .to_string();
        (peer, id)
    }

    /// A starts a game against B with the given word.
    async fn start(
        lobby: &Arc<Lobby>,
        word: &str,
    ) -> ((Peer, PlayerId), (Peer, PlayerId)) {
        let (mut setter, setter_id) = login(lobby).await;
        let (mut guesser, guesser_id) = login(lobby).await;

        setter.send(MessageType::InitGame, &format!("{guesser_id} {word}"));
        let notice = guesser.expect(MessageType::GameStarted).await;
        assert!(notice.payload.contains(&setter_id));
        setter.expect(MessageType::GameStarted).await;

        ((setter, setter_id), (guesser, guesser_id))
    }

    /// Tests that a wrong password is answered with a disconnect and nothing is registered
    #[tokio::test]
    async fn test_wrong_password_disconnects() {
        let lobby = Arc::new(Lobby::new());
        let mut peer = connect(&lobby);

        let prompt = peer.expect(MessageType::Message).await;
        assert_eq!(prompt.payload, PASSWORD_PROMPT);

        peer.send(MessageType::Message, "guess");
        let rejection = peer.expect(MessageType::Disconnect).await;
        assert_eq!(rejection.payload, WRONG_PASSWORD);

        assert!(peer.next().await.is_none());
        assert_eq!(lobby.player_count().await, 0);
    }

    /// Tests that a correct password registers the player under an 8-character id
    #[tokio::test]
    async fn test_login_registers_player() {
        let lobby = Arc::new(Lobby::new());
        let (_peer, id) = login(&lobby).await;

        assert_eq!(id.len(), 8);
        assert_eq!(lobby.state_of(&id).await, Some(PlayerState::Authenticated));
    }

    /// Tests that the player listing leaves out the requester and anyone in a game
    #[tokio::test]
    async fn test_list_players_excludes_self_and_busy() {
        let lobby = Arc::new(Lobby::new());
        let ((_setter, setter_id), (_guesser, guesser_id)) = start(&lobby, "banana").await;
        let (mut a, a_id) = login(&lobby).await;
        let (_b, b_id) = login(&lobby).await;

        a.send(MessageType::GetPlayers, "");
        let listing = a.expect(MessageType::Message).await.payload;

        assert!(listing.contains(&b_id));
        assert!(!listing.contains(&a_id));
        assert!(!listing.contains(&setter_id));
        assert!(!listing.contains(&guesser_id));
    }

    /// Tests a complete game: a hint, a wrong guess and a case-insensitive correct guess
    #[tokio::test]
    async fn test_full_game() {
        let lobby = Arc::new(Lobby::new());
        let ((mut setter, setter_id), (mut guesser, guesser_id)) = start(&lobby, "banana").await;

        setter.send(MessageType::Message, "it is yellow");
        let hint = guesser.expect(MessageType::Message).await;
        assert_eq!(hint.payload, "it is yellow");

        guesser.send(MessageType::Message, "apple");
        let reply = guesser.expect(MessageType::Message).await;
        assert!(reply.payload.contains("not the secret word"));
        let relayed = setter.expect(MessageType::Message).await;
        assert!(relayed.payload.ends_with("apple"));

        guesser.send(MessageType::Message, "BaNaNa");
        let won = guesser.expect(MessageType::Message).await;
        assert!(won.payload.contains("You have won"));
        setter.expect(MessageType::GameTerminated).await;

        assert_eq!(lobby.game_count().await, 0);
        assert_eq!(lobby.state_of(&setter_id).await, Some(PlayerState::Authenticated));
        assert_eq!(lobby.state_of(&guesser_id).await, Some(PlayerState::Authenticated));
    }

    /// Tests that giving up reveals the word and both players can start again
    #[tokio::test]
    async fn test_give_up_then_rematch() {
        let lobby = Arc::new(Lobby::new());
        let ((mut setter, setter_id), (mut guesser, _)) = start(&lobby, "banana").await;

        guesser.send(MessageType::GiveUp, "");
        setter.expect(MessageType::GiveUp).await;
        let reveal = guesser.expect(MessageType::Message).await;
        assert!(reveal.payload.contains("banana"));
        assert_eq!(lobby.game_count().await, 0);

        // Client acknowledgments after a game ends are ignored.
        setter.send(MessageType::GameTerminated, "game over confirmed");

        guesser.send(MessageType::InitGame, &format!("{setter_id} cherry"));
        setter.expect(MessageType::GameStarted).await;
        guesser.expect(MessageType::GameStarted).await;
        assert_eq!(lobby.game_count().await, 1);
    }

    /// Tests that a dropped setter connection reveals the word to the guesser
    #[tokio::test]
    async fn test_setter_disconnect_reveals_word() {
        let lobby = Arc::new(Lobby::new());
        let ((setter, setter_id), (mut guesser, guesser_id)) = start(&lobby, "banana").await;

        drop(setter);

        let notice = guesser.expect(MessageType::GameTerminated).await;
        assert!(notice.payload.contains("banana"));
        assert_eq!(lobby.game_count().await, 0);
        assert_eq!(lobby.state_of(&setter_id).await, None);
        assert_eq!(lobby.state_of(&guesser_id).await, Some(PlayerState::Authenticated));
    }

    /// Tests that a dropped guesser connection ends the game without revealing the word
    #[tokio::test]
    async fn test_guesser_disconnect_hides_word() {
        let lobby = Arc::new(Lobby::new());
        let ((mut setter, setter_id), (guesser, guesser_id)) = start(&lobby, "banana").await;

        drop(guesser);

        let notice = setter.expect(MessageType::GameTerminated).await;
        assert!(!notice.payload.contains("banana"));
        assert_eq!(lobby.game_count().await, 0);
        assert_eq!(lobby.state_of(&guesser_id).await, None);
        assert_eq!(lobby.state_of(&setter_id).await, Some(PlayerState::Authenticated));
    }

    /// Tests that a guesser typing exit mid-game ends the game for the setter
    #[tokio::test]
    async fn test_explicit_exit_mid_game() {
        let lobby = Arc::new(Lobby::new());
        let ((mut setter, _), (mut guesser, _)) = start(&lobby, "banana").await;

        guesser.send(MessageType::Disconnect, "");
        guesser.expect(MessageType::Disconnect).await;
        assert!(guesser.next().await.is_none());

        setter.expect(MessageType::GameTerminated).await;
        assert_eq!(lobby.player_count().await, 1);
    }

    /// Tests that exit from the lobby deregisters the player and closes the connection
    #[tokio::test]
    async fn test_exit_from_lobby() {
        let lobby = Arc::new(Lobby::new());
        let (mut peer, _) = login(&lobby).await;

        peer.send(MessageType::Disconnect, "");
        peer.expect(MessageType::Disconnect).await;
        assert!(peer.next().await.is_none());
        assert_eq!(lobby.player_count().await, 0);
    }

    /// Tests that malformed and out-of-place requests are rejected without a state change
    #[tokio::test]
    async fn test_malformed_requests_keep_state() {
        let lobby = Arc::new(Lobby::new());
        let (mut peer, id) = login(&lobby).await;

        peer.send(MessageType::InitGame, "only-one-field");
        peer.expect(MessageType::Invalid).await;

        peer.send(MessageType::InitGame, &format!("{id} word"));
        let notice = peer.expect(MessageType::Invalid).await;
        assert!(notice.payload.contains("yourself"));

        peer.send(MessageType::InitGame, "deadbeef word");
        let notice = peer.expect(MessageType::Invalid).await;
        assert!(notice.payload.contains("deadbeef"));

        peer.send(MessageType::Unknown(99), "");
        peer.expect(MessageType::Invalid).await;

        peer.send(MessageType::Message, "hello?");
        peer.expect(MessageType::Invalid).await;

        peer.send(MessageType::GameStarted, "starting a new game");
        peer.send(MessageType::GetPlayers, "");
        peer.expect(MessageType::Message).await;

        assert_eq!(lobby.state_of(&id).await, Some(PlayerState::Authenticated));
    }

    /// Tests that lobby requests are rejected while a game is in progress
    #[tokio::test]
    async fn test_control_requests_during_game_are_rejected() {
        let lobby = Arc::new(Lobby::new());
        let ((mut setter, _), (mut guesser, guesser_id)) = start(&lobby, "banana").await;

        setter.send(MessageType::GetPlayers, "");
        setter.expect(MessageType::Invalid).await;

        guesser.send(MessageType::GameStarted, "starting a new game");
        guesser.send(MessageType::InitGame, "someone word");
        guesser.expect(MessageType::Invalid).await;

        setter.send(MessageType::GiveUp, "");
        setter.send(MessageType::Message, "still here");
        let hint = guesser.expect(MessageType::Message).await;
        assert_eq!(hint.payload, "still here");

        assert!(matches!(
            lobby.state_of(&guesser_id).await,
            Some(PlayerState::Guessing(_))
        ));
    }

    /// Tests that a setter typing exit mid-game reveals the word to the guesser
    #[tokio::test]
    async fn test_setter_exit_mid_game_reveals_word() {
        let lobby = Arc::new(Lobby::new());
        let ((mut setter, setter_id), (mut guesser, guesser_id)) = start(&lobby, "banana").await;

        setter.send(MessageType::Disconnect, "");
        setter.expect(MessageType::Disconnect).await;
        assert!(setter.next().await.is_none());

        let notice = guesser.expect(MessageType::GameTerminated).await;
        assert!(notice.payload.contains("banana"));
        assert_eq!(lobby.game_count().await, 0);
        assert_eq!(lobby.state_of(&setter_id).await, None);
        assert_eq!(lobby.state_of(&guesser_id).await, Some(PlayerState::Authenticated));
    }

    /// Tests that a player claimed for a game while its exit reply is in
    /// flight still ends that game on the way out
    #[tokio::test]
    async fn test_exit_while_being_claimed_ends_game() {
        let lobby = Arc::new(Lobby::new());
        let (mut setter, setter_id) = login(&lobby).await;

        let gate = SendGate::new(MessageType::Disconnect);
        let (mut leaver, leaver_id) =
            log_in(connect_gated(&lobby, Some(Arc::clone(&gate)))).await;

        leaver.send(MessageType::Disconnect, "");
        gate.reached.notified().await;

        // The exit reply is held, so the player is still registered and free.
        lobby.start_game(&setter_id, &leaver_id, "banana").await.unwrap();
        gate.open.add_permits(1);

        leaver.expect(MessageType::Disconnect).await;
        assert!(leaver.next().await.is_none());

        let notice = setter.expect(MessageType::GameTerminated).await;
        assert!(!notice.payload.contains("banana"));
        assert_eq!(lobby.game_count().await, 0);
        assert_eq!(lobby.state_of(&leaver_id).await, None);
        assert_eq!(lobby.state_of(&setter_id).await, Some(PlayerState::Authenticated));
    }
}
