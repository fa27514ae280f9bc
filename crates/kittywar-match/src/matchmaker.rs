//! Matchmaker: a single actor that pairs waiting players in FIFO order.
//!
//! Sessions call [`MatchmakerHandle::enqueue`] and then wait on the
//! returned one-shot receiver. When two live entries are queued, the
//! matchmaker creates a [`Match`], wraps it in a [`SharedMatch`], and
//! hands it to both sessions along with their seat.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot};

use crate::{Match, MatchError, Player, PlayerSender, Seat, SharedMatch};

/// Default command channel size for the matchmaker actor.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// What a waiting session receives once it has been paired.
#[derive(Debug)]
pub struct Assignment {
    pub game: SharedMatch,
    pub seat: Seat,
}

enum Command {
    Enqueue {
        entry: Entry,
    },
    /// Number of entries currently waiting.
    QueueLen {
        reply: oneshot::Sender<usize>,
    },
}

struct Entry {
    username: String,
    cats: Vec<u8>,
    sender: PlayerSender,
    reply: oneshot::Sender<Assignment>,
}

/// Handle to the running matchmaker. Cheap to clone.
#[derive(Clone)]
pub struct MatchmakerHandle {
    sender: mpsc::Sender<Command>,
}

impl MatchmakerHandle {
    /// Puts a player in the queue.
    ///
    /// The returned receiver resolves once the player has been paired.
    /// Dropping it withdraws the player: the matchmaker skips entries
    /// whose receiver is gone.
    pub async fn enqueue(
        &self,
        username: impl Into<String>,
        cats: Vec<u8>,
        sender: PlayerSender,
    ) -> Result<oneshot::Receiver<Assignment>, MatchError> {
        let (reply, assignment) = oneshot::channel();
        let entry = Entry {
            username: username.into(),
            cats,
            sender,
            reply,
        };
        self.sender
            .send(Command::Enqueue { entry })
            .await
            .map_err(|_| MatchError::MatchmakerClosed)?;
        Ok(assignment)
    }

    /// Returns how many players are waiting, withdrawn ones included
    /// until the next pairing attempt prunes them.
    pub async fn queue_len(&self) -> Result<usize, MatchError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(Command::QueueLen { reply })
            .await
            .map_err(|_| MatchError::MatchmakerClosed)?;
        rx.await.map_err(|_| MatchError::MatchmakerClosed)
    }
}

struct Matchmaker {
    queue: VecDeque<Entry>,
    receiver: mpsc::Receiver<Command>,
}

impl Matchmaker {
    async fn run(mut self) {
        tracing::info!("matchmaker started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                Command::Enqueue { entry } => {
                    tracing::debug!(username = %entry.username, "player queued");
                    self.queue.push_back(entry);
                    self.pair().await;
                }
                Command::QueueLen { reply } => {
                    let _ = reply.send(self.queue.len());
                }
            }
        }

        tracing::info!("matchmaker stopped");
    }

    /// Pairs live entries two at a time, oldest first.
    async fn pair(&mut self) {
        self.queue.retain(|entry| {
            let live = !entry.reply.is_closed();
            if !live {
                tracing::debug!(username = %entry.username, "dropping withdrawn entry");
            }
            live
        });

        while self.queue.len() >= 2 {
            let (Some(first), Some(second)) = (self.queue.pop_front(), self.queue.pop_front())
            else {
                break;
            };
            self.start_match(first, second).await;
        }
    }

    async fn start_match(&self, first: Entry, second: Entry) {
        let one = Player::new(first.username, first.cats, first.sender);
        let two = Player::new(second.username, second.cats, second.sender);
        let game: SharedMatch = Arc::new(Mutex::new(Match::new(one, two)));

        for (reply, seat) in [(first.reply, Seat::One), (second.reply, Seat::Two)] {
            let assignment = Assignment {
                game: Arc::clone(&game),
                seat,
            };
            if reply.send(assignment).is_err() {
                // Withdrew between pruning and pairing.
                game.lock().await.disconnect(seat);
            }
        }
    }
}

/// Spawns the matchmaker task and returns a handle to it.
///
/// The task stops once every handle has been dropped.
pub fn spawn_matchmaker() -> MatchmakerHandle {
    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_SIZE);
    let actor = Matchmaker {
        queue: VecDeque::new(),
        receiver: rx,
    };
    tokio::spawn(actor.run());
    MatchmakerHandle { sender: tx }
}
