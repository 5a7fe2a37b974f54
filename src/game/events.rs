//! Outbound game notifications.
//!
//! The coordinator emits one [`GameEvent`] per transition to a [`NotificationSink`].
//! Delivery is fire-and-forget: a sink that cannot deliver logs and drops the event,
//! game state is never rolled back because of it.

use std::fmt;

use chrono::Duration;
use log::debug;
use tokio::sync::mpsc;

use super::state::{ChannelId, EliminationReason, Player, RejectionKind, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub display_name: String,
}

impl From<&Player> for Actor {
    fn from(player: &Player) -> Self {
        Self {
            user_id: player.user_id,
            display_name: player.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    PartyCreated {
        creator: Actor,
        mode: String,
        turn_seconds: u32,
    },
    PlayerJoined {
        actor: Actor,
        player_count: usize,
        max_players: usize,
    },
    PlayerLeft {
        actor: Actor,
        player_count: usize,
    },
    GameStarted {
        players: Vec<Actor>,
        mode: String,
        turn_seconds: u32,
    },
    TurnStarted {
        actor: Actor,
        required_start: Option<String>,
        seconds: u32,
    },
    WordAccepted {
        word: String,
        actor: Actor,
        next_required_start: String,
        chain_length: usize,
    },
    WordRejected {
        word: String,
        actor: Actor,
        kind: RejectionKind,
        detail: Option<String>,
    },
    PlayerEliminated {
        actor: Actor,
        reason: EliminationReason,
        remaining: usize,
    },
    PlayerForfeited {
        actor: Actor,
        remaining: usize,
    },
    TimerTick {
        seconds_remaining: u32,
    },
    TimerExpired {
        actor: Actor,
    },
    GameEnded {
        winner: Option<Actor>,
        total_words: usize,
        chain_resets: u32,
        duration: Duration,
    },
    GameCancelled {
        reason: String,
    },
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEvent::PartyCreated {
                creator,
                mode,
                turn_seconds,
            } => write!(
                f,
                "{} opened a word-chain party ({} mode, {}s turns). Use wc join to play",
                creator.display_name, mode, turn_seconds
            ),
            GameEvent::PlayerJoined {
                actor,
                player_count,
                max_players,
            } => write!(
                f,
                "{} joined the party ({}/{})",
                actor.display_name, player_count, max_players
            ),
            GameEvent::PlayerLeft {
                actor,
                player_count,
            } => write!(
                f,
                "{} left the party ({} remaining)",
                actor.display_name, player_count
            ),
            GameEvent::GameStarted {
                players,
                mode,
                turn_seconds,
            } => {
                let names: Vec<&str> = players.iter().map(|p| p.display_name.as_str()).collect();
                write!(
                    f,
                    "Game on! {} mode, {}s per turn. Order: {}",
                    mode,
                    turn_seconds,
                    names.join(" -> ")
                )
            }
            GameEvent::TurnStarted {
                actor,
                required_start,
                seconds,
            } => match required_start {
                Some(start) => write!(
                    f,
                    "{}, your turn! Word starting with '{}' ({}s)",
                    actor.display_name,
                    start.to_uppercase(),
                    seconds
                ),
                None => write!(
                    f,
                    "{}, your turn! Any word starts a new chain ({}s)",
                    actor.display_name, seconds
                ),
            },
            GameEvent::WordAccepted {
                word,
                actor,
                next_required_start,
                chain_length,
            } => write!(
                f,
                "OK {} played '{}' (chain {}). Next starts with '{}'",
                actor.display_name,
                word,
                chain_length,
                next_required_start.to_uppercase()
            ),
            GameEvent::WordRejected {
                word,
                actor,
                kind,
                detail,
            } => match detail {
                Some(detail) => write!(
                    f,
                    "'{}' from {} rejected: {} ({})",
                    word, actor.display_name, kind, detail
                ),
                None => write!(f, "'{}' from {} rejected: {}", word, actor.display_name, kind),
            },
            GameEvent::PlayerEliminated {
                actor,
                reason,
                remaining,
            } => write!(
                f,
                "{} is out ({}). {} players left",
                actor.display_name, reason, remaining
            ),
            GameEvent::PlayerForfeited { actor, remaining } => write!(
                f,
                "{} forfeited. {} players left",
                actor.display_name, remaining
            ),
            GameEvent::TimerTick { seconds_remaining } => {
                write!(f, "{}s left", seconds_remaining)
            }
            GameEvent::TimerExpired { actor } => {
                write!(f, "Time is up for {}!", actor.display_name)
            }
            GameEvent::GameEnded {
                winner,
                total_words,
                chain_resets,
                duration,
            } => {
                let minutes = duration.num_minutes();
                match winner {
                    Some(w) => write!(
                        f,
                        "{} wins! {} words, {} chain resets, {} min",
                        w.display_name, total_words, chain_resets, minutes
                    ),
                    None => write!(
                        f,
                        "Game over with no winner. {} words, {} chain resets, {} min",
                        total_words, chain_resets, minutes
                    ),
                }
            }
            GameEvent::GameCancelled { reason } => write!(f, "Party cancelled: {}", reason),
        }
    }
}

/// Receiver of game notifications for a channel.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, channel: ChannelId, event: GameEvent);
}

/// Forwards events into an unbounded channel consumed by the chat adapter.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<(ChannelId, GameEvent)>,
}

impl ChannelSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<(ChannelId, GameEvent)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn publish(&self, channel: ChannelId, event: GameEvent) {
        if self.tx.send((channel, event)).is_err() {
            debug!("notification receiver closed; dropping event for channel {}", channel);
        }
    }
}
