//! The word-chain game core: state, turn timer, coordinator and the chat surface.

pub mod commands;
pub mod coordinator;
pub mod events;
pub mod server;
pub mod state;
pub mod timer;

use thiserror::Error;

use crate::storage::StorageError;
use state::GameStatus;

pub use coordinator::{
    CoordinatorSettings, EliminationOutcome, GameCoordinator, GameSummary, PartyOptions,
    SubmissionOutcome,
};
pub use events::{Actor, ChannelSink, GameEvent, NotificationSink};
pub use state::{Game, GameId, GameMode, GameSnapshot, Member};

/// Precondition failures. Reported to the acting user only; nothing was mutated.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("there is no game in this channel")]
    NoGame,

    #[error("a game is already running in this channel")]
    GameExists,

    #[error("the game is {actual}, this needs a {expected} game")]
    WrongStatus {
        expected: GameStatus,
        actual: GameStatus,
    },

    #[error("you already joined this party")]
    AlreadyJoined,

    #[error("the party is full ({max} players)")]
    PartyFull { max: usize },

    #[error("need at least {need} players to start (have {have})")]
    NotEnoughPlayers { have: usize, need: usize },

    #[error("you are not in this game")]
    NotInGame,

    #[error("you are already out of this game")]
    AlreadyEliminated,

    #[error("only the party creator can do that")]
    NotCreator,

    #[error("the creator cannot leave; cancel the party instead")]
    CreatorCannotLeave,

    #[error("you are already playing in another channel")]
    InAnotherGame,

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
