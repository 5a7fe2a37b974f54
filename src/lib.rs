//! # Wordchain - a multiplayer word-chain party game for chat channels
//!
//! Players take turns submitting words. Each word must start with the last letter (or the
//! last two letters in hard mode) of the previous one, may not repeat within the game and
//! must be a real singular word. A player who runs out of time or forfeits is eliminated
//! and the chain starts over; the last player standing wins.
//!
//! ## Features
//!
//! - **Per-channel games**: one party per channel, one live game per user per guild.
//! - **Turn timer**: a countdown per turn with periodic ticks; an expired turn eliminates
//!   the player exactly once, even when it races a submission or a forfeit.
//! - **Pluggable word validation**: a free dictionary API or a language model, behind a
//!   TTL cache persisted in sled.
//! - **History and statistics**: games, participants, accepted words and per-guild player
//!   statistics (wins, streaks, timeouts, longest word).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wordchain::config::Config;
//! use wordchain::game::{ChannelSink, GameCoordinator};
//! use wordchain::game::server::ChatServer;
//! use wordchain::storage::SledStore;
//! use wordchain::validator::build_validator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let store = Arc::new(SledStore::open(config.storage.db_path())?);
//!     let validator = build_validator(&config.validator, store.clone());
//!     let (sink, events) = ChannelSink::channel();
//!     let coordinator =
//!         GameCoordinator::new((&config.game).into(), store, validator, Arc::new(sink));
//!
//!     let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//!     let mut server = ChatServer::new(coordinator, config.game.prefix(), 1, 1, tokio::io::stdout());
//!     server.run(stdin, events).await
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`game`] - game state, turn timer, coordinator, notifications and the chat adapter
//! - [`validator`] - word validation backends and the verdict cache
//! - [`storage`] - sled persistence for games, words, statistics and cached verdicts
//! - [`config`] - configuration management and validation
//! - [`validation`] - inbound text checks
//! - [`metrics`] - in-process counters
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Chat adapter   │ ← commands and submissions
//! └─────────────────┘
//!          │
//! ┌─────────────────┐     ┌─────────────────┐
//! │ GameCoordinator │ ──→ │  WordValidator  │
//! │  + TurnTimers   │     └─────────────────┘
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   Storage       │ ← history and statistics
//! └─────────────────┘
//! ```

pub mod config;
pub mod game;
pub mod logutil;
pub mod metrics;
pub mod storage;
pub mod validation;
pub mod validator;
