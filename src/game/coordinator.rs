//! # Game coordinator
//!
//! Owns every live game, one slot per channel. A slot pairs the channel's [`Game`] with its
//! [`TurnTimer`] behind a `tokio::sync::Mutex`; every mutating operation (chat commands,
//! word submissions and timer expiries) takes that lock first and holds it until its
//! persistence writes, timer restart and notifications are done. Operations on
//! different channels never contend. A slot is dropped again once its game is gone and
//! no call is holding it.
//!
//! Timer expiries arrive as [`TimerExpired`] messages on an internal channel. The
//! dispatcher spawned by [`GameCoordinator::new`] turns each into a
//! [`GameCoordinator::handle_timeout`] call, which re-checks the live game (status,
//! timer generation, current player) before eliminating anyone.
//!
//! Storage failures are logged with the game id and operation and never abort play.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError, Weak};

use chrono::Utc;
use log::{debug, info, trace, warn};
use tokio::sync::{mpsc, Mutex};

use super::events::{Actor, GameEvent, NotificationSink};
use super::state::{
    normalize_word, ChannelId, EliminationReason, Game, GameId, GameMode, GameSnapshot,
    GameStatus, GuildId, Member, RejectionKind, UserId,
};
use super::timer::{TimerExpired, TimerSettings, TurnTimer};
use super::GameError;
use crate::config::GameConfig;
use crate::logutil::escape_log;
use crate::metrics;
use crate::storage::records::{GameRecord, GameResult, ParticipantRecord, PlayerStats, WordRecord};
use crate::storage::{GameStore, StorageError};
use crate::validation::validate_language;
use crate::validator::{ValidationResult, WordValidator};

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub min_players: usize,
    pub max_players: usize,
    pub default_turn_seconds: u32,
    pub turn_second_options: Vec<u32>,
    pub update_interval_seconds: u32,
    pub default_language: String,
}

impl From<&GameConfig> for CoordinatorSettings {
    fn from(config: &GameConfig) -> Self {
        Self {
            min_players: config.min_players,
            max_players: config.max_players,
            default_turn_seconds: config.default_turn_seconds,
            turn_second_options: config.turn_second_options.clone(),
            update_interval_seconds: config.timer_update_interval_seconds,
            default_language: config.default_language.clone(),
        }
    }
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self::from(&GameConfig::default())
    }
}

/// Creator's choices for a new party. Unset fields fall back to the configured defaults.
#[derive(Debug, Clone, Default)]
pub struct PartyOptions {
    pub mode: GameMode,
    pub turn_seconds: Option<u32>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Sender is not the current player; nothing happened.
    NotYourTurn,
    Rejected(RejectionKind),
    /// `next_player` is `None` when the accepted word ended the game.
    Accepted { next_player: Option<UserId> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EliminationOutcome {
    Continues { current_player: Option<UserId> },
    GameOver(GameSummary),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    pub game_id: GameId,
    pub winner: Option<UserId>,
    pub total_words: usize,
    pub chain_resets: u32,
}

struct ChannelSlot {
    game: Option<Game>,
    timer: TurnTimer,
}

struct Inner {
    settings: CoordinatorSettings,
    channels: StdMutex<HashMap<ChannelId, Arc<Mutex<ChannelSlot>>>>,
    /// Which channel each (guild, user) is currently playing in.
    memberships: StdMutex<HashMap<(GuildId, UserId), ChannelId>>,
    store: Arc<dyn GameStore>,
    validator: Arc<dyn WordValidator>,
    sink: Arc<dyn NotificationSink>,
    expired_tx: mpsc::UnboundedSender<TimerExpired>,
}

fn lock_std<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn require_status(game: &Game, expected: GameStatus) -> Result<(), GameError> {
    if game.status != expected {
        return Err(GameError::WrongStatus {
            expected,
            actual: game.status,
        });
    }
    Ok(())
}

#[derive(Clone)]
pub struct GameCoordinator {
    inner: Arc<Inner>,
}

impl GameCoordinator {
    /// Build the coordinator and spawn its timeout dispatcher. Must run inside a tokio runtime.
    pub fn new(
        settings: CoordinatorSettings,
        store: Arc<dyn GameStore>,
        validator: Arc<dyn WordValidator>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            settings,
            channels: StdMutex::new(HashMap::new()),
            memberships: StdMutex::new(HashMap::new()),
            store,
            validator,
            sink,
            expired_tx,
        });
        tokio::spawn(dispatch_timeouts(Arc::downgrade(&inner), expired_rx));
        Self { inner }
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.inner.settings
    }

    /// Channels currently holding a slot (a party, a game, or a call in flight).
    pub fn tracked_channels(&self) -> usize {
        lock_std(&self.inner.channels).len()
    }

    fn slot(&self, channel: ChannelId) -> Arc<Mutex<ChannelSlot>> {
        let mut channels = lock_std(&self.inner.channels);
        channels
            .entry(channel)
            .or_insert_with(|| {
                Arc::new(Mutex::new(ChannelSlot {
                    game: None,
                    timer: TurnTimer::new(
                        channel,
                        self.inner.expired_tx.clone(),
                        self.inner.sink.clone(),
                    ),
                }))
            })
            .clone()
    }

    fn existing_slot(&self, channel: ChannelId) -> Result<Arc<Mutex<ChannelSlot>>, GameError> {
        lock_std(&self.inner.channels)
            .get(&channel)
            .cloned()
            .ok_or(GameError::NoGame)
    }

    fn notify(&self, channel: ChannelId, event: GameEvent) {
        self.inner.sink.publish(channel, event);
    }

    fn persist<F>(&self, game: GameId, operation: &str, write: F)
    where
        F: FnOnce(&dyn GameStore) -> Result<(), StorageError>,
    {
        if let Err(e) = write(self.inner.store.as_ref()) {
            warn!("persist failed: game={} op={} err={}", game, operation, e);
        }
    }

    /// Drop the channel's slot once it holds no game and nobody else is holding or
    /// waiting on it. Callers keep one `Arc` and the map keeps the other.
    fn prune(&self, channel: ChannelId, slot: &Arc<Mutex<ChannelSlot>>, game: &Option<Game>) {
        if game.is_some() {
            return;
        }
        let mut channels = lock_std(&self.inner.channels);
        let ours = channels
            .get(&channel)
            .is_some_and(|live| Arc::ptr_eq(live, slot));
        if ours && Arc::strong_count(slot) == 2 {
            channels.remove(&channel);
            trace!("channel {} slot released", channel);
        }
    }

    /// Check and record `user`'s seat in `channel` in one step.
    fn try_claim(&self, guild: GuildId, user: UserId, channel: ChannelId) -> Result<(), GameError> {
        let mut memberships = lock_std(&self.inner.memberships);
        match memberships.get(&(guild, user)) {
            Some(held) if *held != channel => Err(GameError::InAnotherGame),
            _ => {
                memberships.insert((guild, user), channel);
                Ok(())
            }
        }
    }

    /// Free `user`'s seat, but only if it still points at `channel`.
    fn release(&self, guild: GuildId, user: UserId, channel: ChannelId) {
        let mut memberships = lock_std(&self.inner.memberships);
        if memberships.get(&(guild, user)) == Some(&channel) {
            memberships.remove(&(guild, user));
        }
    }

    fn release_all(&self, game: &Game) {
        for user in game.players.keys() {
            self.release(game.guild_id, *user, game.channel_id);
        }
    }

    /// Open a waiting party in `channel` with `creator` as its first player.
    pub async fn create(
        &self,
        guild: GuildId,
        channel: ChannelId,
        creator: Member,
        options: PartyOptions,
    ) -> Result<GameSnapshot, GameError> {
        let settings = &self.inner.settings;
        let turn_seconds = options
            .turn_seconds
            .unwrap_or(settings.default_turn_seconds);
        if !settings.turn_second_options.contains(&turn_seconds) {
            return Err(GameError::InvalidSettings(format!(
                "turn length must be one of {:?} seconds",
                settings.turn_second_options
            )));
        }
        let language = match options.language {
            Some(code) => {
                validate_language(&code).map_err(|e| GameError::InvalidSettings(e.to_string()))?
            }
            None => settings.default_language.clone(),
        };

        let slot = self.slot(channel);
        let mut guard = slot.lock().await;
        if guard.game.is_some() {
            return Err(GameError::GameExists);
        }
        if let Err(e) = self.try_claim(guild, creator.user_id, channel) {
            self.prune(channel, &slot, &guard.game);
            return Err(e);
        }

        let id = match self.inner.store.next_game_id() {
            Ok(id) => id,
            Err(e) => {
                self.release(guild, creator.user_id, channel);
                self.prune(channel, &slot, &guard.game);
                return Err(e.into());
            }
        };
        let game = Game::new(
            id,
            guild,
            channel,
            &creator,
            options.mode,
            turn_seconds,
            language,
        );
        self.persist(id, "create game", |s| {
            s.create_game(&GameRecord::from_game(&game))
        });
        for player in game.players_in_turn_order() {
            let record = ParticipantRecord::from_player(id, player);
            self.persist(id, "add participant", |s| s.add_participant(&record));
        }
        metrics::inc_games_created();
        info!(
            "game {} created in channel {} by {} ({} mode, {}s)",
            id,
            channel,
            escape_log(&creator.display_name),
            game.mode,
            turn_seconds
        );

        let snapshot = game.snapshot();
        self.notify(
            channel,
            GameEvent::PartyCreated {
                creator: Actor {
                    user_id: creator.user_id,
                    display_name: creator.display_name,
                },
                mode: game.mode.to_string(),
                turn_seconds,
            },
        );
        guard.game = Some(game);
        Ok(snapshot)
    }

    /// Add `member` to the waiting party. Returns the new player count.
    pub async fn join(&self, channel: ChannelId, member: Member) -> Result<usize, GameError> {
        let slot = self.existing_slot(channel)?;
        let mut slot = slot.lock().await;
        let game = slot.game.as_mut().ok_or(GameError::NoGame)?;
        require_status(game, GameStatus::Waiting)?;
        if game.has_player(member.user_id) {
            return Err(GameError::AlreadyJoined);
        }
        let max = self.inner.settings.max_players;
        if game.players.len() >= max {
            return Err(GameError::PartyFull { max });
        }
        self.try_claim(game.guild_id, member.user_id, channel)?;

        let record = ParticipantRecord::from_player(game.id, game.add_player(&member));
        self.persist(game.id, "add participant", |s| s.add_participant(&record));

        let player_count = game.players.len();
        debug!(
            "{} joined game {} ({}/{})",
            escape_log(&member.display_name),
            game.id,
            player_count,
            max
        );
        self.notify(
            channel,
            GameEvent::PlayerJoined {
                actor: Actor {
                    user_id: member.user_id,
                    display_name: member.display_name,
                },
                player_count,
                max_players: max,
            },
        );
        Ok(player_count)
    }

    /// Leave a waiting party. Active games are left with [`GameCoordinator::forfeit`].
    pub async fn leave(&self, channel: ChannelId, user: UserId) -> Result<usize, GameError> {
        let slot = self.existing_slot(channel)?;
        let mut slot = slot.lock().await;
        let game = slot.game.as_mut().ok_or(GameError::NoGame)?;
        require_status(game, GameStatus::Waiting)?;
        if !game.has_player(user) {
            return Err(GameError::NotInGame);
        }
        if game.creator_id == user {
            return Err(GameError::CreatorCannotLeave);
        }

        let player = game.remove_player(user).ok_or(GameError::NotInGame)?;
        self.persist(game.id, "remove participant", |s| {
            s.remove_participant(game.id, user)
        });
        self.release(game.guild_id, user, channel);

        let player_count = game.players.len();
        self.notify(
            channel,
            GameEvent::PlayerLeft {
                actor: Actor::from(&player),
                player_count,
            },
        );
        Ok(player_count)
    }

    /// Creator starts the game: first player in join order takes the first turn.
    pub async fn start(&self, channel: ChannelId, user: UserId) -> Result<(), GameError> {
        let slot = self.existing_slot(channel)?;
        let mut guard = slot.lock().await;
        let ChannelSlot { game, timer } = &mut *guard;
        let game = game.as_mut().ok_or(GameError::NoGame)?;
        require_status(game, GameStatus::Waiting)?;
        if game.creator_id != user {
            return Err(GameError::NotCreator);
        }
        let need = self.inner.settings.min_players;
        let have = game.players.len();
        if have < need {
            return Err(GameError::NotEnoughPlayers { have, need });
        }

        game.start();
        let started_at = game.started_at.unwrap_or_else(Utc::now);
        self.persist(game.id, "mark started", |s| s.mark_started(game.id, started_at));
        metrics::inc_games_started();
        info!(
            "game {} started in channel {} with {} players",
            game.id, channel, have
        );

        self.notify(
            channel,
            GameEvent::GameStarted {
                players: game.players_in_turn_order().map(Actor::from).collect(),
                mode: game.mode.to_string(),
                turn_seconds: game.turn_seconds,
            },
        );
        self.begin_turn(game, timer);
        Ok(())
    }

    /// Restart the countdown for whoever holds the turn now and announce it.
    fn begin_turn(&self, game: &Game, timer: &mut TurnTimer) {
        let Some(current) = game.current_player_id() else {
            return;
        };
        timer.reset(
            current,
            TimerSettings::from_secs(game.turn_seconds, self.inner.settings.update_interval_seconds),
        );
        self.announce_turn(game, game.turn_seconds);
    }

    fn announce_turn(&self, game: &Game, seconds: u32) {
        let Some(player) = game.current_player_id().and_then(|id| game.player(id)) else {
            return;
        };
        self.notify(
            game.channel_id,
            GameEvent::TurnStarted {
                actor: Actor::from(player),
                required_start: game.required_start(),
                seconds,
            },
        );
    }

    /// Run a chat message from `user` through the acceptance pipeline. Submissions from
    /// anyone but the current player are ignored. Rejections never touch the timer.
    pub async fn submit_word(
        &self,
        channel: ChannelId,
        user: UserId,
        word: &str,
    ) -> Result<SubmissionOutcome, GameError> {
        let slot = self.existing_slot(channel)?;
        let mut guard = slot.lock().await;
        let ChannelSlot {
            game: game_slot,
            timer,
        } = &mut *guard;
        let game = game_slot.as_mut().ok_or(GameError::NoGame)?;
        require_status(game, GameStatus::Active)?;
        if game.current_player_id() != Some(user) {
            return Ok(SubmissionOutcome::NotYourTurn);
        }

        let word = normalize_word(word);
        if let Err(kind) = game.precheck_word(&word) {
            return Ok(self.reject(game, user, &word, kind, None));
        }

        // The slot lock stays held across the lookup so a timeout cannot advance the
        // turn underneath us.
        let verdict: ValidationResult = self.inner.validator.validate(&word, &game.language).await;
        if verdict.plural {
            return Ok(self.reject(game, user, &word, RejectionKind::Plural, verdict.reason));
        }
        if !verdict.valid {
            return Ok(self.reject(game, user, &word, RejectionKind::NotAWord, verdict.reason));
        }

        game.add_word(&word, user);
        let chain_length = game.chain_words.len();
        let record = WordRecord {
            game_id: game.id,
            user_id: user,
            word: word.clone(),
            chain_number: game.chain_number,
            position: chain_length as u32,
            played_at: Utc::now(),
        };
        self.persist(game.id, "record word", |s| s.record_word(&record));
        self.persist_counters(game, user);
        metrics::inc_words_accepted();

        let actor = game.player(user).map(Actor::from);
        let next = game.next_turn();
        if let Some(actor) = actor {
            self.notify(
                channel,
                GameEvent::WordAccepted {
                    word: word.clone(),
                    actor,
                    next_required_start: game.required_start().unwrap_or_default(),
                    chain_length,
                },
            );
        }
        debug!(
            "game {}: '{}' accepted, next={:?}",
            game.id,
            escape_log(&word),
            next
        );

        match next {
            Some(next_player) => {
                self.begin_turn(game, timer);
                Ok(SubmissionOutcome::Accepted {
                    next_player: Some(next_player),
                })
            }
            None => {
                self.finish(game_slot, timer);
                self.prune(channel, &slot, game_slot);
                Ok(SubmissionOutcome::Accepted { next_player: None })
            }
        }
    }

    fn reject(
        &self,
        game: &mut Game,
        user: UserId,
        word: &str,
        kind: RejectionKind,
        detail: Option<String>,
    ) -> SubmissionOutcome {
        game.record_invalid_attempt(user);
        self.persist_counters(game, user);
        metrics::record_rejection(kind.as_str());
        debug!(
            "game {}: '{}' rejected ({})",
            game.id,
            escape_log(word),
            kind
        );
        if let Some(player) = game.player(user) {
            self.notify(
                game.channel_id,
                GameEvent::WordRejected {
                    word: word.to_string(),
                    actor: Actor::from(player),
                    kind: kind.clone(),
                    detail,
                },
            );
        }
        SubmissionOutcome::Rejected(kind)
    }

    fn persist_counters(&self, game: &Game, user: UserId) {
        if let Some(player) = game.player(user) {
            self.persist(game.id, "update participant counters", |s| {
                s.update_participant_counters(
                    game.id,
                    user,
                    player.words_played,
                    player.invalid_attempts,
                    player.longest_word.as_deref(),
                )
            });
        }
    }

    /// Give up an active game. If the forfeiting player held the turn it passes on;
    /// otherwise the current player keeps both the turn and the running countdown.
    pub async fn forfeit(
        &self,
        channel: ChannelId,
        user: UserId,
    ) -> Result<EliminationOutcome, GameError> {
        let slot = self.existing_slot(channel)?;
        let mut guard = slot.lock().await;
        let ChannelSlot {
            game: game_slot,
            timer,
        } = &mut *guard;
        let game = game_slot.as_ref().ok_or(GameError::NoGame)?;
        require_status(game, GameStatus::Active)?;
        let player = game.player(user).ok_or(GameError::NotInGame)?;
        if player.is_eliminated {
            return Err(GameError::AlreadyEliminated);
        }
        let was_current = game.current_player_id() == Some(user);
        let outcome = self.eliminate(game_slot, timer, user, EliminationReason::Forfeit, was_current);
        self.prune(channel, &slot, game_slot);
        Ok(outcome)
    }

    /// Timer expiry entry point. Acts only if the game is still active, the expiry belongs
    /// to the live timer instance and has not been handled, and the captured player still
    /// holds the turn. Returns whether anyone was eliminated.
    pub async fn handle_timeout(&self, expiry: TimerExpired) -> bool {
        let Ok(slot) = self.existing_slot(expiry.channel) else {
            return false;
        };
        let mut guard = slot.lock().await;
        let ChannelSlot {
            game: game_slot,
            timer,
        } = &mut *guard;
        let Some(game) = game_slot.as_ref() else {
            debug!("timeout for channel {} with no game", expiry.channel);
            return false;
        };
        if game.status != GameStatus::Active {
            return false;
        }
        if !timer.acknowledge_expiry(expiry.generation) {
            debug!(
                "stale timer expiry for channel {} (gen {}, live {})",
                expiry.channel,
                expiry.generation,
                timer.generation()
            );
            return false;
        }
        if game.current_player_id() != Some(expiry.player) {
            debug!(
                "timer expiry for {} but the turn has moved on",
                expiry.player
            );
            return false;
        }

        if let Some(player) = game.player(expiry.player) {
            self.notify(
                expiry.channel,
                GameEvent::TimerExpired {
                    actor: Actor::from(player),
                },
            );
        }
        self.eliminate(
            game_slot,
            timer,
            expiry.player,
            EliminationReason::Timeout,
            true,
        );
        self.prune(expiry.channel, &slot, game_slot);
        true
    }

    /// Elimination, chain reset, then either end-game or (when `advance`) the next turn.
    fn eliminate(
        &self,
        game_slot: &mut Option<Game>,
        timer: &mut TurnTimer,
        user: UserId,
        reason: EliminationReason,
        advance: bool,
    ) -> EliminationOutcome {
        let Some(game) = game_slot.as_mut() else {
            return EliminationOutcome::Continues {
                current_player: None,
            };
        };
        let Some((rank, actor)) = game
            .eliminate_player(user, reason)
            .map(|p| (p.elimination_rank.unwrap_or_default(), Actor::from(p)))
        else {
            return EliminationOutcome::Continues {
                current_player: game.current_player_id(),
            };
        };
        game.reset_chain();
        self.persist(game.id, "mark eliminated", |s| {
            s.mark_eliminated(game.id, user, rank, reason)
        });
        metrics::inc_eliminations();

        let remaining = game.active_player_count();
        info!(
            "game {}: {} eliminated ({}), rank {}, {} left",
            game.id,
            escape_log(&actor.display_name),
            reason,
            rank,
            remaining
        );
        let event = match reason {
            EliminationReason::Timeout => GameEvent::PlayerEliminated {
                actor,
                reason,
                remaining,
            },
            EliminationReason::Forfeit => GameEvent::PlayerForfeited { actor, remaining },
        };
        self.notify(game.channel_id, event);

        if game.is_game_over() || (advance && game.next_turn().is_none()) {
            return match self.finish(game_slot, timer) {
                Some(summary) => EliminationOutcome::GameOver(summary),
                None => EliminationOutcome::Continues {
                    current_player: None,
                },
            };
        }
        if advance {
            self.begin_turn(game, timer);
        } else {
            // Same player, same countdown, but the chain just restarted.
            let elapsed = game
                .turn_started_at
                .map(|at| (Utc::now() - at).num_seconds().max(0) as u32)
                .unwrap_or_default();
            self.announce_turn(game, game.turn_seconds.saturating_sub(elapsed));
        }
        EliminationOutcome::Continues {
            current_player: game.current_player_id(),
        }
    }

    /// End the game held in `game_slot`. Taking the game out of the slot is the guard that
    /// makes this run at most once per game.
    fn finish(&self, game_slot: &mut Option<Game>, timer: &mut TurnTimer) -> Option<GameSummary> {
        let mut game = game_slot.take()?;
        timer.stop();
        game.status = GameStatus::Finished;

        let winner = game.winner().map(|p| p.user_id);
        let summary = GameSummary {
            game_id: game.id,
            winner,
            total_words: game.total_words(),
            chain_resets: game.chain_reset_count,
        };
        self.persist(game.id, "mark finished", |s| {
            s.mark_finished(
                game.id,
                winner,
                summary.total_words as u32,
                summary.chain_resets,
            )
        });
        self.record_stats(&game, winner);
        self.release_all(&game);
        metrics::inc_games_finished();

        let duration = Utc::now() - game.started_at.unwrap_or(game.created_at);
        info!(
            "game {} finished: winner={:?} words={} resets={}",
            game.id, winner, summary.total_words, summary.chain_resets
        );
        self.notify(
            game.channel_id,
            GameEvent::GameEnded {
                winner: winner.and_then(|id| game.player(id)).map(Actor::from),
                total_words: summary.total_words,
                chain_resets: summary.chain_resets,
                duration,
            },
        );
        Some(summary)
    }

    fn record_stats(&self, game: &Game, winner: Option<UserId>) {
        let store = self.inner.store.as_ref();
        for player in game.players_in_turn_order() {
            let mut stats = match store.player_stats(game.guild_id, player.user_id) {
                Ok(Some(stats)) => stats,
                Ok(None) => PlayerStats::new(game.guild_id, player.user_id, &player.username),
                Err(e) => {
                    warn!(
                        "persist failed: game={} op=load player stats user={} err={}",
                        game.id, player.user_id, e
                    );
                    continue;
                }
            };
            stats.username = player.username.clone();
            stats.apply(&GameResult::for_player(player, winner));
            self.persist(game.id, "upsert player stats", |s| {
                s.upsert_player_stats(&stats)
            });
        }
    }

    /// Creator drops a party that has not started. Nothing about it is kept.
    pub async fn cancel(&self, channel: ChannelId, user: UserId) -> Result<(), GameError> {
        let slot = self.existing_slot(channel)?;
        let mut guard = slot.lock().await;
        let ChannelSlot {
            game: game_slot,
            timer,
        } = &mut *guard;
        let game = game_slot.as_ref().ok_or(GameError::NoGame)?;
        require_status(game, GameStatus::Waiting)?;
        if game.creator_id != user {
            return Err(GameError::NotCreator);
        }

        let Some(mut game) = game_slot.take() else {
            return Err(GameError::NoGame);
        };
        timer.stop();
        game.status = GameStatus::Cancelled;
        self.persist(game.id, "delete game", |s| s.delete_game(game.id));
        self.release_all(&game);
        self.prune(channel, &slot, game_slot);
        metrics::inc_games_cancelled();

        let reason = game
            .player(user)
            .map(|p| format!("cancelled by {}", p.display_name))
            .unwrap_or_else(|| "cancelled by the creator".to_string());
        info!("game {} in channel {} {}", game.id, channel, game.status);
        self.notify(channel, GameEvent::GameCancelled { reason });
        Ok(())
    }

    /// Creator stops an active game now. The winner is the sole survivor, if any.
    pub async fn end(&self, channel: ChannelId, user: UserId) -> Result<GameSummary, GameError> {
        let slot = self.existing_slot(channel)?;
        let mut guard = slot.lock().await;
        let ChannelSlot {
            game: game_slot,
            timer,
        } = &mut *guard;
        let game = game_slot.as_ref().ok_or(GameError::NoGame)?;
        require_status(game, GameStatus::Active)?;
        if game.creator_id != user {
            return Err(GameError::NotCreator);
        }
        let summary = self.finish(game_slot, timer).ok_or(GameError::NoGame);
        self.prune(channel, &slot, game_slot);
        summary
    }

    pub async fn status(&self, channel: ChannelId) -> Option<GameSnapshot> {
        let slot = self.existing_slot(channel).ok()?;
        let slot = slot.lock().await;
        slot.game.as_ref().map(Game::snapshot)
    }

    /// Ask the validator about a word outside of play.
    pub async fn check_word(
        &self,
        word: &str,
        language: Option<&str>,
    ) -> Result<ValidationResult, GameError> {
        let language = match language {
            Some(code) => {
                validate_language(code).map_err(|e| GameError::InvalidSettings(e.to_string()))?
            }
            None => self.inner.settings.default_language.clone(),
        };
        Ok(self
            .inner
            .validator
            .validate(&normalize_word(word), &language)
            .await)
    }

    pub fn player_stats(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> Result<Option<PlayerStats>, GameError> {
        Ok(self.inner.store.player_stats(guild, user)?)
    }
}

async fn dispatch_timeouts(inner: Weak<Inner>, mut rx: mpsc::UnboundedReceiver<TimerExpired>) {
    while let Some(expiry) = rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let coordinator = GameCoordinator { inner };
        tokio::spawn(async move {
            coordinator.handle_timeout(expiry).await;
        });
    }
    debug!("timeout dispatcher stopped");
}
