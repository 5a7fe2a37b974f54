//! In-memory model of one word-chain party and the turn engine that drives it.
//!
//! A [`Game`] is the authoritative state for a single channel. All transitions
//! (joining, word acceptance, elimination, chain resets, turn rotation) are plain
//! synchronous methods on the struct; serialization against timers and concurrent
//! chat events is the job of [`crate::game::coordinator`].
//!
//! Whose turn it is is never stored directly. [`Game::current_player_id`] derives
//! it every time from `turn_order`, the elimination flags and `current_turn_index`
//! (taken modulo the number of active players).

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = u64;
pub type ChannelId = u64;
pub type GuildId = u64;

/// Persistent identifier of a game, independent of the channel it runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Next word must start with the last letter of the previous one.
    #[default]
    Normal,
    /// Next word must start with the last two letters of the previous one.
    Hard,
}

impl GameMode {
    pub fn letters_to_match(self) -> usize {
        match self {
            GameMode::Normal => 1,
            GameMode::Hard => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Normal => "normal",
            GameMode::Hard => "hard",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" | "n" => Ok(GameMode::Normal),
            "hard" | "h" => Ok(GameMode::Hard),
            other => Err(format!("unknown game mode '{}'", other)),
        }
    }
}

/// Lifecycle of a game. Transitions only move forward:
/// `Waiting -> Active -> Finished` or `Waiting -> Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Active,
    Finished,
    Cancelled,
}

impl GameStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::Waiting => "waiting",
            GameStatus::Active => "active",
            GameStatus::Finished => "finished",
            GameStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EliminationReason {
    Timeout,
    Forfeit,
}

impl fmt::Display for EliminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EliminationReason::Timeout => f.write_str("out of time"),
            EliminationReason::Forfeit => f.write_str("forfeit"),
        }
    }
}

/// Identity of a chat user as seen at join time. Names are snapshots and are not refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user_id: UserId,
    pub username: String,
    pub display_name: String,
}

impl Member {
    pub fn new(user_id: UserId, username: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub user_id: UserId,
    pub username: String,
    pub display_name: String,
    pub turn_order: usize,
    pub is_eliminated: bool,
    pub elimination_rank: Option<u32>,
    pub eliminated_by: Option<EliminationReason>,
    pub words_played: u32,
    pub invalid_attempts: u32,
    pub longest_word: Option<String>,
}

impl Player {
    fn new(member: &Member, turn_order: usize) -> Self {
        Self {
            user_id: member.user_id,
            username: member.username.clone(),
            display_name: member.display_name.clone(),
            turn_order,
            is_eliminated: false,
            elimination_rank: None,
            eliminated_by: None,
            words_played: 0,
            invalid_attempts: 0,
            longest_word: None,
        }
    }
}

/// Why a well-formed submission from the current player was turned down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionKind {
    AlreadyUsed,
    WrongStart { required: String },
    Plural,
    NotAWord,
}

impl RejectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionKind::AlreadyUsed => "already_used",
            RejectionKind::WrongStart { .. } => "wrong_start",
            RejectionKind::Plural => "plural",
            RejectionKind::NotAWord => "not_a_word",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionKind::AlreadyUsed => f.write_str("already used"),
            RejectionKind::WrongStart { required } => {
                write!(f, "must start with '{}'", required.to_uppercase())
            }
            RejectionKind::Plural => f.write_str("plural rejected"),
            RejectionKind::NotAWord => f.write_str("not a dictionary word"),
        }
    }
}

/// Lowercase and trim a submitted word. Every comparison against the chain goes through this.
pub fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase()
}

/// The trailing `count` characters of `word`, lowercased. Character based so multi-byte
/// letters are never split.
fn trailing_chars(word: &str, count: usize) -> String {
    let chars: Vec<char> = word.chars().collect();
    let start = chars.len().saturating_sub(count);
    chars[start..].iter().collect::<String>().to_lowercase()
}

#[derive(Debug, Clone)]
pub struct Game {
    pub id: GameId,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub creator_id: UserId,
    pub mode: GameMode,
    pub turn_seconds: u32,
    pub language: String,
    pub status: GameStatus,
    pub players: HashMap<UserId, Player>,
    pub turn_order: Vec<UserId>,
    pub current_turn_index: usize,
    pub chain_number: u32,
    pub chain_words: Vec<String>,
    pub used_words: HashSet<String>,
    pub last_word: Option<String>,
    pub chain_reset_count: u32,
    pub elimination_counter: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub turn_started_at: Option<DateTime<Utc>>,
}

impl Game {
    /// Create a waiting party with its creator as the first player.
    pub fn new(
        id: GameId,
        guild_id: GuildId,
        channel_id: ChannelId,
        creator: &Member,
        mode: GameMode,
        turn_seconds: u32,
        language: impl Into<String>,
    ) -> Self {
        let mut game = Self {
            id,
            guild_id,
            channel_id,
            creator_id: creator.user_id,
            mode,
            turn_seconds,
            language: language.into(),
            status: GameStatus::Waiting,
            players: HashMap::new(),
            turn_order: Vec::new(),
            current_turn_index: 0,
            chain_number: 1,
            chain_words: Vec::new(),
            used_words: HashSet::new(),
            last_word: None,
            chain_reset_count: 0,
            elimination_counter: 0,
            created_at: Utc::now(),
            started_at: None,
            turn_started_at: None,
        };
        game.add_player(creator);
        game
    }

    pub fn add_player(&mut self, member: &Member) -> &Player {
        let turn_order = self.turn_order.len();
        self.turn_order.push(member.user_id);
        self.players
            .entry(member.user_id)
            .or_insert_with(|| Player::new(member, turn_order))
    }

    /// Remove a player while the party is still waiting. Turn positions are renumbered.
    pub fn remove_player(&mut self, user_id: UserId) -> Option<Player> {
        if self.status != GameStatus::Waiting {
            return None;
        }
        let player = self.players.remove(&user_id)?;
        self.turn_order.retain(|id| *id != user_id);
        for (idx, id) in self.turn_order.iter().enumerate() {
            if let Some(p) = self.players.get_mut(id) {
                p.turn_order = idx;
            }
        }
        Some(player)
    }

    pub fn has_player(&self, user_id: UserId) -> bool {
        self.players.contains_key(&user_id)
    }

    pub fn player(&self, user_id: UserId) -> Option<&Player> {
        self.players.get(&user_id)
    }

    /// Players in join order.
    pub fn players_in_turn_order(&self) -> impl Iterator<Item = &Player> {
        self.turn_order.iter().filter_map(|id| self.players.get(id))
    }

    pub fn start(&mut self) {
        let now = Utc::now();
        self.status = GameStatus::Active;
        self.started_at = Some(now);
        self.current_turn_index = 0;
        self.turn_started_at = Some(now);
    }

    pub fn letters_to_match(&self) -> usize {
        self.mode.letters_to_match()
    }

    pub fn required_start(&self) -> Option<String> {
        self.last_word
            .as_deref()
            .map(|w| trailing_chars(w, self.letters_to_match()))
    }

    pub fn matches_required_start(&self, word: &str) -> bool {
        match self.required_start() {
            None => true,
            Some(required) => normalize_word(word).starts_with(&required),
        }
    }

    pub fn is_word_used(&self, word: &str) -> bool {
        self.used_words.contains(&normalize_word(word))
    }

    /// Non-eliminated players in turn order.
    pub fn active_player_ids(&self) -> Vec<UserId> {
        self.turn_order
            .iter()
            .copied()
            .filter(|id| self.players.get(id).is_some_and(|p| !p.is_eliminated))
            .collect()
    }

    pub fn active_player_count(&self) -> usize {
        self.active_player_ids().len()
    }

    pub fn current_player_id(&self) -> Option<UserId> {
        let active = self.active_player_ids();
        if active.is_empty() {
            return None;
        }
        Some(active[self.current_turn_index % active.len()])
    }

    pub fn is_game_over(&self) -> bool {
        self.status == GameStatus::Active && self.active_player_count() <= 1
    }

    pub fn winner(&self) -> Option<&Player> {
        let active = self.active_player_ids();
        if active.len() == 1 {
            self.players.get(&active[0])
        } else {
            None
        }
    }

    /// Checks that need nothing but the chain itself: duplicate word, then required start.
    pub fn precheck_word(&self, word: &str) -> Result<(), RejectionKind> {
        if self.is_word_used(word) {
            return Err(RejectionKind::AlreadyUsed);
        }
        if !self.matches_required_start(word) {
            return Err(RejectionKind::WrongStart {
                required: self.required_start().unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Append an accepted word. Does not advance the turn.
    pub fn add_word(&mut self, word: &str, user_id: UserId) {
        let word = normalize_word(word);
        self.chain_words.push(word.clone());
        self.used_words.insert(word.clone());
        if let Some(player) = self.players.get_mut(&user_id) {
            player.words_played += 1;
            let longer = player
                .longest_word
                .as_ref()
                .map_or(true, |w| word.chars().count() > w.chars().count());
            if longer {
                player.longest_word = Some(word.clone());
            }
        }
        self.last_word = Some(word);
    }

    pub fn record_invalid_attempt(&mut self, user_id: UserId) -> Option<u32> {
        let player = self.players.get_mut(&user_id)?;
        player.invalid_attempts += 1;
        Some(player.invalid_attempts)
    }

    /// Move the turn to the next active player. Returns `None` when one or no players
    /// remain, in which case the game must end instead.
    pub fn next_turn(&mut self) -> Option<UserId> {
        let active = self.active_player_ids();
        if active.len() <= 1 {
            return None;
        }
        self.current_turn_index = (self.current_turn_index + 1) % active.len();
        self.turn_started_at = Some(Utc::now());
        self.current_player_id()
    }

    /// Mark a player eliminated and give them the next elimination rank.
    ///
    /// The turn cursor is adjusted so that the remaining players keep their relative
    /// order: if someone before the current player leaves, the current player keeps the
    /// turn; if the current player leaves, the cursor is parked on their predecessor so
    /// that the follow-up [`Game::next_turn`] lands on their successor.
    pub fn eliminate_player(
        &mut self,
        user_id: UserId,
        reason: EliminationReason,
    ) -> Option<&Player> {
        if self.players.get(&user_id).map_or(true, |p| p.is_eliminated) {
            return None;
        }
        let before = self.active_player_ids();
        let position = before.iter().position(|id| *id == user_id)?;
        let current = self.current_turn_index % before.len();
        let remaining = before.len() - 1;

        self.current_turn_index = if remaining == 0 {
            0
        } else if position < current {
            current - 1
        } else if position == current {
            (position + remaining - 1) % remaining
        } else {
            current
        };

        self.elimination_counter += 1;
        let rank = self.elimination_counter;
        let player = self.players.get_mut(&user_id)?;
        player.is_eliminated = true;
        player.elimination_rank = Some(rank);
        player.eliminated_by = Some(reason);
        Some(player)
    }

    /// Start a fresh chain. Used words stay forbidden for the rest of the session.
    pub fn reset_chain(&mut self) {
        self.chain_reset_count += 1;
        self.chain_number += 1;
        self.chain_words.clear();
        self.last_word = None;
    }

    /// Total words accepted across every chain of this session.
    pub fn total_words(&self) -> usize {
        self.used_words.len()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let current = self.current_player_id();
        GameSnapshot {
            id: self.id,
            status: self.status,
            mode: self.mode,
            turn_seconds: self.turn_seconds,
            last_word: self.last_word.clone(),
            required_start: self.required_start(),
            chain_length: self.chain_words.len(),
            current_player: current,
            players: self
                .players_in_turn_order()
                .map(|p| SnapshotPlayer {
                    user_id: p.user_id,
                    display_name: p.display_name.clone(),
                    is_eliminated: p.is_eliminated,
                    is_current: self.status == GameStatus::Active && Some(p.user_id) == current,
                })
                .collect(),
        }
    }
}

/// Read-only view of a game for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    pub id: GameId,
    pub status: GameStatus,
    pub mode: GameMode,
    pub turn_seconds: u32,
    pub last_word: Option<String>,
    pub required_start: Option<String>,
    pub chain_length: usize,
    pub current_player: Option<UserId>,
    pub players: Vec<SnapshotPlayer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPlayer {
    pub user_id: UserId,
    pub display_name: String,
    pub is_eliminated: bool,
    pub is_current: bool,
}

impl fmt::Display for GameSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Game {} [{}] mode={} timer={}s",
            self.id, self.status, self.mode, self.turn_seconds
        )?;
        if self.status == GameStatus::Active {
            writeln!(
                f,
                "Last word: {} | chain: {}",
                self.last_word.as_deref().unwrap_or("-"),
                self.chain_length
            )?;
        }
        for (idx, p) in self.players.iter().enumerate() {
            let marker = if p.is_eliminated {
                " (out)"
            } else if p.is_current {
                " <- turn"
            } else {
                ""
            };
            writeln!(f, "{}. {}{}", idx + 1, p.display_name, marker)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: UserId) -> Member {
        Member::new(id, format!("user{id}"), format!("User {id}"))
    }

    fn active_game(mode: GameMode, ids: &[UserId]) -> Game {
        let mut game = Game::new(GameId(1), 10, 20, &member(ids[0]), mode, 30, "en");
        for id in &ids[1..] {
            game.add_player(&member(*id));
        }
        game.start();
        game
    }

    #[test]
    fn required_start_uses_trailing_letters() {
        let mut game = active_game(GameMode::Hard, &[1, 2]);
        assert_eq!(game.required_start(), None);
        assert!(game.matches_required_start("anything"));

        game.add_word("Running", 1);
        assert_eq!(game.required_start().as_deref(), Some("ng"));
        assert!(game.matches_required_start("nguyen"));
        assert!(game.matches_required_start("NGUYEN"));
        assert!(!game.matches_required_start("cat"));

        let mut normal = active_game(GameMode::Normal, &[1, 2]);
        normal.add_word("apple", 1);
        assert_eq!(normal.required_start().as_deref(), Some("e"));
    }

    #[test]
    fn required_start_is_char_based() {
        let mut game = active_game(GameMode::Hard, &[1, 2]);
        game.add_word("café", 1);
        assert_eq!(game.required_start().as_deref(), Some("fé"));
    }

    #[test]
    fn used_words_are_case_insensitive_and_survive_resets() {
        let mut game = active_game(GameMode::Normal, &[1, 2]);
        game.add_word("Apple", 1);
        assert!(game.is_word_used("APPLE"));
        game.reset_chain();
        assert!(game.chain_words.is_empty());
        assert_eq!(game.last_word, None);
        assert!(game.is_word_used("apple"));
        assert_eq!(game.precheck_word("apple"), Err(RejectionKind::AlreadyUsed));
    }

    #[test]
    fn precheck_reports_wrong_start() {
        let mut game = active_game(GameMode::Normal, &[1, 2]);
        game.add_word("tiger", 1);
        assert_eq!(
            game.precheck_word("cat"),
            Err(RejectionKind::WrongStart {
                required: "r".into()
            })
        );
        assert_eq!(game.precheck_word("rabbit"), Ok(()));
    }

    #[test]
    fn next_turn_rotates_and_stops_at_one_player() {
        let mut game = active_game(GameMode::Normal, &[1, 2, 3]);
        assert_eq!(game.current_player_id(), Some(1));
        assert_eq!(game.next_turn(), Some(2));
        assert_eq!(game.next_turn(), Some(3));
        assert_eq!(game.next_turn(), Some(1));

        game.eliminate_player(2, EliminationReason::Forfeit);
        game.eliminate_player(3, EliminationReason::Forfeit);
        assert_eq!(game.next_turn(), None);
        assert!(game.is_game_over());
        assert_eq!(game.winner().map(|p| p.user_id), Some(1));
    }

    #[test]
    fn eliminating_current_player_hands_turn_to_successor() {
        let mut game = active_game(GameMode::Normal, &[1, 2, 3]);
        game.add_word("word", 1);
        assert_eq!(game.next_turn(), Some(2));

        let rank = game
            .eliminate_player(2, EliminationReason::Timeout)
            .and_then(|p| p.elimination_rank);
        assert_eq!(rank, Some(1));
        game.reset_chain();
        assert_eq!(game.next_turn(), Some(3));
        assert!(game.chain_words.is_empty());
    }

    #[test]
    fn eliminating_last_in_order_wraps_to_first() {
        let mut game = active_game(GameMode::Normal, &[1, 2, 3]);
        game.next_turn();
        game.next_turn();
        assert_eq!(game.current_player_id(), Some(3));
        game.eliminate_player(3, EliminationReason::Timeout);
        assert_eq!(game.next_turn(), Some(1));
    }

    #[test]
    fn eliminating_earlier_player_keeps_current_turn() {
        let mut game = active_game(GameMode::Normal, &[1, 2, 3, 4]);
        game.next_turn();
        game.next_turn();
        assert_eq!(game.current_player_id(), Some(3));
        game.eliminate_player(1, EliminationReason::Forfeit);
        assert_eq!(game.current_player_id(), Some(3));
        game.eliminate_player(4, EliminationReason::Forfeit);
        assert_eq!(game.current_player_id(), Some(3));
    }

    #[test]
    fn current_player_is_never_eliminated() {
        let mut game = active_game(GameMode::Normal, &[1, 2, 3, 4, 5]);
        let order = [3, 1, 5, 2];
        for (step, victim) in order.iter().enumerate() {
            game.next_turn();
            game.eliminate_player(*victim, EliminationReason::Forfeit);
            let current = game.current_player_id().expect("someone remains");
            assert!(
                !game.players[&current].is_eliminated,
                "step {step}: current player {current} is eliminated"
            );
        }
    }

    #[test]
    fn elimination_ranks_increase_and_are_not_reused() {
        let mut game = active_game(GameMode::Normal, &[1, 2, 3, 4]);
        assert!(game.eliminate_player(2, EliminationReason::Timeout).is_some());
        assert!(game.eliminate_player(2, EliminationReason::Timeout).is_none());
        assert!(game.eliminate_player(99, EliminationReason::Timeout).is_none());
        game.eliminate_player(4, EliminationReason::Forfeit);
        game.eliminate_player(1, EliminationReason::Timeout);
        let mut ranks: Vec<u32> = game
            .players
            .values()
            .filter_map(|p| p.elimination_rank)
            .collect();
        ranks.sort();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(game.elimination_counter, 3);
    }

    #[test]
    fn remove_player_renumbers_turn_order() {
        let mut game = Game::new(GameId(7), 1, 1, &member(1), GameMode::Normal, 30, "en");
        game.add_player(&member(2));
        game.add_player(&member(3));
        assert!(game.remove_player(2).is_some());
        assert_eq!(game.turn_order, vec![1, 3]);
        assert_eq!(game.players[&3].turn_order, 1);

        game.start();
        assert!(game.remove_player(3).is_none());
    }

    #[test]
    fn longest_word_tracks_strictly_longer_words() {
        let mut game = active_game(GameMode::Normal, &[1, 2]);
        game.add_word("tree", 1);
        game.add_word("echo", 1);
        assert_eq!(game.players[&1].longest_word.as_deref(), Some("tree"));
        game.add_word("orchestra", 1);
        assert_eq!(game.players[&1].longest_word.as_deref(), Some("orchestra"));
        assert_eq!(game.players[&1].words_played, 3);
    }

    #[test]
    fn game_mode_parses_loosely() {
        assert_eq!("HARD".parse::<GameMode>(), Ok(GameMode::Hard));
        assert_eq!("n".parse::<GameMode>(), Ok(GameMode::Normal));
        assert!("extreme".parse::<GameMode>().is_err());
    }
}
