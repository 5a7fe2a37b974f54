//! Persisted record types. Everything is keyed by the game's persistent id, never by channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::state::{
    ChannelId, EliminationReason, Game, GameId, GameMode, GameStatus, GuildId, Player, UserId,
};

pub const GAME_SCHEMA_VERSION: u8 = 1;
pub const PARTICIPANT_SCHEMA_VERSION: u8 = 1;
pub const STATS_SCHEMA_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameId,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub creator_id: UserId,
    pub mode: GameMode,
    pub turn_seconds: u32,
    pub language: String,
    pub status: GameStatus,
    pub winner_id: Option<UserId>,
    pub total_words: u32,
    pub chain_resets: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub schema_version: u8,
}

impl GameRecord {
    pub fn from_game(game: &Game) -> Self {
        Self {
            id: game.id,
            guild_id: game.guild_id,
            channel_id: game.channel_id,
            creator_id: game.creator_id,
            mode: game.mode,
            turn_seconds: game.turn_seconds,
            language: game.language.clone(),
            status: game.status,
            winner_id: None,
            total_words: game.total_words() as u32,
            chain_resets: game.chain_reset_count,
            created_at: game.created_at,
            started_at: game.started_at,
            ended_at: None,
            schema_version: GAME_SCHEMA_VERSION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub game_id: GameId,
    pub user_id: UserId,
    pub username: String,
    pub display_name: String,
    pub turn_order: u32,
    pub words_played: u32,
    pub invalid_attempts: u32,
    pub is_eliminated: bool,
    pub elimination_rank: Option<u32>,
    pub eliminated_by: Option<EliminationReason>,
    pub longest_word: Option<String>,
    pub schema_version: u8,
}

impl ParticipantRecord {
    pub fn from_player(game_id: GameId, player: &Player) -> Self {
        Self {
            game_id,
            user_id: player.user_id,
            username: player.username.clone(),
            display_name: player.display_name.clone(),
            turn_order: player.turn_order as u32,
            words_played: player.words_played,
            invalid_attempts: player.invalid_attempts,
            is_eliminated: player.is_eliminated,
            elimination_rank: player.elimination_rank,
            eliminated_by: player.eliminated_by,
            longest_word: player.longest_word.clone(),
            schema_version: PARTICIPANT_SCHEMA_VERSION,
        }
    }
}

/// One accepted word, with its place in the chain it was played in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRecord {
    pub game_id: GameId,
    pub user_id: UserId,
    pub word: String,
    pub chain_number: u32,
    pub position: u32,
    pub played_at: DateTime<Utc>,
}

/// Cached validation verdict for a (word, language) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCacheEntry {
    pub word: String,
    pub language: String,
    pub is_valid: bool,
    pub is_plural: bool,
    pub category: Option<String>,
    pub reason: Option<String>,
    pub validated_at: DateTime<Utc>,
}

/// What one player did in one finished game, as folded into [`PlayerStats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    pub won: bool,
    pub words_played: u32,
    pub invalid_attempts: u32,
    pub timed_out: bool,
    pub longest_word: Option<String>,
}

impl GameResult {
    pub fn for_player(player: &Player, winner: Option<UserId>) -> Self {
        Self {
            won: winner == Some(player.user_id),
            words_played: player.words_played,
            invalid_attempts: player.invalid_attempts,
            timed_out: player.eliminated_by == Some(EliminationReason::Timeout),
            longest_word: player.longest_word.clone(),
        }
    }
}

/// Aggregate counters for a user within one guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub user_id: UserId,
    pub guild_id: GuildId,
    pub username: String,
    pub games_played: u32,
    pub games_won: u32,
    pub total_words: u32,
    pub total_timeouts: u32,
    pub total_invalid_attempts: u32,
    pub longest_word: Option<String>,
    pub current_win_streak: u32,
    pub best_win_streak: u32,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl PlayerStats {
    pub fn new(guild_id: GuildId, user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            guild_id,
            username: username.into(),
            games_played: 0,
            games_won: 0,
            total_words: 0,
            total_timeouts: 0,
            total_invalid_attempts: 0,
            longest_word: None,
            current_win_streak: 0,
            best_win_streak: 0,
            updated_at: Utc::now(),
            schema_version: STATS_SCHEMA_VERSION,
        }
    }

    pub fn apply(&mut self, result: &GameResult) {
        self.games_played += 1;
        self.total_words += result.words_played;
        self.total_invalid_attempts += result.invalid_attempts;
        if result.timed_out {
            self.total_timeouts += 1;
        }
        if result.won {
            self.games_won += 1;
            self.current_win_streak += 1;
            self.best_win_streak = self.best_win_streak.max(self.current_win_streak);
        } else {
            self.current_win_streak = 0;
        }
        if let Some(word) = &result.longest_word {
            let longer = self
                .longest_word
                .as_ref()
                .map_or(true, |w| word.chars().count() > w.chars().count());
            if longer {
                self.longest_word = Some(word.clone());
            }
        }
        self.updated_at = Utc::now();
    }

    pub fn win_rate(&self) -> f64 {
        if self.games_played == 0 {
            0.0
        } else {
            self.games_won as f64 / self.games_played as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(won: bool, timed_out: bool, longest: Option<&str>) -> GameResult {
        GameResult {
            won,
            words_played: 3,
            invalid_attempts: 1,
            timed_out,
            longest_word: longest.map(str::to_string),
        }
    }

    #[test]
    fn streaks_track_running_maximum() {
        let mut stats = PlayerStats::new(1, 2, "alice");
        stats.apply(&result(true, false, None));
        stats.apply(&result(true, false, None));
        stats.apply(&result(false, true, None));
        stats.apply(&result(true, false, None));
        assert_eq!(stats.games_played, 4);
        assert_eq!(stats.games_won, 3);
        assert_eq!(stats.current_win_streak, 1);
        assert_eq!(stats.best_win_streak, 2);
        assert_eq!(stats.total_timeouts, 1);
        assert_eq!(stats.total_words, 12);
        assert_eq!(stats.total_invalid_attempts, 4);
        assert!((stats.win_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn longest_word_only_grows() {
        let mut stats = PlayerStats::new(1, 2, "alice");
        stats.apply(&result(false, false, Some("elephant")));
        stats.apply(&result(false, false, Some("tigers")));
        stats.apply(&result(false, false, Some("squirrel")));
        assert_eq!(stats.longest_word.as_deref(), Some("elephant"));
        stats.apply(&result(false, false, Some("hippopotamus")));
        assert_eq!(stats.longest_word.as_deref(), Some("hippopotamus"));
    }
}
