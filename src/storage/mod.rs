//! # Storage - game history, player statistics and the word cache
//!
//! Durable state lives in a single sled database with one tree per record family:
//!
//! ```text
//! data/wordchain.db
//! ├── games         ← GameRecord keyed by game id
//! ├── participants  ← ParticipantRecord keyed by (game id, user id)
//! ├── words         ← WordRecord keyed by (game id, chain, position)
//! ├── stats         ← PlayerStats keyed by (guild id, user id)
//! └── word_cache    ← WordCacheEntry keyed by (language, word)
//! ```
//!
//! Records are bincode encoded. The in-memory [`crate::game::state::Game`] stays
//! authoritative during play; callers log storage failures and continue.

pub mod errors;
pub mod records;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sled::IVec;

use crate::game::state::{EliminationReason, GameId, GameStatus, GuildId, UserId};
pub use errors::StorageError;
use records::{
    GameRecord, ParticipantRecord, PlayerStats, WordCacheEntry, WordRecord, GAME_SCHEMA_VERSION,
    PARTICIPANT_SCHEMA_VERSION, STATS_SCHEMA_VERSION,
};

const TREE_GAMES: &str = "games";
const TREE_PARTICIPANTS: &str = "participants";
const TREE_WORDS: &str = "words";
const TREE_STATS: &str = "stats";
const TREE_WORD_CACHE: &str = "word_cache";

/// Durable record of games, participants, word history and aggregate stats.
pub trait GameStore: Send + Sync {
    fn next_game_id(&self) -> Result<GameId, StorageError>;
    fn create_game(&self, record: &GameRecord) -> Result<(), StorageError>;
    fn get_game(&self, id: GameId) -> Result<Option<GameRecord>, StorageError>;
    fn mark_started(&self, id: GameId, at: DateTime<Utc>) -> Result<(), StorageError>;
    fn mark_finished(
        &self,
        id: GameId,
        winner: Option<UserId>,
        total_words: u32,
        chain_resets: u32,
    ) -> Result<(), StorageError>;
    /// Drop a game and everything recorded under it.
    fn delete_game(&self, id: GameId) -> Result<(), StorageError>;

    fn add_participant(&self, record: &ParticipantRecord) -> Result<(), StorageError>;
    fn remove_participant(&self, game: GameId, user: UserId) -> Result<(), StorageError>;
    fn participants(&self, game: GameId) -> Result<Vec<ParticipantRecord>, StorageError>;
    fn update_participant_counters(
        &self,
        game: GameId,
        user: UserId,
        words_played: u32,
        invalid_attempts: u32,
        longest_word: Option<&str>,
    ) -> Result<(), StorageError>;
    fn mark_eliminated(
        &self,
        game: GameId,
        user: UserId,
        rank: u32,
        reason: EliminationReason,
    ) -> Result<(), StorageError>;

    fn record_word(&self, record: &WordRecord) -> Result<(), StorageError>;
    fn words(&self, game: GameId) -> Result<Vec<WordRecord>, StorageError>;

    fn player_stats(&self, guild: GuildId, user: UserId)
        -> Result<Option<PlayerStats>, StorageError>;
    fn upsert_player_stats(&self, stats: &PlayerStats) -> Result<(), StorageError>;
}

/// Last known validation verdict per (word, language). Freshness is decided by the reader.
pub trait WordCacheStore: Send + Sync {
    fn cached_verdict(
        &self,
        word: &str,
        language: &str,
    ) -> Result<Option<WordCacheEntry>, StorageError>;
    fn store_verdict(&self, entry: &WordCacheEntry) -> Result<(), StorageError>;
}

/// Helper builder so tests can create throwaway stores with custom paths.
pub struct SledStoreBuilder {
    path: PathBuf,
    temporary: bool,
}

impl SledStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temporary: false,
        }
    }

    /// Remove the database files when the store is dropped.
    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    pub fn open(self) -> Result<SledStore, StorageError> {
        SledStore::open_with_options(self.path, self.temporary)
    }
}

pub struct SledStore {
    db: sled::Db,
    games: sled::Tree,
    participants: sled::Tree,
    words: sled::Tree,
    stats: sled::Tree,
    word_cache: sled::Tree,
}

impl SledStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        Self::open_with_options(path, false)
    }

    fn open_with_options<P: AsRef<Path>>(path: P, temporary: bool) -> Result<Self, StorageError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::Config::new()
            .path(path_ref)
            .temporary(temporary)
            .open()?;
        Ok(Self {
            games: db.open_tree(TREE_GAMES)?,
            participants: db.open_tree(TREE_PARTICIPANTS)?,
            words: db.open_tree(TREE_WORDS)?,
            stats: db.open_tree(TREE_STATS)?,
            word_cache: db.open_tree(TREE_WORD_CACHE)?,
            db,
        })
    }

    fn game_key(id: GameId) -> Vec<u8> {
        format!("{:020}", id.0).into_bytes()
    }

    fn game_prefix(id: GameId) -> Vec<u8> {
        format!("{:020}:", id.0).into_bytes()
    }

    fn participant_key(game: GameId, user: UserId) -> Vec<u8> {
        format!("{:020}:{:020}", game.0, user).into_bytes()
    }

    fn word_key(record: &WordRecord) -> Vec<u8> {
        format!(
            "{:020}:{:010}:{:010}",
            record.game_id.0, record.chain_number, record.position
        )
        .into_bytes()
    }

    fn stats_key(guild: GuildId, user: UserId) -> Vec<u8> {
        format!("{:020}:{:020}", guild, user).into_bytes()
    }

    fn cache_key(word: &str, language: &str) -> Vec<u8> {
        format!(
            "{}:{}",
            language.to_ascii_lowercase(),
            word.trim().to_lowercase()
        )
        .into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, StorageError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    fn check_schema(entity: &'static str, expected: u8, found: u8) -> Result<(), StorageError> {
        if expected != found {
            return Err(StorageError::SchemaMismatch {
                entity,
                expected,
                found,
            });
        }
        Ok(())
    }

    fn put_game(&self, record: &GameRecord) -> Result<(), StorageError> {
        self.games
            .insert(Self::game_key(record.id), Self::serialize(record)?)?;
        self.games.flush()?;
        Ok(())
    }

    fn require_game(&self, id: GameId) -> Result<GameRecord, StorageError> {
        self.get_game(id)?
            .ok_or_else(|| StorageError::NotFound(format!("game {}", id)))
    }

    fn require_participant(
        &self,
        game: GameId,
        user: UserId,
    ) -> Result<ParticipantRecord, StorageError> {
        let Some(bytes) = self.participants.get(Self::participant_key(game, user))? else {
            return Err(StorageError::NotFound(format!(
                "participant {} in game {}",
                user, game
            )));
        };
        let record: ParticipantRecord = Self::deserialize(bytes)?;
        Self::check_schema(
            "participant",
            PARTICIPANT_SCHEMA_VERSION,
            record.schema_version,
        )?;
        Ok(record)
    }

    fn put_participant(&self, record: &ParticipantRecord) -> Result<(), StorageError> {
        self.participants.insert(
            Self::participant_key(record.game_id, record.user_id),
            Self::serialize(record)?,
        )?;
        Ok(())
    }

    fn scan<T: serde::de::DeserializeOwned>(
        tree: &sled::Tree,
        prefix: &[u8],
    ) -> Result<Vec<T>, StorageError> {
        tree.scan_prefix(prefix)
            .map(|entry| {
                entry
                    .map_err(StorageError::from)
                    .and_then(|(_key, value)| Self::deserialize(value))
            })
            .collect()
    }

    fn remove_prefix(tree: &sled::Tree, prefix: &[u8]) -> Result<usize, StorageError> {
        let keys: Vec<IVec> = tree
            .scan_prefix(prefix)
            .keys()
            .collect::<Result<_, _>>()?;
        for key in &keys {
            tree.remove(key)?;
        }
        Ok(keys.len())
    }
}

impl GameStore for SledStore {
    fn next_game_id(&self) -> Result<GameId, StorageError> {
        Ok(GameId(self.db.generate_id()? + 1))
    }

    fn create_game(&self, record: &GameRecord) -> Result<(), StorageError> {
        let mut record = record.clone();
        record.schema_version = GAME_SCHEMA_VERSION;
        self.put_game(&record)
    }

    fn get_game(&self, id: GameId) -> Result<Option<GameRecord>, StorageError> {
        let Some(bytes) = self.games.get(Self::game_key(id))? else {
            return Ok(None);
        };
        let record: GameRecord = Self::deserialize(bytes)?;
        Self::check_schema("game", GAME_SCHEMA_VERSION, record.schema_version)?;
        Ok(Some(record))
    }

    fn mark_started(&self, id: GameId, at: DateTime<Utc>) -> Result<(), StorageError> {
        let mut record = self.require_game(id)?;
        record.status = GameStatus::Active;
        record.started_at = Some(at);
        self.put_game(&record)
    }

    fn mark_finished(
        &self,
        id: GameId,
        winner: Option<UserId>,
        total_words: u32,
        chain_resets: u32,
    ) -> Result<(), StorageError> {
        let mut record = self.require_game(id)?;
        record.status = GameStatus::Finished;
        record.winner_id = winner;
        record.total_words = total_words;
        record.chain_resets = chain_resets;
        record.ended_at = Some(Utc::now());
        self.put_game(&record)
    }

    fn delete_game(&self, id: GameId) -> Result<(), StorageError> {
        self.games.remove(Self::game_key(id))?;
        let prefix = Self::game_prefix(id);
        Self::remove_prefix(&self.participants, &prefix)?;
        Self::remove_prefix(&self.words, &prefix)?;
        self.games.flush()?;
        Ok(())
    }

    fn add_participant(&self, record: &ParticipantRecord) -> Result<(), StorageError> {
        let mut record = record.clone();
        record.schema_version = PARTICIPANT_SCHEMA_VERSION;
        self.put_participant(&record)
    }

    fn remove_participant(&self, game: GameId, user: UserId) -> Result<(), StorageError> {
        self.participants
            .remove(Self::participant_key(game, user))?;
        Ok(())
    }

    fn participants(&self, game: GameId) -> Result<Vec<ParticipantRecord>, StorageError> {
        let mut records: Vec<ParticipantRecord> =
            Self::scan(&self.participants, &Self::game_prefix(game))?;
        records.sort_by_key(|r| r.turn_order);
        Ok(records)
    }

    fn update_participant_counters(
        &self,
        game: GameId,
        user: UserId,
        words_played: u32,
        invalid_attempts: u32,
        longest_word: Option<&str>,
    ) -> Result<(), StorageError> {
        let mut record = self.require_participant(game, user)?;
        record.words_played = words_played;
        record.invalid_attempts = invalid_attempts;
        record.longest_word = longest_word.map(str::to_string);
        self.put_participant(&record)
    }

    fn mark_eliminated(
        &self,
        game: GameId,
        user: UserId,
        rank: u32,
        reason: EliminationReason,
    ) -> Result<(), StorageError> {
        let mut record = self.require_participant(game, user)?;
        record.is_eliminated = true;
        record.elimination_rank = Some(rank);
        record.eliminated_by = Some(reason);
        self.put_participant(&record)
    }

    fn record_word(&self, record: &WordRecord) -> Result<(), StorageError> {
        self.words
            .insert(Self::word_key(record), Self::serialize(record)?)?;
        Ok(())
    }

    fn words(&self, game: GameId) -> Result<Vec<WordRecord>, StorageError> {
        Self::scan(&self.words, &Self::game_prefix(game))
    }

    fn player_stats(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> Result<Option<PlayerStats>, StorageError> {
        let Some(bytes) = self.stats.get(Self::stats_key(guild, user))? else {
            return Ok(None);
        };
        let record: PlayerStats = Self::deserialize(bytes)?;
        Self::check_schema("player stats", STATS_SCHEMA_VERSION, record.schema_version)?;
        Ok(Some(record))
    }

    fn upsert_player_stats(&self, stats: &PlayerStats) -> Result<(), StorageError> {
        let mut record = stats.clone();
        record.schema_version = STATS_SCHEMA_VERSION;
        self.stats.insert(
            Self::stats_key(record.guild_id, record.user_id),
            Self::serialize(&record)?,
        )?;
        self.stats.flush()?;
        Ok(())
    }
}

impl WordCacheStore for SledStore {
    fn cached_verdict(
        &self,
        word: &str,
        language: &str,
    ) -> Result<Option<WordCacheEntry>, StorageError> {
        match self.word_cache.get(Self::cache_key(word, language))? {
            Some(bytes) => Ok(Some(Self::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    fn store_verdict(&self, entry: &WordCacheEntry) -> Result<(), StorageError> {
        self.word_cache.insert(
            Self::cache_key(&entry.word, &entry.language),
            Self::serialize(entry)?,
        )?;
        Ok(())
    }
}
