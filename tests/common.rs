//! Test utilities & fixtures: a throwaway sled store, a scripted validator and a sink
//! that records every published event.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use wordchain::game::state::{ChannelId, GuildId, UserId};
use wordchain::game::{
    CoordinatorSettings, GameCoordinator, GameEvent, Member, NotificationSink, PartyOptions,
};
use wordchain::storage::SledStore;
use wordchain::validator::{ValidationResult, WordValidator};

pub const GUILD: GuildId = 100;
pub const CHANNEL: ChannelId = 200;

/// Accepts every word except the scripted invalid ones and flags scripted plurals.
#[derive(Default)]
pub struct FakeValidator {
    invalid: HashSet<String>,
    plurals: HashSet<String>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl FakeValidator {
    pub fn new(invalid: &[&str], plurals: &[&str]) -> Self {
        Self {
            invalid: invalid.iter().map(|w| w.to_string()).collect(),
            plurals: plurals.iter().map(|w| w.to_string()).collect(),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Answer only after `delay`, like a slow upstream lookup.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WordValidator for FakeValidator {
    async fn validate(&self, word: &str, _language: &str) -> ValidationResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.invalid.contains(word) {
            ValidationResult::not_a_word(word, "not in the test dictionary")
        } else {
            ValidationResult::word(word, self.plurals.contains(word), Some("noun".into()))
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(ChannelId, GameEvent)>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<GameEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&GameEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

impl NotificationSink for RecordingSink {
    fn publish(&self, channel: ChannelId, event: GameEvent) {
        self.events.lock().unwrap().push((channel, event));
    }
}

pub struct Harness {
    pub coordinator: GameCoordinator,
    pub store: Arc<SledStore>,
    pub validator: Arc<FakeValidator>,
    pub sink: Arc<RecordingSink>,
    _dir: TempDir,
}

pub fn settings() -> CoordinatorSettings {
    CoordinatorSettings {
        min_players: 2,
        max_players: 10,
        default_turn_seconds: 30,
        turn_second_options: vec![30, 45, 60],
        update_interval_seconds: 3,
        default_language: "en".into(),
    }
}

pub fn harness() -> Harness {
    harness_with(settings(), FakeValidator::default())
}

/// Must be called from inside a tokio runtime.
pub fn harness_with(settings: CoordinatorSettings, validator: FakeValidator) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(SledStore::open(dir.path().join("db")).expect("open store"));
    let validator = Arc::new(validator);
    let sink = Arc::new(RecordingSink::default());
    let coordinator = GameCoordinator::new(settings, store.clone(), validator.clone(), sink.clone());
    Harness {
        coordinator,
        store,
        validator,
        sink,
        _dir: dir,
    }
}

pub fn member(id: UserId) -> Member {
    Member::new(id, format!("user{id}"), format!("Player {id}"))
}

/// Create a party in [`CHANNEL`] with `ids[0]` as creator, join the rest and start it.
pub async fn start_game(h: &Harness, ids: &[UserId], options: PartyOptions) {
    h.coordinator
        .create(GUILD, CHANNEL, member(ids[0]), options)
        .await
        .expect("create");
    for id in &ids[1..] {
        h.coordinator.join(CHANNEL, member(*id)).await.expect("join");
    }
    h.coordinator.start(CHANNEL, ids[0]).await.expect("start");
}
