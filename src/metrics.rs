//! In-process counters for game lifecycle and word validation traffic.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

static GAMES_CREATED: AtomicU64 = AtomicU64::new(0);
static GAMES_STARTED: AtomicU64 = AtomicU64::new(0);
static GAMES_FINISHED: AtomicU64 = AtomicU64::new(0);
static GAMES_CANCELLED: AtomicU64 = AtomicU64::new(0);
static WORDS_ACCEPTED: AtomicU64 = AtomicU64::new(0);
static ELIMINATIONS: AtomicU64 = AtomicU64::new(0);
static CACHE_HITS: AtomicU64 = AtomicU64::new(0);
static CACHE_MISSES: AtomicU64 = AtomicU64::new(0);
static PROVIDER_LATENCY_SUM_MS: AtomicU64 = AtomicU64::new(0);
static PROVIDER_LATENCY_COUNT: AtomicU64 = AtomicU64::new(0);

static REJECTIONS: OnceLock<Mutex<HashMap<&'static str, u64>>> = OnceLock::new();

pub fn inc_games_created() {
    GAMES_CREATED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_games_started() {
    GAMES_STARTED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_games_finished() {
    GAMES_FINISHED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_games_cancelled() {
    GAMES_CANCELLED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_words_accepted() {
    WORDS_ACCEPTED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_eliminations() {
    ELIMINATIONS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_cache_hit() {
    CACHE_HITS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_cache_miss() {
    CACHE_MISSES.fetch_add(1, Ordering::Relaxed);
}

pub fn observe_provider_latency(started: Instant) {
    let ms = started.elapsed().as_millis() as u64;
    PROVIDER_LATENCY_SUM_MS.fetch_add(ms, Ordering::Relaxed);
    PROVIDER_LATENCY_COUNT.fetch_add(1, Ordering::Relaxed);
}

fn rejection_lock() -> &'static Mutex<HashMap<&'static str, u64>> {
    REJECTIONS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Count a rejected submission under `kind` ("already_used", "plural", ...).
pub fn record_rejection(kind: &'static str) -> u64 {
    let mut guard = match rejection_lock().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let count = guard.entry(kind).or_default();
    *count = count.saturating_add(1);
    *count
}

pub fn rejections_snapshot() -> HashMap<&'static str, u64> {
    match rejection_lock().lock() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    pub games_created: u64,
    pub games_started: u64,
    pub games_finished: u64,
    pub games_cancelled: u64,
    pub words_accepted: u64,
    pub words_rejected: u64,
    pub eliminations: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub provider_latency_avg_ms: Option<u64>,
}

pub fn snapshot() -> Snapshot {
    let sum = PROVIDER_LATENCY_SUM_MS.load(Ordering::Relaxed);
    let count = PROVIDER_LATENCY_COUNT.load(Ordering::Relaxed);
    Snapshot {
        games_created: GAMES_CREATED.load(Ordering::Relaxed),
        games_started: GAMES_STARTED.load(Ordering::Relaxed),
        games_finished: GAMES_FINISHED.load(Ordering::Relaxed),
        games_cancelled: GAMES_CANCELLED.load(Ordering::Relaxed),
        words_accepted: WORDS_ACCEPTED.load(Ordering::Relaxed),
        words_rejected: rejections_snapshot().values().sum(),
        eliminations: ELIMINATIONS.load(Ordering::Relaxed),
        cache_hits: CACHE_HITS.load(Ordering::Relaxed),
        cache_misses: CACHE_MISSES.load(Ordering::Relaxed),
        provider_latency_avg_ms: if count > 0 { Some(sum / count) } else { None },
    }
}
