//! Word validation: one async capability with interchangeable backends.
//!
//! The game only ever sees [`WordValidator`]. At startup [`build_validator`] picks the
//! dictionary or language-model backend from configuration and wraps it in a
//! [`CachedValidator`] backed by the sled word cache. Backends never return errors;
//! transport and parse failures come back as `valid = false` with a reason.

pub mod dictionary;
pub mod llm;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::{debug, info, warn};

use crate::config::{ValidatorConfig, ValidatorProvider};
use crate::logutil::escape_log;
use crate::metrics;
use crate::storage::records::WordCacheEntry;
use crate::storage::WordCacheStore;

pub use dictionary::DictionaryValidator;
pub use llm::LlmValidator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub word: String,
    pub valid: bool,
    pub plural: bool,
    /// Part of speech when the provider reports one.
    pub category: Option<String>,
    pub reason: Option<String>,
    pub served_from_cache: bool,
    /// Set when the provider could not be reached. Such verdicts are not cached.
    pub transient: bool,
}

impl ValidationResult {
    pub fn word(word: &str, plural: bool, category: Option<String>) -> Self {
        Self {
            word: word.to_string(),
            valid: true,
            plural,
            category,
            reason: None,
            served_from_cache: false,
            transient: false,
        }
    }

    pub fn not_a_word(word: &str, reason: impl Into<String>) -> Self {
        Self {
            word: word.to_string(),
            valid: false,
            plural: false,
            category: None,
            reason: Some(reason.into()),
            served_from_cache: false,
            transient: false,
        }
    }

    /// The provider failed; the word is treated as invalid for this attempt only.
    pub fn unavailable(word: &str, reason: impl Into<String>) -> Self {
        Self {
            transient: true,
            ..Self::not_a_word(word, reason)
        }
    }

    pub fn is_acceptable(&self) -> bool {
        self.valid && !self.plural
    }

    fn from_cache(entry: WordCacheEntry) -> Self {
        Self {
            word: entry.word,
            valid: entry.is_valid,
            plural: entry.is_plural,
            category: entry.category,
            reason: entry.reason,
            served_from_cache: true,
            transient: false,
        }
    }
}

#[async_trait]
pub trait WordValidator: Send + Sync {
    /// Judge `word` (already lowercased) in `language`. Must not fail: problems are
    /// reported as an invalid verdict with a reason.
    async fn validate(&self, word: &str, language: &str) -> ValidationResult;
}

/// Read-through cache in front of a provider. Entries older than the TTL count as
/// misses and are overwritten by the fresh verdict.
pub struct CachedValidator {
    provider: Arc<dyn WordValidator>,
    cache: Arc<dyn WordCacheStore>,
    ttl: Duration,
}

impl CachedValidator {
    pub fn new(
        provider: Arc<dyn WordValidator>,
        cache: Arc<dyn WordCacheStore>,
        ttl_days: u32,
    ) -> Self {
        Self {
            provider,
            cache,
            ttl: Duration::days(ttl_days as i64),
        }
    }

    fn lookup(&self, word: &str, language: &str) -> Option<ValidationResult> {
        match self.cache.cached_verdict(word, language) {
            Ok(Some(entry)) if Utc::now() - entry.validated_at < self.ttl => {
                Some(ValidationResult::from_cache(entry))
            }
            Ok(Some(_)) => {
                debug!("cached verdict for '{}' is stale", escape_log(word));
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("word cache read failed for '{}': {}", escape_log(word), e);
                None
            }
        }
    }

    fn remember(&self, language: &str, result: &ValidationResult) {
        let entry = WordCacheEntry {
            word: result.word.clone(),
            language: language.to_string(),
            is_valid: result.valid,
            is_plural: result.plural,
            category: result.category.clone(),
            reason: result.reason.clone(),
            validated_at: Utc::now(),
        };
        if let Err(e) = self.cache.store_verdict(&entry) {
            warn!(
                "failed to cache verdict for '{}': {}",
                escape_log(&result.word),
                e
            );
        }
    }
}

#[async_trait]
impl WordValidator for CachedValidator {
    async fn validate(&self, word: &str, language: &str) -> ValidationResult {
        let word = word.trim().to_lowercase();
        if let Some(hit) = self.lookup(&word, language) {
            metrics::inc_cache_hit();
            debug!("cache hit for '{}' ({})", escape_log(&word), language);
            return hit;
        }
        metrics::inc_cache_miss();

        let started = Instant::now();
        let result = self.provider.validate(&word, language).await;
        metrics::observe_provider_latency(started);

        if !result.transient {
            self.remember(language, &result);
        }
        result
    }
}

/// Select the configured backend and put the cache in front of it.
pub fn build_validator(
    config: &ValidatorConfig,
    cache: Arc<dyn WordCacheStore>,
) -> Arc<dyn WordValidator> {
    let provider: Arc<dyn WordValidator> = match config.provider {
        ValidatorProvider::Dictionary => {
            info!("word validation via dictionary at {}", config.dictionary_url);
            Arc::new(DictionaryValidator::new(
                config.dictionary_url.clone(),
                config.timeout_seconds,
            ))
        }
        ValidatorProvider::Llm => {
            info!(
                "word validation via {:?} model {}",
                config.llm.vendor, config.llm.model
            );
            Arc::new(LlmValidator::new(config.llm.clone(), config.timeout_seconds))
        }
    };
    Arc::new(CachedValidator::new(provider, cache, config.cache_ttl_days))
}
