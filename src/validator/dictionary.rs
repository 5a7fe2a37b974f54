//! Free dictionary lookup backend.
//!
//! `GET {base}/{language}/{word}`: 200 with entries means a real word, 404 means it is
//! not in the dictionary. Anything else is treated as an outage.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use tokio::time::timeout;

use super::{ValidationResult, WordValidator};
use crate::logutil::escape_log;

/// Plurals the definition text rarely marks as such.
const IRREGULAR_PLURALS: &[&str] = &[
    "children", "men", "women", "feet", "teeth", "geese", "mice", "lice", "people", "oxen",
    "sheep", "deer", "fish", "species", "aircraft", "series", "means", "pants", "scissors",
    "glasses", "trousers",
];

#[derive(Debug, Deserialize)]
pub struct DictionaryEntry {
    #[serde(default)]
    pub meanings: Vec<Meaning>,
}

#[derive(Debug, Deserialize)]
pub struct Meaning {
    #[serde(default, rename = "partOfSpeech")]
    pub part_of_speech: Option<String>,
    #[serde(default)]
    pub definitions: Vec<Definition>,
}

#[derive(Debug, Deserialize)]
pub struct Definition {
    #[serde(default)]
    pub definition: String,
}

enum Lookup {
    Found(Vec<DictionaryEntry>),
    NotFound,
}

pub struct DictionaryValidator {
    base_url: String,
    timeout_seconds: u64,
    client: reqwest::Client,
}

impl DictionaryValidator {
    pub fn new(base_url: impl Into<String>, timeout_seconds: u64) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_seconds,
            client: reqwest::Client::new(),
        }
    }

    pub fn build_url(&self, word: &str, language: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(language),
            urlencoding::encode(word)
        )
    }

    async fn lookup(&self, word: &str, language: &str) -> Result<Lookup> {
        let url = self.build_url(word, language);
        debug!("Dictionary lookup: {}", url);

        let request = self.client.get(&url);
        let timeout_duration = Duration::from_secs(self.timeout_seconds);
        let response = timeout(timeout_duration, request.send())
            .await
            .map_err(|_| anyhow!("Request timeout after {}s", self.timeout_seconds))?
            .map_err(|e| anyhow!("HTTP request failed: {}", e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Lookup::NotFound);
        }
        if !response.status().is_success() {
            return Err(anyhow!("dictionary returned status {}", response.status()));
        }

        let entries: Vec<DictionaryEntry> = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse JSON response: {}", e))?;
        Ok(Lookup::Found(entries))
    }
}

/// Part of speech of the first meaning, and whether any definition marks the word as a
/// plural form. Nouns on the irregular list count as plural too.
pub fn classify(word: &str, entries: &[DictionaryEntry]) -> (Option<String>, bool) {
    let Some(first) = entries.first() else {
        return (None, false);
    };
    let category = first
        .meanings
        .iter()
        .find_map(|m| m.part_of_speech.as_deref().filter(|p| !p.is_empty()))
        .map(str::to_lowercase);

    let marked_plural = first.meanings.iter().any(|m| {
        m.definitions.iter().any(|d| {
            let text = d.definition.to_lowercase();
            text.contains("plural of") || text.contains("plural form")
        })
    });
    let irregular =
        category.as_deref() == Some("noun") && IRREGULAR_PLURALS.contains(&word.to_lowercase().as_str());

    (category, marked_plural || irregular)
}

#[async_trait]
impl WordValidator for DictionaryValidator {
    async fn validate(&self, word: &str, language: &str) -> ValidationResult {
        match self.lookup(word, language).await {
            Ok(Lookup::Found(entries)) if !entries.is_empty() => {
                let (category, plural) = classify(word, &entries);
                ValidationResult::word(word, plural, category)
            }
            Ok(_) => ValidationResult::not_a_word(
                word,
                format!("'{}' is not in the dictionary", word),
            ),
            Err(e) => {
                warn!("Dictionary lookup for '{}' failed: {}", escape_log(word), e);
                ValidationResult::unavailable(word, format!("could not verify word: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Vec<DictionaryEntry> {
        serde_json::from_str(json).expect("fixture parses")
    }

    #[test]
    fn plain_noun_is_not_plural() {
        let entries = parse(
            r#"[{"word":"apple","meanings":[{"partOfSpeech":"noun","definitions":[{"definition":"A common, round fruit."}]}]}]"#,
        );
        assert_eq!(classify("apple", &entries), (Some("noun".to_string()), false));
    }

    #[test]
    fn plural_marker_in_definition() {
        let entries = parse(
            r#"[{"meanings":[{"partOfSpeech":"noun","definitions":[{"definition":"Plural of cat"}]}]}]"#,
        );
        assert!(classify("cats", &entries).1);
    }

    #[test]
    fn irregular_plural_nouns() {
        let entries = parse(
            r#"[{"meanings":[{"partOfSpeech":"noun","definitions":[{"definition":"Young human beings."}]}]}]"#,
        );
        assert!(classify("Children", &entries).1);

        let verb = parse(
            r#"[{"meanings":[{"partOfSpeech":"verb","definitions":[{"definition":"To catch fish."}]}]}]"#,
        );
        assert_eq!(classify("fish", &verb), (Some("verb".to_string()), false));
    }

    #[test]
    fn missing_fields_are_tolerated() {
        let entries = parse(r#"[{"word":"odd"}]"#);
        assert_eq!(classify("odd", &entries), (None, false));
        assert_eq!(classify("odd", &[]), (None, false));
    }

    #[test]
    fn url_is_encoded() {
        let validator = DictionaryValidator::new("https://example.test/entries/", 5);
        assert_eq!(
            validator.build_url("café", "fr"),
            "https://example.test/entries/fr/caf%C3%A9"
        );
    }
}
