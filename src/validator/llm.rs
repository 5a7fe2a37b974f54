//! Language-model backend. Asks an OpenAI or Anthropic chat endpoint for a JSON verdict.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::timeout;

use super::{ValidationResult, WordValidator};
use crate::config::{LlmConfig, LlmVendor};
use crate::logutil::escape_log;
use crate::validation::language_name;

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 200;

#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub is_plural: bool,
    #[serde(default)]
    pub word_type: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

pub struct LlmValidator {
    config: LlmConfig,
    timeout_seconds: u64,
    client: reqwest::Client,
}

impl LlmValidator {
    pub fn new(config: LlmConfig, timeout_seconds: u64) -> Self {
        Self {
            config,
            timeout_seconds,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> &str {
        match (&self.config.endpoint, self.config.vendor) {
            (Some(url), _) => url.as_str(),
            (None, LlmVendor::OpenAi) => OPENAI_URL,
            (None, LlmVendor::Anthropic) => ANTHROPIC_URL,
        }
    }

    fn request(&self, prompt: &str) -> reqwest::RequestBuilder {
        let builder = self.client.post(self.endpoint());
        match self.config.vendor {
            LlmVendor::OpenAi => builder.bearer_auth(&self.config.api_key).json(&json!({
                "model": self.config.model,
                "temperature": 0.1,
                "max_tokens": MAX_TOKENS,
                "messages": [
                    {"role": "system", "content": "You are a word validation assistant. Always respond with valid JSON."},
                    {"role": "user", "content": prompt},
                ],
            })),
            LlmVendor::Anthropic => builder
                .header("x-api-key", &self.config.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&json!({
                    "model": self.config.model,
                    "max_tokens": MAX_TOKENS,
                    "messages": [{"role": "user", "content": prompt}],
                })),
        }
    }

    async fn ask(&self, prompt: &str) -> Result<String> {
        let timeout_duration = Duration::from_secs(self.timeout_seconds);
        let response = timeout(timeout_duration, self.request(prompt).send())
            .await
            .map_err(|_| anyhow!("Request timeout after {}s", self.timeout_seconds))?
            .map_err(|e| anyhow!("HTTP request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!("model API returned status {}", response.status()));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse JSON response: {}", e))?;
        reply_text(self.config.vendor, &body)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("model reply has no text content"))
    }
}

/// Pull the assistant text out of a vendor response body.
pub fn reply_text(vendor: LlmVendor, body: &Value) -> Option<&str> {
    match vendor {
        LlmVendor::OpenAi => body.pointer("/choices/0/message/content")?.as_str(),
        LlmVendor::Anthropic => body.pointer("/content/0/text")?.as_str(),
    }
}

pub fn build_prompt(word: &str, language: &str) -> String {
    let language = language_name(language);
    format!(
        "You are a word validation expert for a word chain game.\n\n\
         Word: \"{word}\"\n\
         Language: {language}\n\n\
         Decide:\n\
         1. Is this a valid {language} word found in standard dictionaries?\n\
         2. Is it a plural form (\"cats\" of \"cat\", \"children\" of \"child\")?\n\
         3. What part of speech is it?\n\n\
         Proper nouns, abbreviations and slang are NOT valid.\n\n\
         Respond with JSON only:\n\
         {{\"is_valid\": true/false, \"is_plural\": true/false, \"word_type\": \"noun/verb/... or null\", \"reason\": \"short explanation\"}}"
    )
}

/// Parse a model reply, tolerating markdown code fences around the JSON.
pub fn parse_verdict(reply: &str) -> Option<Verdict> {
    let mut text = reply.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    serde_json::from_str(text.trim()).ok()
}

#[async_trait]
impl WordValidator for LlmValidator {
    async fn validate(&self, word: &str, language: &str) -> ValidationResult {
        let reply = match self.ask(&build_prompt(word, language)).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Model validation for '{}' failed: {}", escape_log(word), e);
                return ValidationResult::unavailable(word, format!("could not verify word: {}", e));
            }
        };
        match parse_verdict(&reply) {
            Some(verdict) if verdict.is_valid => {
                let mut result = ValidationResult::word(word, verdict.is_plural, verdict.word_type);
                result.reason = verdict.reason;
                result
            }
            Some(verdict) => ValidationResult::not_a_word(
                word,
                verdict
                    .reason
                    .unwrap_or_else(|| "not a standard dictionary word".to_string()),
            ),
            None => {
                debug!("unparseable model reply: {}", escape_log(&reply));
                ValidationResult::unavailable(word, "could not understand the validator reply")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_reply() {
        let reply = "```json\n{\"is_valid\": true, \"is_plural\": false, \"word_type\": \"noun\", \"reason\": \"fruit\"}\n```";
        assert_eq!(
            parse_verdict(reply),
            Some(Verdict {
                is_valid: true,
                is_plural: false,
                word_type: Some("noun".into()),
                reason: Some("fruit".into()),
            })
        );
    }

    #[test]
    fn garbage_reply_is_rejected() {
        assert_eq!(parse_verdict("Sure! \"is_valid\": true"), None);
    }

    #[test]
    fn missing_flags_default_to_invalid() {
        let verdict = parse_verdict("{\"reason\": \"unsure\"}").expect("parses");
        assert!(!verdict.is_valid);
        assert!(!verdict.is_plural);
    }

    #[test]
    fn extracts_vendor_reply_text() {
        let openai = json!({"choices": [{"message": {"content": "{}"}}]});
        assert_eq!(reply_text(LlmVendor::OpenAi, &openai), Some("{}"));
        let anthropic = json!({"content": [{"type": "text", "text": "{\"is_valid\": false}"}]});
        assert_eq!(
            reply_text(LlmVendor::Anthropic, &anthropic),
            Some("{\"is_valid\": false}")
        );
        assert_eq!(reply_text(LlmVendor::Anthropic, &openai), None);
    }

    #[test]
    fn prompt_names_language() {
        let prompt = build_prompt("xin", "vi");
        assert!(prompt.contains("Vietnamese"));
        assert!(prompt.contains("\"xin\""));
    }

    #[test]
    fn custom_endpoint_wins() {
        let mut config = LlmConfig::default();
        assert_eq!(LlmValidator::new(config.clone(), 5).endpoint(), OPENAI_URL);
        config.vendor = LlmVendor::Anthropic;
        assert_eq!(LlmValidator::new(config.clone(), 5).endpoint(), ANTHROPIC_URL);
        config.endpoint = Some("http://localhost:8080/v1/messages".into());
        assert_eq!(
            LlmValidator::new(config, 5).endpoint(),
            "http://localhost:8080/v1/messages"
        );
    }
}
