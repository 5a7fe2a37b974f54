//! Inbound text checks applied before anything reaches the game engine.

/// Supported validation languages and their English names.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("vi", "Vietnamese"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
];

/// Longest word we will send to a validator.
pub const MAX_WORD_CHARS: usize = 45;

const MAX_DISPLAY_NAME_CHARS: usize = 32;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum WordShapeError {
    #[error("empty message")]
    Empty,

    #[error("more than one word")]
    MultipleWords,

    #[error("word is too long (maximum {max} letters)")]
    TooLong { max: usize },

    #[error("word contains non-letter characters: {chars}")]
    NonLetters { chars: String },
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum LanguageError {
    #[error("unsupported language '{0}'")]
    Unsupported(String),
}

/// Accept a chat message as a candidate word: a single run of letters. Returns the
/// lowercased word. Messages that fail are ignored by the chat adapter, not rejected.
pub fn validate_word_shape(message: &str) -> Result<String, WordShapeError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(WordShapeError::Empty);
    }
    if trimmed.split_whitespace().count() > 1 {
        return Err(WordShapeError::MultipleWords);
    }
    if trimmed.chars().count() > MAX_WORD_CHARS {
        return Err(WordShapeError::TooLong {
            max: MAX_WORD_CHARS,
        });
    }
    let invalid: String = trimmed.chars().filter(|c| !c.is_alphabetic()).collect();
    if !invalid.is_empty() {
        return Err(WordShapeError::NonLetters { chars: invalid });
    }
    Ok(trimmed.to_lowercase())
}

/// Display names are shown in every notification: strip control characters, collapse
/// whitespace and cap the length. Falls back to `fallback` when nothing is left.
pub fn sanitize_display_name(name: &str, fallback: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if cleaned.is_empty() {
        return fallback.to_string();
    }
    cleaned.chars().take(MAX_DISPLAY_NAME_CHARS).collect()
}

pub fn validate_language(code: &str) -> Result<String, LanguageError> {
    let lower = code.trim().to_ascii_lowercase();
    if SUPPORTED_LANGUAGES.iter().any(|(c, _)| *c == lower) {
        Ok(lower)
    } else {
        Err(LanguageError::Unsupported(code.trim().to_string()))
    }
}

pub fn language_name(code: &str) -> &'static str {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
        .unwrap_or("English")
}
