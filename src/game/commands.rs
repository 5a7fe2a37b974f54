//! Chat command parser.
//!
//! Commands are recognised only behind the configured prefix followed by `wc`
//! (`^wc join`, `^wc create hard 45`), so ordinary conversation never triggers one.
//! Messages without the prefix come back as [`ChatCommand::Message`]; the adapter treats
//! those as potential word submissions when a game is running in the channel.
use log::trace;

use super::state::GameMode;

const COMMAND_WORD: &str = "wc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Help,
    Create {
        mode: GameMode,
        turn_seconds: Option<u32>,
        language: Option<String>,
    },
    Join,
    Leave,
    Start,
    Forfeit,
    Cancel,
    End,
    Status,
    Check {
        word: String,
        language: Option<String>,
    },
    Stats,
    /// Not a command. The trimmed message text.
    Message(String),
    Invalid(String),
}

pub struct CommandParser {
    prefix: String,
}

impl CommandParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn parse(&self, raw: &str) -> ChatCommand {
        let trimmed = raw.trim();
        let Some(body) = trimmed.strip_prefix(self.prefix.as_str()) else {
            return ChatCommand::Message(trimmed.to_string());
        };
        let mut tokens = body.split_whitespace();
        match tokens.next() {
            Some(word) if word.eq_ignore_ascii_case(COMMAND_WORD) => {}
            _ => return ChatCommand::Message(trimmed.to_string()),
        }
        let Some(verb) = tokens.next() else {
            return ChatCommand::Help;
        };
        let args: Vec<&str> = tokens.collect();
        let command = match verb.to_ascii_lowercase().as_str() {
            "help" | "?" => ChatCommand::Help,
            "create" | "new" => parse_create(&args),
            "join" => ChatCommand::Join,
            "leave" => ChatCommand::Leave,
            "start" => ChatCommand::Start,
            "forfeit" | "ff" => ChatCommand::Forfeit,
            "cancel" => ChatCommand::Cancel,
            "end" | "stop" => ChatCommand::End,
            "status" => ChatCommand::Status,
            "check" => match args.as_slice() {
                [] => ChatCommand::Invalid("Word required".into()),
                [word] => ChatCommand::Check {
                    word: word.to_string(),
                    language: None,
                },
                [word, language] => ChatCommand::Check {
                    word: word.to_string(),
                    language: Some(language.to_ascii_lowercase()),
                },
                _ => ChatCommand::Invalid("Usage: check <word> [language]".into()),
            },
            "stats" => ChatCommand::Stats,
            other => ChatCommand::Invalid(format!("Unknown command '{}'", other)),
        };
        trace!("Parsed {:?} from '{}'", command, raw);
        command
    }

    pub fn help(&self) -> String {
        let p = &self.prefix;
        format!(
            "{p}wc create [normal|hard] [seconds] [language], {p}wc join, {p}wc leave, \
             {p}wc start, {p}wc forfeit, {p}wc cancel, {p}wc end, {p}wc status, \
             {p}wc check <word> [language], {p}wc stats"
        )
    }
}

/// Options may come in any order: a mode name, a number of seconds, a language code.
fn parse_create(args: &[&str]) -> ChatCommand {
    let mut mode = None;
    let mut turn_seconds = None;
    let mut language = None;
    for arg in args {
        if let Ok(seconds) = arg.parse::<u32>() {
            if turn_seconds.replace(seconds).is_some() {
                return ChatCommand::Invalid("Turn length given twice".into());
            }
        } else if let Ok(parsed) = arg.parse::<GameMode>() {
            if mode.replace(parsed).is_some() {
                return ChatCommand::Invalid("Mode given twice".into());
            }
        } else if arg.len() == 2 && arg.chars().all(|c| c.is_ascii_alphabetic()) {
            if language.replace(arg.to_ascii_lowercase()).is_some() {
                return ChatCommand::Invalid("Language given twice".into());
            }
        } else {
            return ChatCommand::Invalid(format!("Unrecognised option '{}'", arg));
        }
    }
    ChatCommand::Create {
        mode: mode.unwrap_or_default(),
        turn_seconds,
        language,
    }
}
