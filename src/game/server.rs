//! # Console chat adapter
//!
//! A line-oriented stand-in for a chat platform connection. Each input line is one chat
//! message:
//!
//! ```text
//! [#<channel>] <user_id> [<display name>]: <message>
//! ```
//!
//! The channel defaults to the one the server was started with. Commands go to the
//! [`GameCoordinator`]; every other message is offered as a word submission when it looks
//! like a single word. Game notifications from the coordinator's sink are written to the
//! output as they arrive, interleaved with command replies.

use anyhow::Result;
use log::{debug, info, trace, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use super::commands::{ChatCommand, CommandParser};
use super::coordinator::{GameCoordinator, PartyOptions, SubmissionOutcome};
use super::events::GameEvent;
use super::state::{ChannelId, GuildId, Member, UserId};
use super::GameError;
use crate::logutil::escape_log;
use crate::metrics;
use crate::storage::records::PlayerStats;
use crate::validation::{sanitize_display_name, validate_word_shape};
use crate::validator::ValidationResult;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub channel: ChannelId,
    pub user_id: UserId,
    pub display_name: String,
    pub text: String,
}

/// Parse `[#channel] user_id [name]: text`. Lines that do not fit are `None`.
pub fn parse_line(line: &str, default_channel: ChannelId) -> Option<ChatLine> {
    let mut rest = line.trim();
    let mut channel = default_channel;
    if let Some(tagged) = rest.strip_prefix('#') {
        let (id, after) = tagged.split_once(char::is_whitespace)?;
        channel = id.parse().ok()?;
        rest = after.trim_start();
    }
    let (head, text) = rest.split_once(':')?;
    let head = head.trim();
    let (id, name) = match head.split_once(char::is_whitespace) {
        Some((id, name)) => (id, name.trim()),
        None => (head, ""),
    };
    let user_id: UserId = id.parse().ok()?;
    let fallback = format!("user{}", user_id);
    Some(ChatLine {
        channel,
        user_id,
        display_name: sanitize_display_name(name, &fallback),
        text: text.trim().to_string(),
    })
}

pub fn describe_verdict(result: &ValidationResult) -> String {
    let verdict = if result.is_acceptable() {
        "valid"
    } else if result.plural {
        "plural (not allowed)"
    } else {
        "not accepted"
    };
    let mut line = format!("'{}' is {}", result.word, verdict);
    if let Some(category) = &result.category {
        line.push_str(&format!(" [{}]", category));
    }
    if let Some(reason) = &result.reason {
        line.push_str(&format!(": {}", reason));
    }
    if result.served_from_cache {
        line.push_str(" (cached)");
    }
    line
}

pub fn describe_stats(stats: &PlayerStats) -> String {
    format!(
        "{}: {} games, {} wins ({:.0}%), {} words, {} timeouts, streak {} (best {}), longest word {}",
        stats.username,
        stats.games_played,
        stats.games_won,
        stats.win_rate() * 100.0,
        stats.total_words,
        stats.total_timeouts,
        stats.current_win_streak,
        stats.best_win_streak,
        stats.longest_word.as_deref().unwrap_or("-")
    )
}

pub struct ChatServer<W> {
    coordinator: GameCoordinator,
    parser: CommandParser,
    guild: GuildId,
    default_channel: ChannelId,
    output: W,
}

impl<W: AsyncWrite + Unpin> ChatServer<W> {
    pub fn new(
        coordinator: GameCoordinator,
        prefix: &str,
        guild: GuildId,
        default_channel: ChannelId,
        output: W,
    ) -> Self {
        Self {
            coordinator,
            parser: CommandParser::new(prefix),
            guild,
            default_channel,
            output,
        }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    /// Serve until the input ends or ctrl-c. Events still queued at that point are flushed.
    pub async fn run<R>(
        &mut self,
        input: R,
        mut events: mpsc::UnboundedReceiver<(ChannelId, GameEvent)>,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        info!(
            "chat adapter listening (guild {}, default channel {})",
            self.guild, self.default_channel
        );
        let mut lines = input.lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line? {
                        Some(line) => self.handle_raw(&line).await?,
                        None => {
                            debug!("input closed");
                            break;
                        }
                    }
                }
                event = events.recv() => {
                    match event {
                        Some((channel, event)) => self.emit(channel, &event).await?,
                        None => {
                            warn!("notification channel closed");
                            break;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }
        while let Ok((channel, event)) = events.try_recv() {
            self.emit(channel, &event).await?;
        }
        self.output.flush().await?;
        info!("chat adapter stopped: {:?}", metrics::snapshot());
        Ok(())
    }

    async fn handle_raw(&mut self, raw: &str) -> Result<()> {
        if raw.trim().is_empty() {
            return Ok(());
        }
        match parse_line(raw, self.default_channel) {
            Some(line) => self.handle_line(line).await,
            None => {
                debug!("ignoring malformed line: {}", escape_log(raw));
                Ok(())
            }
        }
    }

    pub async fn handle_line(&mut self, line: ChatLine) -> Result<()> {
        let ChatLine {
            channel,
            user_id,
            display_name,
            text,
        } = line;
        let member = || Member::new(user_id, display_name.clone(), display_name.clone());
        let c = &self.coordinator;

        let reply = match self.parser.parse(&text) {
            ChatCommand::Help => Some(self.parser.help()),
            ChatCommand::Create {
                mode,
                turn_seconds,
                language,
            } => {
                let options = PartyOptions {
                    mode,
                    turn_seconds,
                    language,
                };
                c.create(self.guild, channel, member(), options)
                    .await
                    .err()
                    .map(|e| e.to_string())
            }
            ChatCommand::Join => c.join(channel, member()).await.err().map(|e| e.to_string()),
            ChatCommand::Leave => c.leave(channel, user_id).await.err().map(|e| e.to_string()),
            ChatCommand::Start => c.start(channel, user_id).await.err().map(|e| e.to_string()),
            ChatCommand::Forfeit => c.forfeit(channel, user_id).await.err().map(|e| e.to_string()),
            ChatCommand::Cancel => c.cancel(channel, user_id).await.err().map(|e| e.to_string()),
            ChatCommand::End => c.end(channel, user_id).await.err().map(|e| e.to_string()),
            ChatCommand::Status => Some(match c.status(channel).await {
                Some(snapshot) => snapshot.to_string().trim_end().to_string(),
                None => GameError::NoGame.to_string(),
            }),
            ChatCommand::Check { word, language } => Some(match validate_word_shape(&word) {
                Ok(word) => match c.check_word(&word, language.as_deref()).await {
                    Ok(result) => describe_verdict(&result),
                    Err(e) => e.to_string(),
                },
                Err(e) => e.to_string(),
            }),
            ChatCommand::Stats => Some(match c.player_stats(self.guild, user_id) {
                Ok(Some(stats)) => describe_stats(&stats),
                Ok(None) => format!("{} has no finished games yet", display_name),
                Err(e) => e.to_string(),
            }),
            ChatCommand::Invalid(message) => Some(message),
            ChatCommand::Message(message) => {
                self.submit(channel, user_id, &message).await;
                None
            }
        };

        if let Some(reply) = reply {
            let text = format!("@{}: {}", display_name, reply);
            self.write(channel, &text).await?;
        }
        Ok(())
    }

    /// Ordinary chat. Only single words reach the coordinator; everything else is talk.
    async fn submit(&self, channel: ChannelId, user: UserId, message: &str) {
        let word = match validate_word_shape(message) {
            Ok(word) => word,
            Err(e) => {
                trace!("not a submission ({}): {}", e, escape_log(message));
                return;
            }
        };
        match self.coordinator.submit_word(channel, user, &word).await {
            Ok(SubmissionOutcome::NotYourTurn) => {
                trace!("{} spoke out of turn in channel {}", user, channel);
            }
            Ok(outcome) => debug!("submission in channel {}: {:?}", channel, outcome),
            Err(GameError::Storage(e)) => warn!("submission in channel {} failed: {}", channel, e),
            Err(e) => trace!("no submission in channel {}: {}", channel, e),
        }
    }

    async fn emit(&mut self, channel: ChannelId, event: &GameEvent) -> Result<()> {
        self.write(channel, &event.to_string()).await
    }

    async fn write(&mut self, channel: ChannelId, text: &str) -> Result<()> {
        for line in text.lines() {
            self.output
                .write_all(format!("[#{}] {}\n", channel, line).as_bytes())
                .await?;
        }
        self.output.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_line() {
        assert_eq!(
            parse_line("#7 42 Alice Smith: ^wc join", 1),
            Some(ChatLine {
                channel: 7,
                user_id: 42,
                display_name: "Alice Smith".into(),
                text: "^wc join".into(),
            })
        );
    }

    #[test]
    fn channel_and_name_are_optional() {
        let line = parse_line("42: apple", 3).expect("parses");
        assert_eq!(line.channel, 3);
        assert_eq!(line.display_name, "user42");
        assert_eq!(line.text, "apple");
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert_eq!(parse_line("hello there", 1), None);
        assert_eq!(parse_line("bob: apple", 1), None);
        assert_eq!(parse_line("#x 42: apple", 1), None);
    }

    #[test]
    fn verdict_lines() {
        let mut result = ValidationResult::word("apple", false, Some("noun".into()));
        result.served_from_cache = true;
        assert_eq!(describe_verdict(&result), "'apple' is valid [noun] (cached)");
        let plural = ValidationResult::word("cats", true, None);
        assert_eq!(describe_verdict(&plural), "'cats' is plural (not allowed)");
        let bad = ValidationResult::not_a_word("zzq", "not in the dictionary");
        assert_eq!(describe_verdict(&bad), "'zzq' is not accepted: not in the dictionary");
    }
}
