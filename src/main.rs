//! Binary entrypoint for the wordchain CLI.
//!
//! Commands:
//! - `start [--guild <id>] [--channel <id>]` - run the game over the console chat adapter
//! - `init` - create a starter `config.toml`
//! - `check <word> [--language <code>]` - ask the configured validator about a word
//! - `stats --user <id> [--guild <id>]` - print a player's statistics
//!
//! See the library crate docs for module-level details: `wordchain::`.
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::info;

use wordchain::config::Config;
use wordchain::game::server::{describe_stats, describe_verdict, ChatServer};
use wordchain::game::{ChannelSink, GameCoordinator};
use wordchain::storage::{GameStore, SledStore};
use wordchain::validation::{validate_language, validate_word_shape};
use wordchain::validator::build_validator;

#[derive(Parser)]
#[command(name = "wordchain")]
#[command(about = "A multiplayer word-chain party game for chat channels")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the game, reading chat lines from stdin
    Start {
        /// Guild the console session belongs to
        #[arg(short, long, default_value_t = 1)]
        guild: u64,
        /// Channel used for lines without a `#channel` tag
        #[arg(long, default_value_t = 1)]
        channel: u64,
    },
    /// Write a default configuration file
    Init,
    /// Validate a single word with the configured provider
    Check {
        word: String,
        /// Language code (defaults to game.default_language)
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Show a player's statistics
    Stats {
        #[arg(short, long)]
        user: u64,
        #[arg(short, long, default_value_t = 1)]
        guild: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(None, cli.verbose);
        Config::create_default(&cli.config).await?;
        info!("Configuration file created at {}", cli.config);
        return Ok(());
    }

    let config = Config::load(&cli.config).await?;
    config.validate()?;
    init_logging(Some(&config), cli.verbose);

    let store = Arc::new(SledStore::open(config.storage.db_path())?);

    match cli.command {
        Commands::Start { guild, channel } => {
            info!("Starting wordchain v{}", env!("CARGO_PKG_VERSION"));
            let validator = build_validator(&config.validator, store.clone());
            let (sink, events) = ChannelSink::channel();
            let coordinator =
                GameCoordinator::new((&config.game).into(), store, validator, Arc::new(sink));
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut server = ChatServer::new(
                coordinator,
                config.game.prefix(),
                guild,
                channel,
                tokio::io::stdout(),
            );
            server.run(stdin, events).await?;
        }
        Commands::Check { word, language } => {
            let word = validate_word_shape(&word).map_err(|e| anyhow!("{}", e))?;
            let language = match language {
                Some(code) => validate_language(&code)?,
                None => config.game.default_language.clone(),
            };
            let validator = build_validator(&config.validator, store);
            let result = validator.validate(&word, &language).await;
            println!("{}", describe_verdict(&result));
        }
        Commands::Stats { user, guild } => match store.player_stats(guild, user)? {
            Some(stats) => println!("{}", describe_stats(&stats)),
            None => println!("No finished games for user {} in guild {}", user, guild),
        },
        Commands::Init => {}
    }

    Ok(())
}

fn init_logging(config: Option<&Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });
    match log_file {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // Interactive sessions also get log lines on the console
            let is_tty = atty::is(atty::Stream::Stderr);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
