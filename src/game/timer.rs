//! Per-channel turn countdown.
//!
//! A [`TurnTimer`] owns at most one countdown task. Each [`TurnTimer::start`] creates a
//! fresh instance with its own generation number and its own state cell; the state cell
//! doubles as the cancellation flag and is checked after every sleep. The expiry path
//! and [`TurnTimer::stop`] race on a single compare-and-swap out of `Running`, so the
//! timeout fires at most once per start and never after a successful stop.
//!
//! Expiry is not handled here. The task sends a [`TimerExpired`] message and the
//! coordinator re-validates it against the live game (generation, current player)
//! before mutating anything.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::events::{GameEvent, NotificationSink};
use super::state::{ChannelId, UserId};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const EXPIRED: u8 = 2;
const STOPPED: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Expired,
    Stopped,
}

impl TimerState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            RUNNING => TimerState::Running,
            EXPIRED => TimerState::Expired,
            STOPPED => TimerState::Stopped,
            _ => TimerState::Idle,
        }
    }
}

/// Sent by a countdown task when it reaches zero without being stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerExpired {
    pub channel: ChannelId,
    pub generation: u64,
    pub player: UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    pub turn: Duration,
    pub update_interval: Duration,
}

impl TimerSettings {
    pub fn from_secs(turn_seconds: u32, update_interval_seconds: u32) -> Self {
        Self {
            turn: Duration::from_secs(turn_seconds as u64),
            update_interval: Duration::from_secs(update_interval_seconds.max(1) as u64),
        }
    }
}

pub struct TurnTimer {
    channel: ChannelId,
    generation: u64,
    state: Arc<AtomicU8>,
    player: Option<UserId>,
    acknowledged: Option<u64>,
    task: Option<JoinHandle<()>>,
    expired_tx: mpsc::UnboundedSender<TimerExpired>,
    sink: Arc<dyn NotificationSink>,
}

impl TurnTimer {
    pub fn new(
        channel: ChannelId,
        expired_tx: mpsc::UnboundedSender<TimerExpired>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            channel,
            generation: 0,
            state: Arc::new(AtomicU8::new(IDLE)),
            player: None,
            acknowledged: None,
            task: None,
            expired_tx,
            sink,
        }
    }

    /// Begin a countdown for `player`. The player id is frozen for this instance; any
    /// later turn change must go through another `start`. Returns the new generation.
    pub fn start(&mut self, player: UserId, settings: TimerSettings) -> u64 {
        self.stop();
        self.generation += 1;
        let state = Arc::new(AtomicU8::new(RUNNING));
        self.state = state.clone();
        self.player = Some(player);

        let channel = self.channel;
        let generation = self.generation;
        let expired_tx = self.expired_tx.clone();
        let sink = self.sink.clone();
        trace!(
            "timer start: channel={} gen={} player={} turn={:?}",
            channel,
            generation,
            player,
            settings.turn
        );
        self.task = Some(tokio::spawn(async move {
            countdown(
                TimerExpired {
                    channel,
                    generation,
                    player,
                },
                state,
                settings,
                expired_tx,
                sink,
            )
            .await;
        }));
        generation
    }

    /// Cancel the pending countdown. No-op when idle, stopped or already expired.
    pub fn stop(&mut self) {
        if self
            .state
            .compare_exchange(RUNNING, STOPPED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            trace!("timer stop: channel={} gen={}", self.channel, self.generation);
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn reset(&mut self, player: UserId, settings: TimerSettings) -> u64 {
        self.stop();
        self.start(player, settings)
    }

    pub fn state(&self) -> TimerState {
        TimerState::from_raw(self.state.load(Ordering::SeqCst))
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn player(&self) -> Option<UserId> {
        self.player
    }

    /// Claim an expiry notification. True only for the live instance, only after it
    /// actually expired, and only once per generation.
    pub fn acknowledge_expiry(&mut self, generation: u64) -> bool {
        if generation != self.generation
            || self.state() != TimerState::Expired
            || self.acknowledged == Some(generation)
        {
            return false;
        }
        self.acknowledged = Some(generation);
        true
    }
}

impl Drop for TurnTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn countdown(
    expiry: TimerExpired,
    state: Arc<AtomicU8>,
    settings: TimerSettings,
    expired_tx: mpsc::UnboundedSender<TimerExpired>,
    sink: Arc<dyn NotificationSink>,
) {
    let mut remaining = settings.turn;
    while !remaining.is_zero() {
        let wait = remaining.min(settings.update_interval);
        tokio::time::sleep(wait).await;
        if state.load(Ordering::SeqCst) != RUNNING {
            return;
        }
        remaining -= wait;
        if !remaining.is_zero() {
            sink.publish(
                expiry.channel,
                GameEvent::TimerTick {
                    seconds_remaining: remaining.as_secs_f64().ceil() as u32,
                },
            );
        }
    }

    if state
        .compare_exchange(RUNNING, EXPIRED, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return;
    }
    debug!(
        "timer expired: channel={} gen={} player={}",
        expiry.channel, expiry.generation, expiry.player
    );
    if expired_tx.send(expiry).is_err() {
        warn!(
            "timer expiry for channel {} dropped: coordinator is gone",
            expiry.channel
        );
    }
}
