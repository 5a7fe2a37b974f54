//! End-to-end turn, timeout and elimination behaviour on a paused tokio clock.
mod common;

use std::time::Duration;

use common::*;
use wordchain::game::state::{EliminationReason, GameStatus, RejectionKind};
use wordchain::game::timer::TimerExpired;
use wordchain::game::{EliminationOutcome, GameEvent, GameMode, PartyOptions, SubmissionOutcome};
use wordchain::storage::GameStore;

async fn advance(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

#[tokio::test(start_paused = true)]
async fn timeout_then_forfeit_leaves_first_player_as_winner() {
    let h = harness();
    start_game(&h, &[1, 2, 3], PartyOptions::default()).await;
    let c = &h.coordinator;

    let outcome = c.submit_word(CHANNEL, 1, "apple").await.unwrap();
    assert_eq!(outcome, SubmissionOutcome::Accepted { next_player: Some(2) });

    // Player 2 lets the clock run out.
    advance(31).await;
    let status = c.status(CHANNEL).await.expect("game still running");
    assert_eq!(status.current_player, Some(3));
    assert!(status.players[1].is_eliminated);
    assert_eq!(status.last_word, None, "elimination starts a new chain");

    let summary = match c.forfeit(CHANNEL, 3).await.unwrap() {
        EliminationOutcome::GameOver(summary) => summary,
        other => panic!("expected game over, got {:?}", other),
    };
    assert_eq!(summary.winner, Some(1));
    assert_eq!(summary.total_words, 1);
    assert_eq!(summary.chain_resets, 2);
    assert!(c.status(CHANNEL).await.is_none());

    let record = h.store.get_game(summary.game_id).unwrap().expect("persisted");
    assert_eq!(record.status, GameStatus::Finished);
    assert_eq!(record.winner_id, Some(1));

    let participants = h.store.participants(summary.game_id).unwrap();
    let p2 = participants.iter().find(|p| p.user_id == 2).unwrap();
    assert_eq!(p2.eliminated_by, Some(EliminationReason::Timeout));
    assert_eq!(p2.elimination_rank, Some(1));
    let p3 = participants.iter().find(|p| p.user_id == 3).unwrap();
    assert_eq!(p3.eliminated_by, Some(EliminationReason::Forfeit));
    assert_eq!(p3.elimination_rank, Some(2));

    let winner = h.store.player_stats(GUILD, 1).unwrap().unwrap();
    assert_eq!((winner.games_played, winner.games_won), (1, 1));
    assert_eq!(winner.current_win_streak, 1);
    assert_eq!(winner.longest_word.as_deref(), Some("apple"));
    let timed_out = h.store.player_stats(GUILD, 2).unwrap().unwrap();
    assert_eq!(timed_out.total_timeouts, 1);
    assert_eq!(timed_out.games_won, 0);
    let forfeited = h.store.player_stats(GUILD, 3).unwrap().unwrap();
    assert_eq!(forfeited.total_timeouts, 0);
    assert_eq!(forfeited.games_played, 1);

    assert_eq!(h.sink.count(|e| matches!(e, GameEvent::GameEnded { .. })), 1);
    assert_eq!(h.sink.count(|e| matches!(e, GameEvent::TimerExpired { .. })), 1);
}

#[tokio::test(start_paused = true)]
async fn repeated_word_in_other_case_is_rejected() {
    let h = harness();
    start_game(&h, &[1, 2], PartyOptions::default()).await;
    let c = &h.coordinator;

    c.submit_word(CHANNEL, 1, "apple").await.unwrap();
    let outcome = c.submit_word(CHANNEL, 2, "APPLE").await.unwrap();
    assert_eq!(outcome, SubmissionOutcome::Rejected(RejectionKind::AlreadyUsed));
    assert_eq!(h.validator.calls(), 1, "duplicates never reach the validator");

    let status = c.status(CHANNEL).await.unwrap();
    assert_eq!(status.current_player, Some(2));
    assert_eq!(status.chain_length, 1);
    assert_eq!(status.last_word.as_deref(), Some("apple"));

    c.submit_word(CHANNEL, 2, "Egg").await.unwrap();
    let game_id = status.id;
    let p2 = h
        .store
        .participants(game_id)
        .unwrap()
        .into_iter()
        .find(|p| p.user_id == 2)
        .unwrap();
    assert_eq!(p2.invalid_attempts, 1);
    assert_eq!(p2.words_played, 1);

    let words: Vec<(String, u32, u32)> = h
        .store
        .words(game_id)
        .unwrap()
        .into_iter()
        .map(|w| (w.word, w.chain_number, w.position))
        .collect();
    assert_eq!(
        words,
        vec![("apple".to_string(), 1, 1), ("egg".to_string(), 1, 2)]
    );
}

#[tokio::test(start_paused = true)]
async fn hard_mode_rejections_keep_the_turn() {
    let h = harness_with(settings(), FakeValidator::new(&["lexqz"], &["lemons"]));
    let options = PartyOptions {
        mode: GameMode::Hard,
        ..PartyOptions::default()
    };
    start_game(&h, &[1, 2], options).await;
    let c = &h.coordinator;

    c.submit_word(CHANNEL, 1, "apple").await.unwrap();
    assert_eq!(
        c.submit_word(CHANNEL, 2, "egg").await.unwrap(),
        SubmissionOutcome::Rejected(RejectionKind::WrongStart {
            required: "le".into()
        })
    );
    assert_eq!(
        c.submit_word(CHANNEL, 2, "lemons").await.unwrap(),
        SubmissionOutcome::Rejected(RejectionKind::Plural)
    );
    assert_eq!(
        c.submit_word(CHANNEL, 2, "lexqz").await.unwrap(),
        SubmissionOutcome::Rejected(RejectionKind::NotAWord)
    );
    assert_eq!(
        c.submit_word(CHANNEL, 1, "lemon").await.unwrap(),
        SubmissionOutcome::NotYourTurn
    );
    assert_eq!(
        c.submit_word(CHANNEL, 2, "lemon").await.unwrap(),
        SubmissionOutcome::Accepted { next_player: Some(1) }
    );
    assert_eq!(
        h.sink.count(|e| matches!(e, GameEvent::WordRejected { .. })),
        3
    );
}

#[tokio::test(start_paused = true)]
async fn last_opponent_forfeiting_ends_game_and_silences_timer() {
    let h = harness();
    start_game(&h, &[1, 2], PartyOptions::default()).await;
    let c = &h.coordinator;

    // Not the current player: the game ends anyway because only one player is left.
    let outcome = c.forfeit(CHANNEL, 2).await.unwrap();
    assert!(matches!(
        outcome,
        EliminationOutcome::GameOver(ref s) if s.winner == Some(1)
    ));

    advance(120).await;
    assert_eq!(h.sink.count(|e| matches!(e, GameEvent::TimerExpired { .. })), 0);
    assert_eq!(h.sink.count(|e| matches!(e, GameEvent::GameEnded { .. })), 1);
    assert!(
        !c.handle_timeout(TimerExpired {
            channel: CHANNEL,
            generation: 1,
            player: 1,
        })
        .await
    );
    assert!(c.forfeit(CHANNEL, 1).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn timer_that_was_reset_never_eliminates() {
    let h = harness();
    start_game(&h, &[1, 2], PartyOptions::default()).await;
    let c = &h.coordinator;

    advance(29).await;
    c.submit_word(CHANNEL, 1, "apple").await.unwrap();
    advance(2).await;

    let status = c.status(CHANNEL).await.unwrap();
    assert_eq!(status.current_player, Some(2));
    assert!(status.players.iter().all(|p| !p.is_eliminated));

    // A late delivery of the first turn's expiry is stale.
    let stale = TimerExpired {
        channel: CHANNEL,
        generation: 1,
        player: 1,
    };
    assert!(!c.handle_timeout(stale).await);
    assert_eq!(
        h.sink.count(|e| matches!(e, GameEvent::PlayerEliminated { .. })),
        0
    );
}

#[tokio::test(start_paused = true)]
async fn each_expiry_eliminates_exactly_once() {
    let h = harness();
    start_game(&h, &[1, 2, 3], PartyOptions::default()).await;
    let c = &h.coordinator;

    advance(31).await;
    let status = c.status(CHANNEL).await.unwrap();
    assert!(status.players[0].is_eliminated);
    assert_eq!(status.current_player, Some(2));

    let replay = TimerExpired {
        channel: CHANNEL,
        generation: 1,
        player: 1,
    };
    assert!(!c.handle_timeout(replay).await);
    assert!(!c.handle_timeout(replay).await);
    assert_eq!(
        h.sink.count(|e| matches!(e, GameEvent::PlayerEliminated { .. })),
        1
    );

    // Second turn times out too: 2 is out, 3 wins.
    advance(30).await;
    assert!(c.status(CHANNEL).await.is_none());
    let ended: Vec<_> = h
        .sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            GameEvent::GameEnded { winner, .. } => Some(winner.map(|w| w.user_id)),
            _ => None,
        })
        .collect();
    assert_eq!(ended, vec![Some(3)]);
}

#[tokio::test(start_paused = true)]
async fn countdown_ticks_are_published() {
    let h = harness();
    start_game(&h, &[1, 2], PartyOptions::default()).await;

    advance(10).await;
    let ticks: Vec<u32> = h
        .sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            GameEvent::TimerTick { seconds_remaining } => Some(seconds_remaining),
            _ => None,
        })
        .collect();
    assert_eq!(ticks, vec![27, 24, 21]);
}

#[tokio::test(start_paused = true)]
async fn end_finishes_without_winner_when_several_remain() {
    let h = harness();
    start_game(&h, &[1, 2, 3], PartyOptions::default()).await;
    let c = &h.coordinator;

    c.submit_word(CHANNEL, 1, "apple").await.unwrap();
    assert!(c.end(CHANNEL, 2).await.is_err());
    let summary = c.end(CHANNEL, 1).await.unwrap();
    assert_eq!(summary.winner, None);
    assert_eq!(summary.total_words, 1);

    advance(60).await;
    assert_eq!(h.sink.count(|e| matches!(e, GameEvent::TimerExpired { .. })), 0);
    for user in [1, 2, 3] {
        let stats = h.store.player_stats(GUILD, user).unwrap().unwrap();
        assert_eq!(stats.games_played, 1);
        assert_eq!(stats.games_won, 0);
    }
}

#[tokio::test(start_paused = true)]
async fn word_accepted_during_slow_lookup_beats_the_expiry() {
    let validator = FakeValidator::default().with_delay(Duration::from_secs(5));
    let h = harness_with(settings(), validator);
    start_game(&h, &[1, 2], PartyOptions::default()).await;

    // The lookup straddles the 30s deadline; the expiry queues behind the slot lock.
    advance(28).await;
    let c = h.coordinator.clone();
    let submission = tokio::spawn(async move { c.submit_word(CHANNEL, 1, "apple").await });
    let outcome = submission.await.unwrap().unwrap();
    assert_eq!(outcome, SubmissionOutcome::Accepted { next_player: Some(2) });
    advance(1).await;

    let status = h.coordinator.status(CHANNEL).await.expect("game still running");
    assert_eq!(status.current_player, Some(2));
    assert_eq!(status.chain_length, 1);
    assert!(status.players.iter().all(|p| !p.is_eliminated));
    assert_eq!(
        h.sink.count(|e| matches!(e, GameEvent::PlayerEliminated { .. })),
        0
    );
    assert_eq!(h.sink.count(|e| matches!(e, GameEvent::TimerExpired { .. })), 0);
}

#[tokio::test(start_paused = true)]
async fn word_rejected_during_slow_lookup_still_times_out() {
    let validator = FakeValidator::new(&["zzq"], &[]).with_delay(Duration::from_secs(5));
    let h = harness_with(settings(), validator);
    start_game(&h, &[1, 2], PartyOptions::default()).await;

    advance(28).await;
    let c = h.coordinator.clone();
    let submission = tokio::spawn(async move { c.submit_word(CHANNEL, 1, "zzq").await });
    let outcome = submission.await.unwrap().unwrap();
    assert_eq!(outcome, SubmissionOutcome::Rejected(RejectionKind::NotAWord));
    advance(1).await;

    assert!(h.coordinator.status(CHANNEL).await.is_none());
    assert_eq!(
        h.sink.count(|e| matches!(e, GameEvent::PlayerEliminated { .. })),
        1
    );
    let ended: Vec<_> = h
        .sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            GameEvent::GameEnded { winner, .. } => Some(winner.map(|w| w.user_id)),
            _ => None,
        })
        .collect();
    assert_eq!(ended, vec![Some(2)]);
}

#[tokio::test(start_paused = true)]
async fn forfeit_off_turn_announces_fresh_chain_and_keeps_countdown() {
    let h = harness();
    start_game(&h, &[1, 2, 3], PartyOptions::default()).await;
    let c = &h.coordinator;

    c.submit_word(CHANNEL, 1, "apple").await.unwrap();
    advance(10).await;
    let outcome = c.forfeit(CHANNEL, 3).await.unwrap();
    assert_eq!(
        outcome,
        EliminationOutcome::Continues {
            current_player: Some(2)
        }
    );

    let last_turn = h
        .sink
        .events()
        .into_iter()
        .rev()
        .find_map(|e| match e {
            GameEvent::TurnStarted {
                actor,
                required_start,
                seconds,
            } => Some((actor.user_id, required_start, seconds)),
            _ => None,
        })
        .expect("turn announced");
    assert_eq!(last_turn.0, 2);
    assert_eq!(last_turn.1, None, "any word starts the new chain");
    assert!(last_turn.2 <= 30);

    // Player 2's original deadline still applies: 10s + 21s is past 30s.
    advance(21).await;
    assert!(c.status(CHANNEL).await.is_none());
    assert_eq!(h.sink.count(|e| matches!(e, GameEvent::TimerExpired { .. })), 1);
}
