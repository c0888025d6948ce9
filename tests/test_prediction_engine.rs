//! Tests for the PredictionEngine lifecycle

use suit_oracle::oracle::parser::extract_groups;
use suit_oracle::oracle::{
    PredictionEngine, PredictionStatus, Statistics, TriggerResult, VerifyResult,
};
use suit_oracle::Suit;

fn groups(first: &str, second: &str) -> Vec<String> {
    vec![first.to_string(), second.to_string()]
}

#[test]
fn test_trigger_replay_verify_scenario() {
    let mut engine = PredictionEngine::new();

    // Round 5 triggers a prediction for round 6
    let result = engine.evaluate_trigger(5, &groups("♠♥", "♦J"));
    match result {
        TriggerResult::Triggered { target_round, suit_signature, .. } => {
            assert_eq!(target_round, 6);
            assert_eq!(suit_signature.to_vec(), vec![Suit::Spades, Suit::Hearts]);
        }
        other => panic!("expected trigger, got {:?}", other),
    }
    assert_eq!(engine.prediction(6).map(|r| r.status), Some(PredictionStatus::Pending));

    // Replay of round 5 does nothing
    assert!(!engine.evaluate_trigger(5, &groups("♠♥", "♦J")).is_triggered());
    assert_eq!(engine.ledger().len(), 1);

    // Round 6 result with three suits resolves at offset 0
    assert_eq!(
        engine.verify_result(6, &groups("K♣", "♠♥♦")),
        VerifyResult::Resolved { round_number: 6, offset: 0 }
    );

    // Nothing pending near round 10
    assert_eq!(engine.verify_result(10, &groups("K♣", "♠♥♦")), VerifyResult::NoMatch);

    let stats = engine.get_statistics();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.wins, 1);
    assert_eq!(stats.pending, 0);
}

#[test]
fn test_jack_in_first_group_never_triggers() {
    let mut engine = PredictionEngine::new();
    assert!(!engine.evaluate_trigger(5, &groups("J♠", "♦J")).is_triggered());
    assert!(engine.ledger().is_empty());
}

#[test]
fn test_offsets_resolve_only_inside_window() {
    for offset in 0..=3u32 {
        let mut engine = PredictionEngine::new();
        engine.evaluate_trigger(19, &groups("♣", "J"));
        assert_eq!(
            engine.verify_result(20 + offset, &groups("", "♠♠♠")),
            VerifyResult::Resolved { round_number: 20, offset: offset as u8 }
        );
    }

    let mut engine = PredictionEngine::new();
    engine.evaluate_trigger(19, &groups("♣", "J"));
    assert_eq!(
        engine.verify_result(24, &groups("", "♠♠♠")),
        VerifyResult::Expired { round_number: 20 }
    );
}

#[test]
fn test_exact_round_preferred_over_older_predictions() {
    let mut engine = PredictionEngine::new();
    engine.evaluate_trigger(7, &groups("♥", "J"));
    engine.evaluate_trigger(8, &groups("♦", "J"));
    engine.evaluate_trigger(9, &groups("♣", "J"));

    assert_eq!(
        engine.verify_result(9, &groups("", "♠♥♦")),
        VerifyResult::Resolved { round_number: 9, offset: 0 }
    );
    assert_eq!(
        engine.verify_result(9, &groups("", "♠♥♦")),
        VerifyResult::Resolved { round_number: 8, offset: 1 }
    );
}

#[test]
fn test_expire_stale_and_verify_overlap() {
    let mut engine = PredictionEngine::new();
    engine.evaluate_trigger(1, &groups("♥", "J"));
    engine.evaluate_trigger(2, &groups("♥", "J"));

    assert_eq!(engine.expire_stale(7), vec![2, 3]);
    assert_eq!(engine.verify_result(7, &groups("", "♠♥♦")), VerifyResult::NoMatch);
    assert!(engine.expire_stale(7).is_empty());

    let stats = engine.get_statistics();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.losses, 2);
    assert_eq!(stats.win_rate, 0.0);
}

#[test]
fn test_win_rate_after_one_win_one_loss() {
    let mut engine = PredictionEngine::new();
    engine.evaluate_trigger(9, &groups("♠", "J"));
    engine.evaluate_trigger(10, &groups("♠", "J"));
    engine.verify_result(10, &groups("", "♠♥♦"));
    engine.expire_stale(20);

    let stats = engine.get_statistics();
    assert_eq!(stats.total, 2);
    assert!((stats.win_rate - 50.0).abs() < f64::EPSILON);
}

#[test]
fn test_reset_zeroes_statistics() {
    let mut engine = PredictionEngine::new();
    engine.evaluate_trigger(5, &groups("♠", "J"));
    engine.evaluate_trigger(6, &groups("♠", "J"));
    engine.verify_result(6, &groups("", "♠♥♦"));

    engine.reset();
    assert_eq!(engine.get_statistics(), Statistics::default());
    assert!(engine.ledger().is_empty());

    // Processed sources were cleared as well
    assert!(engine.evaluate_trigger(5, &groups("♠", "J")).is_triggered());
}

#[test]
fn test_verify_on_empty_engine_is_no_match() {
    let mut engine = PredictionEngine::new();
    assert_eq!(engine.verify_result(3, &groups("", "♠♥♦")), VerifyResult::NoMatch);
    assert!(engine.expire_stale(100).is_empty());
}

#[test]
fn test_full_text_feed() {
    let mut engine = PredictionEngine::new();
    let feed = [
        "✅ #N41. 9(♠️A♥️8) - 7(♦️J♣4)",
        "✅ #N42. 3(K♣2♣) - 5(4♦5♦)",
        "✅ #N43. 8(K♣8♠) - 6(2♠3♥Q♦)",
    ];
    for text in feed {
        engine.process_round(text);
    }

    assert_eq!(extract_groups(feed[0]), vec!["♠️A♥️8", "♦️J♣4"]);
    assert_eq!(engine.prediction(42).map(|r| r.status), Some(PredictionStatus::Resolved(1)));
    assert_eq!(engine.get_statistics().wins, 1);
}
