//! Integration tests: rating updates driven by finished training sessions.

mod common;

use puzzle_core::{RatedParty, Rating, RatingConfig, RatingUpdater, TrainingSession, Variant};

use common::{at, puzzle, START_FEN};

/// Play one attempt and rate it with the session's own timestamps.
fn rate_attempt(
    updater: &RatingUpdater,
    solver: &RatedParty,
    puzzle_party: &RatedParty,
    first_move: &str,
) -> (i8, puzzle_core::RatingUpdate) {
    let mut session = TrainingSession::new("rated");
    session
        .setup_at(
            puzzle(30, Variant::KingOfTheHill, START_FEN, &["e2e4 e7e5"]),
            at(9, 0),
        )
        .unwrap();
    let outcome = session
        .apply_move_at(&first_move[0..2], &first_move[2..4], None, at(9, 3))
        .unwrap();

    let solved = outcome.correct() == 1;
    let update = updater.update(
        solver,
        puzzle_party,
        solved,
        session.started_utc().unwrap(),
        session.ended_utc().unwrap(),
    );
    (outcome.correct(), update)
}

#[test]
fn solving_raises_solver_and_lowers_puzzle() {
    let updater = RatingUpdater::default();
    let solver = RatedParty::new(Rating::new(1500.0, 200.0, 0.06), None);
    let puzzle_party = RatedParty::new(Rating::new(1500.0, 200.0, 0.06), None);

    let (correct, update) = rate_attempt(&updater, &solver, &puzzle_party, "e2e4");
    assert_eq!(correct, 1);
    assert!(update.solver.value > 1500.0);
    assert!(update.puzzle.value < 1500.0);
}

#[test]
fn failing_lowers_solver_and_raises_puzzle() {
    let updater = RatingUpdater::default();
    let solver = RatedParty::new(Rating::new(1650.0, 90.0, 0.06), None);
    let puzzle_party = RatedParty::new(Rating::new(1400.0, 120.0, 0.06), None);

    let (correct, update) = rate_attempt(&updater, &solver, &puzzle_party, "d2d4");
    assert_eq!(correct, -1);
    assert!(update.solver.value < 1650.0);
    assert!(update.puzzle.value > 1400.0);
    // An upset moves ratings further than an expected result would.
    assert!(1650.0 - update.solver.value > 5.0);
}

#[test]
fn identical_attempts_rate_identically() {
    let updater = RatingUpdater::default();
    let solver = RatedParty::new(Rating::new(1580.0, 110.0, 0.06), Some(at(7, 0)));
    let puzzle_party = RatedParty::new(Rating::new(1720.0, 75.0, 0.059), Some(at(1, 0)));

    let (_, a) = rate_attempt(&updater, &solver, &puzzle_party, "e2e4");
    let (_, b) = rate_attempt(&updater, &solver, &puzzle_party, "e2e4");
    assert_eq!(a, b);
}

#[test]
fn long_idle_solver_moves_more() {
    let config = RatingConfig {
        rating_period: chrono::Duration::hours(1),
        ..RatingConfig::default()
    };
    let updater = RatingUpdater::new(config);
    let puzzle_party = RatedParty::new(Rating::new(1500.0, 60.0, 0.06), None);
    let fresh = RatedParty::new(Rating::new(1500.0, 60.0, 0.06), Some(at(9, 0)));
    let idle = RatedParty::new(Rating::new(1500.0, 60.0, 0.06), Some(at(0, 0)));

    let (_, fresh_update) = rate_attempt(&updater, &fresh, &puzzle_party, "e2e4");
    let (_, idle_update) = rate_attempt(&updater, &idle, &puzzle_party, "e2e4");
    assert!(idle_update.solver.value - 1500.0 > fresh_update.solver.value - 1500.0);
}

#[test]
fn repeated_attempts_stay_in_bounds() {
    let updater = RatingUpdater::default();
    let config = updater.config().clone();
    let mut solver = RatedParty::new(Rating::default(), None);
    let mut puzzle_party = RatedParty::new(Rating::default(), None);

    for i in 0..30 {
        let mv = if i % 4 == 0 { "d2d4" } else { "e2e4" };
        let (_, update) = rate_attempt(&updater, &solver, &puzzle_party, mv);
        for r in [update.solver, update.puzzle] {
            assert!(r.deviation >= config.min_deviation);
            assert!(r.deviation <= config.max_deviation);
            assert!(r.value.is_finite());
        }
        solver = RatedParty::new(update.solver, Some(at(9, 3)));
        puzzle_party = RatedParty::new(update.puzzle, Some(at(9, 3)));
    }
    assert!(solver.rating.value > puzzle_party.rating.value);
}
