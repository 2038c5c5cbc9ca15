use std::time::{Duration, SystemTime};

use tablerush::records::{RecordsDb, RunRecords};
use tablerush::{GameConfig, GameSession};
use tempfile::tempdir;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn quick_cfg() -> GameConfig {
    GameConfig {
        response_budget_ms: 200,
        poll_interval_ms: 50,
        miss_limit: 2,
        ..GameConfig::default()
    }
}

#[test]
fn game_over_is_recorded_and_reloaded_as_the_best() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.db");

    let records = RecordsDb::open(&path).unwrap();
    let mut s = GameSession::seeded_with_records(quick_cfg(), 2, Box::new(records));
    let t0 = SystemTime::UNIX_EPOCH;
    s.start(t0);
    s.advance(t0 + ms(5_000));
    assert!(s.state().over);
    let elapsed = s.state().elapsed_at_game_over;
    assert!(elapsed > Duration::ZERO);

    // A later session over the same database starts from the recorded best.
    let records = RecordsDb::open(&path).unwrap();
    let s2 = GameSession::seeded_with_records(quick_cfg(), 2, Box::new(records));
    assert_eq!(s2.state().best_elapsed, elapsed);
}

#[test]
fn only_the_longest_run_counts() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.db");

    // Seed the history with a long run.
    let mut store = RecordsDb::open(&path).unwrap();
    store.record_run(Duration::from_secs(90)).unwrap();
    drop(store);

    let records = RecordsDb::open(&path).unwrap();
    let mut s = GameSession::seeded_with_records(quick_cfg(), 4, Box::new(records));
    assert_eq!(s.state().best_elapsed, Duration::from_secs(90));

    let t0 = SystemTime::UNIX_EPOCH;
    s.start(t0);
    s.advance(t0 + ms(5_000));
    assert!(s.state().over);
    assert!(s.state().elapsed_at_game_over < Duration::from_secs(90));
    // The short run is on record but the best is unchanged.
    assert_eq!(s.state().best_elapsed, Duration::from_secs(90));

    let reopened = RecordsDb::open(&path).unwrap();
    assert_eq!(
        reopened.load_best().unwrap(),
        Some(Duration::from_secs(90))
    );
}

#[test]
fn every_finished_run_lands_in_the_history() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.db");

    let records = RecordsDb::open(&path).unwrap();
    let mut s = GameSession::seeded_with_records(quick_cfg(), 6, Box::new(records));
    let t0 = SystemTime::UNIX_EPOCH;

    s.start(t0);
    s.advance(t0 + ms(5_000));
    assert!(s.state().over);
    let first = s.state().elapsed_at_game_over;

    s.restart(t0 + ms(10_000));
    s.advance(t0 + ms(20_000));
    assert!(s.state().over);

    // Both runs finished at the same miss pace, so the reloaded best
    // equals either elapsed time.
    let reopened = RecordsDb::open(&path).unwrap();
    assert_eq!(reopened.load_best().unwrap(), Some(first));
}
