use crate::config::GameConfig;
use crate::expiration::ExpirationMonitor;
use crate::motion::{Vec3, WaiterMotion};
use crate::records::{MemoryRecords, RecordsDb, RunRecords};
use crate::request::{Request, TableId};
use crate::scene::TableLayout;
use crate::scheduler::RequestScheduler;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// One-shot notifications drained by the host each step. The motion
/// controller consumes `Resolved` internally; all three are surfaced for
/// the UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    Resolved { table: TableId },
    Missed { table: TableId },
    GameOver { elapsed: Duration, new_best: bool },
}

/// Displayed session fields. `over` and `started` are never both true;
/// `missed_count` resets on start and saturates the session at the miss
/// limit.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub started: bool,
    pub over: bool,
    pub missed_count: u8,
    pub started_at: Option<SystemTime>,
    pub elapsed_at_game_over: Duration,
    pub best_elapsed: Duration,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            started: false,
            over: false,
            missed_count: 0,
            started_at: None,
            elapsed_at_game_over: Duration::ZERO,
            best_elapsed: Duration::ZERO,
        }
    }
}

/// Top-level orchestrator: owns session state, the request scheduler, the
/// expiration monitor, and the waiter. Hosts call `click`/`start`/`restart`
/// on input, `advance` with the current time to run due timers, and
/// `on_frame` once per render tick.
///
/// All timer work happens inside `advance`, which processes due deadlines
/// in chronological order and runs each to completion, so a game-over
/// transition cancels the remaining timers before they can fire.
#[derive(Debug)]
pub struct GameSession {
    config: GameConfig,
    state: SessionState,
    scheduler: RequestScheduler,
    monitor: ExpirationMonitor,
    waiter: WaiterMotion,
    records: Box<dyn RunRecords>,
    events: Vec<GameEvent>,
}

impl GameSession {
    /// Production session: SQLite-backed records, entropy-seeded requests.
    pub fn new(config: GameConfig) -> Self {
        let records: Box<dyn RunRecords> = match RecordsDb::new() {
            Ok(db) => Box::new(db),
            Err(err) => {
                warn!("run records unavailable, keeping best time in memory: {err}");
                Box::new(MemoryRecords::default())
            }
        };
        Self::build(config, records, None)
    }

    pub fn with_records(config: GameConfig, records: Box<dyn RunRecords>) -> Self {
        Self::build(config, records, None)
    }

    /// Deterministic session for tests: seeded RNG, in-memory records.
    pub fn seeded(config: GameConfig, seed: u64) -> Self {
        Self::build(config, Box::new(MemoryRecords::default()), Some(seed))
    }

    pub fn seeded_with_records(
        config: GameConfig,
        seed: u64,
        records: Box<dyn RunRecords>,
    ) -> Self {
        Self::build(config, records, Some(seed))
    }

    fn build(config: GameConfig, records: Box<dyn RunRecords>, seed: Option<u64>) -> Self {
        let scheduler = match seed {
            Some(seed) => RequestScheduler::seeded(&config, seed),
            None => RequestScheduler::new(&config),
        };
        let monitor = ExpirationMonitor::new(config.poll_interval());
        let waiter = WaiterMotion::new(
            TableLayout::default(),
            config.waiter_speed,
            config.arrival_epsilon,
        );
        let best_elapsed = match records.load_best() {
            Ok(best) => best.unwrap_or(Duration::ZERO),
            Err(err) => {
                warn!("could not read best time: {err}");
                Duration::ZERO
            }
        };
        let state = SessionState {
            best_elapsed,
            ..SessionState::default()
        };
        Self {
            config,
            state,
            scheduler,
            monitor,
            waiter,
            records,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn current_request(&self) -> Option<&Request> {
        self.scheduler.current()
    }

    pub fn pending_len(&self) -> usize {
        self.scheduler.pending_len()
    }

    pub fn waiter_position(&self) -> Vec3 {
        self.waiter.position()
    }

    pub fn waiter_moving(&self) -> bool {
        self.waiter.moving()
    }

    /// Drain events accumulated since the last call.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Begin a session. A timer still armed here is a defect (the previous
    /// session failed to cancel); fatal in debug, cancelled in release.
    pub fn start(&mut self, now: SystemTime) {
        debug_assert!(
            !self.scheduler.interval_armed() && !self.monitor.running(),
            "timer leaked into start()"
        );
        self.scheduler.stop();
        self.monitor.stop();
        self.waiter.clear_travel();

        self.state.started = true;
        self.state.over = false;
        self.state.missed_count = 0;
        self.state.started_at = Some(now);
        self.state.elapsed_at_game_over = Duration::ZERO;

        self.scheduler.start(now);
        self.monitor.start(now);
        debug!("session started");
    }

    /// Full reset followed by a fresh start.
    pub fn restart(&mut self, now: SystemTime) {
        self.stop();
        self.start(now);
    }

    /// Cancel both timers, clear all request and travel state, and return
    /// to the idle (not started, not over) state.
    pub fn stop(&mut self) {
        self.scheduler.stop();
        self.monitor.stop();
        self.waiter.clear_travel();
        self.state.started = false;
        self.state.over = false;
        self.state.started_at = None;
    }

    /// A pointer interaction resolved to `table`. Only meaningful while a
    /// session is active; wrong-table and late clicks are ignored without
    /// penalty (the expiration path stays in flight).
    pub fn click(&mut self, table: TableId, now: SystemTime) {
        if !self.state.started || self.state.over {
            return;
        }
        if table == 0 || table > self.config.table_count {
            return;
        }
        if self.scheduler.try_resolve(table, now) {
            self.waiter.enqueue(table);
            self.events.push(GameEvent::Resolved { table });
        }
    }

    /// Run every timer due at or before `now`, in chronological order of
    /// due times. Each firing runs to completion before the next is
    /// examined; once the session goes over, remaining deadlines are gone
    /// and the loop exits.
    pub fn advance(&mut self, now: SystemTime) {
        while self.state.started && !self.state.over {
            let poll_due = self.monitor.next_poll_at().filter(|at| *at <= now);
            let interval_due = self.scheduler.next_interval_at().filter(|at| *at <= now);
            match (poll_due, interval_due) {
                (None, None) => break,
                (Some(poll_at), Some(interval_at)) if interval_at < poll_at => {
                    self.scheduler.on_interval_elapsed(interval_at);
                }
                (Some(poll_at), _) => self.fire_poll(poll_at),
                (None, Some(interval_at)) => self.scheduler.on_interval_elapsed(interval_at),
            }
        }
    }

    /// Advance the waiter one render tick.
    pub fn on_frame(&mut self, dt: Duration) {
        self.waiter.tick(dt);
    }

    /// One expiration poll at its due time.
    fn fire_poll(&mut self, at: SystemTime) {
        self.monitor.reschedule();
        if let Some(table) = self.scheduler.expired(at) {
            self.state.missed_count += 1;
            self.events.push(GameEvent::Missed { table });
            debug!(table, missed = self.state.missed_count, "request missed");
            if self.state.missed_count >= self.config.miss_limit {
                self.finish(at);
            } else {
                self.scheduler.rotate(at);
            }
        }
    }

    /// The miss limit was reached: record the run, flip to game over, and
    /// cancel both timers synchronously.
    fn finish(&mut self, at: SystemTime) {
        let elapsed = self
            .state
            .started_at
            .and_then(|started| at.duration_since(started).ok())
            .unwrap_or_default();
        self.state.elapsed_at_game_over = elapsed;

        let new_best = elapsed > self.state.best_elapsed;
        if new_best {
            self.state.best_elapsed = elapsed;
        }
        if let Err(err) = self.records.record_run(elapsed) {
            warn!("could not record run, best time kept in memory: {err}");
        }

        self.state.over = true;
        self.state.started = false;
        self.scheduler.stop();
        self.monitor.stop();
        self.events.push(GameEvent::GameOver { elapsed, new_best });
        debug!(?elapsed, new_best, "session over");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn t(ms: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_millis(ms)
    }

    fn session() -> GameSession {
        GameSession::seeded(GameConfig::default(), 21)
    }

    #[test]
    fn new_session_is_idle() {
        let s = session();
        assert!(!s.state().started);
        assert!(!s.state().over);
        assert_eq!(s.state().missed_count, 0);
        assert!(s.current_request().is_none());
    }

    #[test]
    fn start_resets_state_and_surfaces_a_request() {
        let mut s = session();
        s.start(t(0));
        assert!(s.state().started);
        assert!(!s.state().over);
        assert_eq!(s.state().missed_count, 0);
        assert_eq!(s.state().started_at, Some(t(0)));
        assert!(s.current_request().is_some());
    }

    #[test]
    fn clicks_before_start_do_nothing() {
        let mut s = session();
        for table in 1..=6 {
            s.click(table, t(0));
        }
        assert!(s.drain_events().is_empty());
        assert!(s.current_request().is_none());
    }

    #[test]
    fn click_on_current_table_resolves_and_queues_travel() {
        let mut s = session();
        s.start(t(0));
        let table = s.current_request().unwrap().table;
        s.click(table, t(500));
        assert_eq!(s.drain_events(), vec![GameEvent::Resolved { table }]);
        assert_eq!(s.state().missed_count, 0);
        // New current request stamped at click time.
        assert_eq!(s.current_request().unwrap().created_at, t(500));
        // Waiter heads for the resolved table.
        s.on_frame(Duration::from_millis(100));
        assert!(s.waiter_moving());
    }

    #[test]
    fn out_of_range_table_ids_are_ignored() {
        let mut s = session();
        s.start(t(0));
        let before = *s.current_request().unwrap();
        s.click(0, t(100));
        s.click(7, t(100));
        assert!(s.drain_events().is_empty());
        assert_eq!(s.current_request(), Some(&before));
    }

    #[test]
    fn miss_detected_within_one_poll_of_budget() {
        let mut s = session();
        s.start(t(0));
        // Budget ends at 2000; nothing missed on the poll just before.
        s.advance(t(1900));
        assert_eq!(s.state().missed_count, 0);
        s.advance(t(2000));
        assert_eq!(s.state().missed_count, 1);
    }

    #[test]
    fn miss_rotates_and_emits_event() {
        let mut s = session();
        s.start(t(0));
        let first = s.current_request().unwrap().table;
        s.advance(t(2000));
        assert_matches!(
            s.drain_events().as_slice(),
            [GameEvent::Missed { table }] if *table == first
        );
        // Replacement request stamped at the poll that detected the miss.
        assert_eq!(s.current_request().unwrap().created_at, t(2000));
    }

    #[test]
    fn missed_request_does_not_move_the_waiter() {
        let mut s = session();
        s.start(t(0));
        s.advance(t(2000));
        s.on_frame(Duration::from_millis(100));
        assert!(!s.waiter_moving());
    }

    #[test]
    fn game_over_at_exactly_the_miss_limit() {
        let mut s = session();
        s.start(t(0));
        s.advance(t(120_000));
        assert!(s.state().over);
        assert!(!s.state().started);
        assert_eq!(s.state().missed_count, 10);
        assert!(s.current_request().is_none());
        assert_eq!(s.pending_len(), 0);
        let events = s.drain_events();
        assert_matches!(events.last(), Some(GameEvent::GameOver { .. }));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, GameEvent::Missed { .. }))
                .count(),
            10
        );
    }

    #[test]
    fn no_timer_fires_after_game_over() {
        let mut s = session();
        s.start(t(0));
        s.advance(t(120_000));
        assert!(s.state().over);
        let state = s.state().clone();
        s.advance(t(600_000));
        assert_eq!(s.state(), &state);
        assert!(s.drain_events().is_empty());
    }

    #[test]
    fn first_game_over_sets_the_best_time() {
        let mut s = session();
        s.start(t(0));
        s.advance(t(120_000));
        let elapsed = s.state().elapsed_at_game_over;
        assert!(elapsed > Duration::ZERO);
        assert_eq!(s.state().best_elapsed, elapsed);
        assert_matches!(
            s.drain_events().last(),
            Some(GameEvent::GameOver { new_best: true, .. })
        );
    }

    #[test]
    fn shorter_run_keeps_the_old_best() {
        let mut records = MemoryRecords::default();
        records.record_run(Duration::from_secs(600)).unwrap();
        let mut s =
            GameSession::seeded_with_records(GameConfig::default(), 21, Box::new(records));
        assert_eq!(s.state().best_elapsed, Duration::from_secs(600));

        s.start(t(0));
        s.advance(t(120_000));
        assert!(s.state().over);
        assert!(s.state().elapsed_at_game_over < Duration::from_secs(600));
        assert_eq!(s.state().best_elapsed, Duration::from_secs(600));
        assert_matches!(
            s.drain_events().last(),
            Some(GameEvent::GameOver { new_best: false, .. })
        );
    }

    #[test]
    fn restart_after_game_over_resets_everything() {
        let mut s = session();
        s.start(t(0));
        s.advance(t(120_000));
        assert!(s.state().over);
        let best = s.state().best_elapsed;

        s.restart(t(200_000));
        assert!(s.state().started);
        assert!(!s.state().over);
        assert_eq!(s.state().missed_count, 0);
        assert_eq!(s.state().started_at, Some(t(200_000)));
        assert_eq!(s.state().best_elapsed, best);
        assert!(s.current_request().is_some());
        assert_eq!(s.pending_len(), 0);
    }

    #[test]
    fn restart_mid_session_cancels_previous_timers() {
        let mut s = session();
        s.start(t(0));
        s.advance(t(2000));
        assert_eq!(s.state().missed_count, 1);

        s.restart(t(3000));
        assert_eq!(s.state().missed_count, 0);
        // The old session's deadlines are gone: nothing is due before the
        // new session's own schedule.
        s.advance(t(3050));
        assert_eq!(s.state().missed_count, 0);
        assert_eq!(s.current_request().unwrap().created_at, t(3000));
    }

    #[test]
    fn stop_cancels_without_entering_game_over() {
        let mut s = session();
        s.start(t(0));
        s.stop();
        assert!(!s.state().started);
        assert!(!s.state().over);
        assert!(s.current_request().is_none());
        s.advance(t(60_000));
        assert_eq!(s.state().missed_count, 0);
    }

    #[test]
    fn started_and_over_are_never_both_true() {
        let mut s = session();
        s.start(t(0));
        assert!(s.state().started && !s.state().over);
        s.advance(t(120_000));
        assert!(!s.state().started && s.state().over);
        s.restart(t(130_000));
        assert!(s.state().started && !s.state().over);
    }

    #[test]
    fn interval_displacement_grows_the_backlog() {
        // Pin the interval so the firing time is known, and stretch the
        // budget so no miss interferes.
        let cfg = GameConfig {
            interval_min_ms: 1000,
            interval_max_ms: 1001,
            response_budget_ms: 60_000,
            ..GameConfig::default()
        };
        let mut s = GameSession::seeded(cfg, 5);
        s.start(t(0));
        let first = *s.current_request().unwrap();

        s.advance(t(1000));
        assert_eq!(s.pending_len(), 1);
        let second = s.current_request().unwrap();
        assert_eq!(second.created_at, t(1000));
        assert!(second.created_at > first.created_at);

        s.advance(t(2000));
        assert_eq!(s.pending_len(), 2);
    }

    #[test]
    fn displaced_head_surfaces_after_expiration_in_fifo_order() {
        // Fixed 2500ms interval with the stock 2000ms budget: the first
        // request misses at 2000, its replacement is displaced at 2500 and
        // must resurface, restamped, when the current one expires at 4500.
        let cfg = GameConfig {
            interval_min_ms: 2500,
            interval_max_ms: 2501,
            ..GameConfig::default()
        };
        let mut s = GameSession::seeded(cfg, 5);
        s.start(t(0));

        s.advance(t(2000));
        assert_eq!(s.state().missed_count, 1);
        let displaced = *s.current_request().unwrap();

        s.advance(t(2500));
        assert_eq!(s.pending_len(), 1);
        assert_ne!(s.current_request().unwrap().created_at, displaced.created_at);

        s.advance(t(4500));
        assert_eq!(s.state().missed_count, 2);
        assert_eq!(s.pending_len(), 0);
        let resurfaced = s.current_request().unwrap();
        assert_eq!(resurfaced.table, displaced.table);
        assert_eq!(resurfaced.text, displaced.text);
        assert_eq!(resurfaced.created_at, t(4500));
    }

    #[test]
    fn missed_count_is_monotone_while_started() {
        let mut s = session();
        s.start(t(0));
        let mut last = 0;
        for ms in (0..=60_000).step_by(100) {
            s.advance(t(ms));
            if s.state().over {
                break;
            }
            assert!(s.state().missed_count >= last);
            last = s.state().missed_count;
        }
    }
}
