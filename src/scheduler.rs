use crate::config::GameConfig;
use crate::request::{Request, RequestGenerator, TableId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// A request displaced from the current slot. The timestamp is stripped;
/// the request is re-stamped when it becomes current again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueuedRequest {
    pub table: TableId,
    pub text: &'static str,
}

/// Owns the current request, the FIFO backlog behind it, and the randomized
/// interval on which a fresh request displaces the current one.
#[derive(Debug)]
pub struct RequestScheduler {
    generator: RequestGenerator,
    jitter: StdRng,
    current: Option<Request>,
    pending: VecDeque<QueuedRequest>,
    next_interval_at: Option<SystemTime>,
    interval_min_ms: u64,
    interval_max_ms: u64,
    response_budget: Duration,
}

impl RequestScheduler {
    pub fn new(cfg: &GameConfig) -> Self {
        Self::build(cfg, RequestGenerator::new(cfg.table_count), StdRng::from_entropy())
    }

    /// Deterministic scheduler for tests: seeds both the request generator
    /// and the interval jitter.
    pub fn seeded(cfg: &GameConfig, seed: u64) -> Self {
        Self::build(
            cfg,
            RequestGenerator::seeded(cfg.table_count, seed),
            StdRng::seed_from_u64(seed ^ 0x9e37_79b9),
        )
    }

    fn build(cfg: &GameConfig, generator: RequestGenerator, jitter: StdRng) -> Self {
        Self {
            generator,
            jitter,
            current: None,
            pending: VecDeque::new(),
            next_interval_at: None,
            interval_min_ms: cfg.interval_min_ms,
            interval_max_ms: cfg.interval_max_ms,
            response_budget: cfg.response_budget(),
        }
    }

    /// Begin serving: first current request, interval armed. Any previous
    /// session must have been stopped first.
    pub fn start(&mut self, now: SystemTime) {
        debug_assert!(
            self.next_interval_at.is_none(),
            "interval timer leaked across sessions"
        );
        self.current = Some(self.generator.generate(now));
        self.pending.clear();
        self.arm_interval(now);
    }

    /// Tear down: clears both request containers and disarms the interval.
    pub fn stop(&mut self) {
        self.current = None;
        self.pending.clear();
        self.next_interval_at = None;
    }

    pub fn current(&self) -> Option<&Request> {
        self.current.as_ref()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn interval_armed(&self) -> bool {
        self.next_interval_at.is_some()
    }

    pub fn next_interval_at(&self) -> Option<SystemTime> {
        self.next_interval_at
    }

    fn arm_interval(&mut self, now: SystemTime) {
        let span = if self.interval_max_ms > self.interval_min_ms {
            self.jitter.gen_range(self.interval_min_ms..self.interval_max_ms)
        } else {
            self.interval_min_ms
        };
        self.next_interval_at = Some(now + Duration::from_millis(span));
    }

    /// The randomized interval fired: the current request (if any) moves to
    /// the back of the backlog, stripped of its timestamp, and a freshly
    /// generated request takes the current slot. Re-arms with a new delay.
    pub fn on_interval_elapsed(&mut self, now: SystemTime) {
        if let Some(cur) = self.current.take() {
            self.pending.push_back(QueuedRequest {
                table: cur.table,
                text: cur.text,
            });
        }
        self.current = Some(self.generator.generate(now));
        self.arm_interval(now);
        debug!(backlog = self.pending.len(), "interval displaced current request");
    }

    /// A click on `table`. Succeeds iff the current request matches and is
    /// still strictly inside the response budget; on success the queue
    /// rotates. Anything else is silently ignored.
    pub fn try_resolve(&mut self, table: TableId, now: SystemTime) -> bool {
        let Some(current) = self.current.as_ref() else {
            return false;
        };
        if current.table != table {
            return false;
        }
        if current.age(now) >= self.response_budget {
            return false;
        }
        self.rotate(now);
        true
    }

    /// The table of the current request if it has outlived its budget.
    pub fn expired(&self, now: SystemTime) -> Option<TableId> {
        self.current
            .as_ref()
            .filter(|req| req.age(now) >= self.response_budget)
            .map(|req| req.table)
    }

    /// Surface the next request: pop-and-restamp the backlog head, or
    /// generate a brand-new one. Shared by the click and miss paths.
    pub fn rotate(&mut self, now: SystemTime) {
        self.current = Some(match self.pending.pop_front() {
            Some(q) => Request {
                table: q.table,
                text: q.text,
                created_at: now,
            },
            None => self.generator.generate(now),
        });
    }
}
