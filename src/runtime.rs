use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, SystemTime};

use crate::request::TableId;
use crate::session::GameSession;

/// Unified event type consumed by the engine driver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HostEvent {
    /// A pointer interaction hit-tested to a table.
    TableClick(TableId),
    /// The player asked for a fresh session.
    Restart,
    Tick,
}

/// Source of host events (hit-tested clicks, restart presses, etc.)
pub trait HostEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<HostEvent, RecvTimeoutError>;
}

/// Production event source fed by the rendering host's input thread.
pub struct ChannelEventSource {
    rx: Receiver<HostEvent>,
}

impl ChannelEventSource {
    /// Returns the sender half for the host to push hit-test results into.
    pub fn new() -> (Sender<HostEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }
}

impl HostEventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<HostEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for FixedTicker {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::TICK_RATE_MS))
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<HostEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<HostEvent>) -> Self {
        Self { rx }
    }
}

impl HostEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<HostEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the game one event/tick at a time.
pub struct Runner<E: HostEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: HostEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> HostEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                HostEvent::Tick
            }
        }
    }

    /// One iteration of the production loop: wait for the next event, run
    /// due timers against the wall clock, then apply the event. Ticks also
    /// advance the waiter by one tick interval.
    pub fn pump(&self, session: &mut GameSession) -> HostEvent {
        let ev = self.step();
        let now = SystemTime::now();
        session.advance(now);
        match ev {
            HostEvent::TableClick(table) => session.click(table, now),
            HostEvent::Restart => session.restart(now),
            HostEvent::Tick => session.on_frame(self.ticker.interval()),
        }
        ev
    }
}
