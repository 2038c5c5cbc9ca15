// Library surface for the game core; rendering/UI hosts drive it through
// GameSession and the runtime Runner.
pub mod config;
pub mod expiration;
pub mod motion;
pub mod records;
pub mod request;
pub mod runtime;
pub mod scene;
pub mod scheduler;
pub mod session;

/// Cadence of the expiration monitor and the default host tick, in ms.
pub const TICK_RATE_MS: u64 = 100;

pub use config::GameConfig;
pub use request::{Request, TableId};
pub use session::{GameEvent, GameSession, SessionState};
