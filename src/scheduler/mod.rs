//! Scheduling primitives.
//!
//! # Data Flow
//! ```text
//! interval.rs:
//!     tick every N → previous run finished? → spawn run
//!                                   └─ no → observer.on_skip (tick dropped)
//!
//! daily.rs:
//!     clock.now() → next H:00 UTC → sleep until then → run → recompute
//! ```
//!
//! # Design Decisions
//! - All timers use `tokio::time`; tests drive them with a paused runtime
//! - Wall-clock reads go through the injectable `Clock`
//! - `stop()` disarms future ticks only; it is not a cancellation token

pub mod clock;
pub mod daily;
pub mod interval;
pub mod task;

pub use clock::{AnchoredClock, Clock, SystemClock};
pub use daily::{next_occurrence, spawn_daily_at_utc};
pub use interval::spawn_interval;
pub use task::{NoopObserver, ScheduledTask, SchedulerError, SharedObserver, TaskObserver, Trigger};
