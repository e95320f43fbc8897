//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → metrics exporter → source → cache → first refresh
//!            → periodic refresh → daily refresh
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger()
//!
//! Shutdown (shutdown.rs / Runtime::teardown):
//!     Trigger → disarm schedules → wait for the daily driver → exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: nothing is scheduled until the first refresh has run
//! - In-flight refreshes are not cancelled; they finish against a cache that
//!   no longer reschedules

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{MarketCache, Runtime, StartupError};
