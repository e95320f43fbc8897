//! Refresh-coordinated cache subsystem.
//!
//! # Data Flow
//! ```text
//! interval tick / force_refresh()
//!     → refresh_cache() (single-flight; overlapping calls return Skipped)
//!     → fetch records  ─┐  each through retry + per-attempt timeout,
//!     → fetch aggregate ─┘  each failure isolated to its sub-resource
//!     → new Snapshot swapped in, last_updated advanced once
//!
//! Readers (route handlers, health checks):
//!     get_records() / get_aggregate() / get_cache_status() / has_data()
//!     → load current Arc<Snapshot>; never wait, never fetch
//! ```

pub mod refresh;
pub mod snapshot;
pub mod source;
pub mod status;

pub use refresh::{CacheOptions, RefreshCache};
pub use snapshot::{CacheRead, Snapshot};
pub use source::SnapshotSource;
pub use status::{CacheStatus, RefreshOutcome, RefreshReport};
