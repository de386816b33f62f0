//! Contest state machine.
//!
//! Per-account replay locks, the token ledger, and the engine that checks
//! both signatures before moving value.
//!
//! ```text
//!            contest ok (as from)
//!   Unlocked ───────────────────────▶ Locked ──┐ any contest: LockedError
//!       ▲                              │  ◀────┘
//!       └──────── unlock (self) ───────┘
//! ```

pub mod error;
pub mod lock;
pub mod ledger;
pub mod events;
pub mod engine;
pub mod snapshot;

pub use error::{Commitment, ContestError, ErrorKind};
pub use lock::LockRegistry;
pub use ledger::{Ledger, MemoryLedger};
pub use events::{BroadcastSink, ContestStarted, NotificationSink, RecordingSink};
pub use engine::{ContestConfig, ContestEngine, ContestRequest};
pub use snapshot::{Snapshot, SnapshotError};
