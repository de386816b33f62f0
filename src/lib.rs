//! # PBT Contest Server
//!
//! Two-party signed transfers with per-account replay locks.
//!
//! A proposer signs an *alpha* commitment over `(from, to, value, t0, t1)`; the
//! recipient countersigns a *beta* commitment over the alpha signature. Anyone
//! holding both signatures may submit the pair. A valid submission moves the
//! value and locks the proposer until they unlock themselves.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      PBT SERVER                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── account.rs  - Account ids, balances, timestamps         │
//! │  ├── hash.rs     - Domain-separated SHA-256                  │
//! │  ├── codec.rs    - Alpha/beta canonical encodings            │
//! │  └── signature.rs- Ed25519 envelopes and signer recovery     │
//! │                                                              │
//! │  contest/        - State machine                             │
//! │  ├── lock.rs     - Per-account replay locks                  │
//! │  ├── ledger.rs   - Token balances and minting                │
//! │  ├── events.rs   - ContestStarted notifications              │
//! │  ├── engine.rs   - Contest verification and execution        │
//! │  └── snapshot.rs - Persistent state                          │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── auth.rs     - JWT caller authentication                 │
//! │  ├── protocol.rs - Message types                             │
//! │  ├── handler.rs  - Serialized request handling               │
//! │  └── server.rs   - WebSocket server                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! `core/` and `contest/` never read the clock: the current time is an
//! argument to every call that needs it, and all maps are `BTreeMap`s.
//! Replaying the same calls against the same state gives the same result.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod contest;
pub mod network;

// Re-export commonly used types
pub use crate::core::account::{AccountId, Balance, Timestamp};
pub use crate::core::signature::{Keypair, Signature};
pub use crate::contest::{
    ContestConfig, ContestEngine, ContestError, ContestRequest, ContestStarted, Ledger,
    MemoryLedger, NotificationSink,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
