//! Request Handling
//!
//! Maps protocol messages onto the contest engine. The engine sits behind a
//! single async mutex, so every call is one serialized state transition and
//! `now` is read while that lock is held.

use std::path::PathBuf;

use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::contest::{ContestEngine, ContestError, MemoryLedger, NotificationSink, Snapshot};
use crate::core::account::{AccountId, Timestamp};
use crate::core::codec::{encode_alpha, encode_beta};
use crate::core::signature::{verify_alpha, verify_beta};
use crate::network::protocol::{ClientMessage, ErrorCode, ServerMessage};

/// Source of the current time (unix seconds).
pub type Clock = Box<dyn Fn() -> Timestamp + Send + Sync>;

/// Wall clock.
pub fn system_clock() -> Timestamp {
    chrono::Utc::now().timestamp().max(0) as Timestamp
}

/// Serialized access to the engine.
pub struct Handler<S> {
    engine: Mutex<ContestEngine<MemoryLedger, S>>,
    state_path: Option<PathBuf>,
    clock: Clock,
}

impl<S: NotificationSink + Send> Handler<S> {
    /// Create a handler using the wall clock.
    pub fn new(engine: ContestEngine<MemoryLedger, S>, state_path: Option<PathBuf>) -> Self {
        Self::with_clock(engine, state_path, Box::new(system_clock))
    }

    /// Create a handler with a custom clock.
    pub fn with_clock(
        engine: ContestEngine<MemoryLedger, S>,
        state_path: Option<PathBuf>,
        clock: Clock,
    ) -> Self {
        Self {
            engine: Mutex::new(engine),
            state_path,
            clock,
        }
    }

    /// Handle one request from `caller` (None if the connection is not
    /// authenticated).
    pub async fn handle(&self, caller: Option<AccountId>, msg: ClientMessage) -> ServerMessage {
        let mut engine = self.engine.lock().await;

        match msg {
            ClientMessage::Mint { to, amount } => {
                let Some(caller) = caller else {
                    return not_authenticated();
                };
                match engine.mint(&to, amount, &caller) {
                    Ok(()) => {
                        self.persist(&engine);
                        ServerMessage::Minted {
                            to,
                            amount,
                            balance: engine.balance_of(&to),
                            total_supply: engine.total_supply(),
                        }
                    }
                    Err(e) => contest_error(e),
                }
            }

            ClientMessage::Unlock { account } => {
                let Some(caller) = caller else {
                    return not_authenticated();
                };
                match engine.unlock(&account, &caller) {
                    Ok(()) => {
                        self.persist(&engine);
                        ServerMessage::Unlocked {
                            account,
                            generation: engine.lock_generation(&account),
                        }
                    }
                    Err(e) => contest_error(e),
                }
            }

            ClientMessage::Contest(request) => {
                // Anonymous relayers are recorded as the zero account.
                let caller = caller.unwrap_or_default();
                let now = (self.clock)();
                match engine.contest(&caller, &request, now) {
                    Ok(event) => {
                        self.persist(&engine);
                        ServerMessage::ContestAccepted(event)
                    }
                    Err(e) => contest_error(e),
                }
            }

            ClientMessage::AlphaEncoding(terms) => {
                ServerMessage::encoding(&encode_alpha(&terms.from, &terms.to, terms.value, terms.t0, terms.t1))
            }

            ClientMessage::BetaEncoding { alpha_signature } => {
                ServerMessage::encoding(&encode_beta(&alpha_signature))
            }

            ClientMessage::VerifyAlpha { from, to, value, t0, t1, signer, signature } => {
                ServerMessage::Verification {
                    valid: verify_alpha(&from, &to, value, t0, t1, &signer, &signature),
                }
            }

            ClientMessage::VerifyBeta { alpha_signature, signer, signature } => {
                ServerMessage::Verification {
                    valid: verify_beta(&alpha_signature, &signer, &signature),
                }
            }

            ClientMessage::Balance { account } => ServerMessage::Balance {
                account,
                balance: engine.balance_of(&account),
            },

            ClientMessage::TotalSupply => ServerMessage::TotalSupply {
                total_supply: engine.total_supply(),
            },

            ClientMessage::LockStatus { account } => ServerMessage::LockStatus {
                account,
                locked: engine.is_locked(&account),
                generation: engine.lock_generation(&account),
            },

            ClientMessage::Ping { timestamp } => ServerMessage::Pong {
                timestamp,
                server_time: chrono::Utc::now().timestamp_millis().max(0) as u64,
            },

            ClientMessage::Auth(_) => {
                debug!("Auth message reached the request handler");
                ServerMessage::error(ErrorCode::InvalidInput, "auth is handled by the connection")
            }
        }
    }

    /// Run `f` against the engine under the lock.
    pub async fn with_engine<R>(&self, f: impl FnOnce(&ContestEngine<MemoryLedger, S>) -> R) -> R {
        let engine = self.engine.lock().await;
        f(&engine)
    }

    fn persist(&self, engine: &ContestEngine<MemoryLedger, S>) {
        let Some(path) = &self.state_path else {
            return;
        };
        if let Err(e) = Snapshot::capture(engine).save(path) {
            error!("Failed to persist state to {}: {}", path.display(), e);
        }
    }
}

fn not_authenticated() -> ServerMessage {
    ServerMessage::error(ErrorCode::NotAuthenticated, "Must authenticate first")
}

fn contest_error(e: ContestError) -> ServerMessage {
    ServerMessage::error(e.kind().into(), e.to_string())
}
