//! Network Layer
//!
//! WebSocket front end for the contest engine.
//! This layer owns the wall clock and caller identity; all state lives in `contest/`.

pub mod auth;
pub mod protocol;
pub mod handler;
pub mod server;

pub use auth::{AuthConfig, TokenClaims, AuthError, authenticate, validate_token};
pub use protocol::{ClientMessage, ServerMessage, AuthRequest, AuthResult, ErrorCode};
pub use handler::Handler;
pub use server::{ContestServer, ServerConfig, ServerError};
