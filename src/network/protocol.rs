//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are JSON; account ids, digests and signatures are hex strings.

use serde::{Serialize, Deserialize};

use crate::contest::{ContestRequest, ContestStarted, ErrorKind};
use crate::core::account::{AccountId, Balance, Timestamp};
use crate::core::hash::MessageDigest;
use crate::core::signature::Signature;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Authenticate the connection as an account.
    Auth(AuthRequest),

    /// Mint tokens (owner only).
    Mint {
        /// Receiving account.
        to: AccountId,
        /// Amount to create.
        amount: Balance,
    },

    /// Clear an account's replay lock (the account itself only).
    Unlock {
        /// Account to unlock.
        account: AccountId,
    },

    /// Submit a signed transfer.
    Contest(ContestRequest),

    /// Compute the alpha digest a proposer must sign.
    AlphaEncoding(AlphaTerms),

    /// Compute the beta digest a recipient must sign.
    BetaEncoding {
        /// Alpha signature being countersigned.
        alpha_signature: Signature,
    },

    /// Check an alpha signature.
    VerifyAlpha {
        /// Proposing account.
        from: AccountId,
        /// Receiving account.
        to: AccountId,
        /// Amount.
        value: Balance,
        /// Window start.
        t0: Timestamp,
        /// Window end.
        t1: Timestamp,
        /// Claimed signer.
        signer: AccountId,
        /// Signature to check.
        signature: Signature,
    },

    /// Check a beta signature.
    VerifyBeta {
        /// Alpha signature the beta should cover.
        alpha_signature: Signature,
        /// Claimed signer.
        signer: AccountId,
        /// Signature to check.
        signature: Signature,
    },

    /// Query a balance.
    Balance {
        /// Account to query.
        account: AccountId,
    },

    /// Query the total supply.
    TotalSupply,

    /// Query an account's lock.
    LockStatus {
        /// Account to query.
        account: AccountId,
    },

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp, echoed back.
        timestamp: u64,
    },
}

/// Authentication request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    /// Authentication token (JWT).
    #[serde(default)]
    pub token: Option<String>,
    /// Self-declared account (honoured only in insecure development mode).
    #[serde(default)]
    pub account: Option<AccountId>,
    /// Client version for compatibility check.
    #[serde(default)]
    pub client_version: String,
}

/// Alpha transfer terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlphaTerms {
    /// Proposing account.
    pub from: AccountId,
    /// Receiving account.
    pub to: AccountId,
    /// Amount.
    pub value: Balance,
    /// Window start.
    pub t0: Timestamp,
    /// Window end.
    pub t1: Timestamp,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Authentication result.
    AuthResult(AuthResult),

    /// Tokens were minted.
    Minted {
        /// Receiving account.
        to: AccountId,
        /// Amount minted.
        amount: Balance,
        /// New balance of `to`.
        balance: Balance,
        /// New total supply.
        total_supply: Balance,
    },

    /// Lock cleared (or was already clear).
    Unlocked {
        /// Account.
        account: AccountId,
        /// Lock generation after the call.
        generation: u64,
    },

    /// The submitted contest was executed.
    ContestAccepted(ContestStarted),

    /// Canonical digest to sign.
    Encoding {
        /// Hex digest.
        digest: String,
    },

    /// Signature check result.
    Verification {
        /// Did the claimed signer sign?
        valid: bool,
    },

    /// Balance query result.
    Balance {
        /// Account.
        account: AccountId,
        /// Balance.
        balance: Balance,
    },

    /// Total supply query result.
    TotalSupply {
        /// Total supply.
        total_supply: Balance,
    },

    /// Lock query result.
    LockStatus {
        /// Account.
        account: AccountId,
        /// Is the account locked?
        locked: bool,
        /// Lock generation.
        generation: u64,
    },

    /// A contest succeeded somewhere (broadcast to every client).
    ContestStarted(ContestStarted),

    /// Pong response.
    Pong {
        /// Echoed client timestamp.
        timestamp: u64,
        /// Server time (ms).
        server_time: u64,
    },

    /// Error message.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown {
        /// Reason.
        reason: String,
    },
}

/// Authentication result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResult {
    /// Whether auth succeeded.
    pub success: bool,
    /// Authenticated account.
    pub account: Option<AccountId>,
    /// Session ID if successful.
    pub session_id: Option<String>,
    /// Error message if failed.
    pub error: Option<String>,
    /// Server version.
    pub server_version: String,
}

/// Server error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Not authenticated.
    NotAuthenticated,
    /// Invalid input.
    InvalidInput,
    /// Caller lacks privilege.
    Authorization,
    /// Replay lock held.
    Locked,
    /// Outside the signed window.
    Temporal,
    /// Bad value.
    Value,
    /// Signature mismatch.
    Signature,
    /// Balance too low.
    InsufficientFunds,
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Authorization => Self::Authorization,
            ErrorKind::Locked => Self::Locked,
            ErrorKind::Temporal => Self::Temporal,
            ErrorKind::Value => Self::Value,
            ErrorKind::Signature => Self::Signature,
            ErrorKind::InsufficientFunds => Self::InsufficientFunds,
        }
    }
}

impl ServerMessage {
    /// Build an error message.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error(ServerError { code, message: message.into() })
    }

    /// Build an encoding response.
    pub fn encoding(digest: &MessageDigest) -> Self {
        Self::Encoding { digest: format!("0x{}", hex::encode(digest)) }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn account(byte: u8) -> AccountId {
        AccountId::new([byte; 20])
    }

    #[test]
    fn test_contest_message_from_json() {
        let text = json!({
            "type": "contest",
            "from": account(1).to_string(),
            "to": account(2).to_string(),
            "value": 10,
            "t0": 100,
            "t1": 220,
            "alpha_signature": "0x0102",
            "beta_signature": "0304",
        })
        .to_string();

        match ClientMessage::from_json(&text).unwrap() {
            ClientMessage::Contest(req) => {
                assert_eq!(req.from, account(1));
                assert_eq!(req.value, 10);
                assert_eq!(req.alpha_signature.as_bytes(), &[1, 2]);
                assert_eq!(req.beta_signature.as_bytes(), &[3, 4]);
            }
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_verify_alpha_message() {
        let text = json!({
            "type": "verify_alpha",
            "from": account(1).to_string(),
            "to": account(2).to_string(),
            "value": 10,
            "t0": 0,
            "t1": 2,
            "signer": account(1).to_string(),
            "signature": "0x00",
        })
        .to_string();

        match ClientMessage::from_json(&text).unwrap() {
            ClientMessage::VerifyAlpha { t1, signer, .. } => {
                assert_eq!(t1, 2);
                assert_eq!(signer, account(1));
            }
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_bad_account_rejected() {
        let text = json!({ "type": "balance", "account": "0x1234" }).to_string();
        assert!(ClientMessage::from_json(&text).is_err());
    }

    #[test]
    fn test_unit_variant() {
        let parsed = ClientMessage::from_json(r#"{"type":"total_supply"}"#).unwrap();
        assert!(matches!(parsed, ClientMessage::TotalSupply));
    }

    #[test]
    fn test_auth_defaults() {
        let parsed = ClientMessage::from_json(r#"{"type":"auth","token":"abc"}"#).unwrap();
        match parsed {
            ClientMessage::Auth(req) => {
                assert_eq!(req.token.as_deref(), Some("abc"));
                assert!(req.account.is_none());
            }
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_server_event_json() {
        let msg = ServerMessage::ContestStarted(ContestStarted {
            from: account(1),
            to: account(2),
            value: 10,
            t0: 1,
            t1: 2,
        });

        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"contest_started\""));
        assert!(matches!(ServerMessage::from_json(&json).unwrap(), ServerMessage::ContestStarted(_)));
    }

    #[test]
    fn test_error_codes() {
        let msg = ServerMessage::error(ErrorKind::InsufficientFunds.into(), "too poor");
        let json = msg.to_json().unwrap();
        assert!(json.contains("insufficient_funds"));
    }

    #[test]
    fn test_encoding_is_hex() {
        let msg = ServerMessage::encoding(&[0xAB; 32]);
        match msg {
            ServerMessage::Encoding { digest } => {
                assert_eq!(digest.len(), 2 + 64);
                assert!(digest.starts_with("0xabab"));
            }
            other => panic!("Wrong message type: {:?}", other),
        }
    }
}
