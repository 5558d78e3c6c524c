// Error types for the Outpost server.
//
// `RuleError` is the validation taxonomy: every way a well-framed,
// well-parsed request can still be rejected. Its `Display` text is exactly
// what goes back to the offending client in an `error` record; session and
// world state are left untouched and the connection stays open.
//
// Connection and protocol failures never appear here — they surface as
// `std::io::Error` at the framing boundary and terminate only the affected
// slot. `ServerError` covers the one process-fatal path: failing to stand up
// the listener.

use thiserror::Error;

/// A rejected request. The message is sent verbatim to the client.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("you cannot set a number right now")]
    NotSettingPhase,
    #[error("invalid number: exactly three distinct digits required")]
    InvalidNumber,
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("country already taken or invalid, choose another")]
    CountryUnavailable,
    #[error("place base failed (invalid position or occupied)")]
    PlaceBase,
    #[error("produce failed (no base or no vacant tile)")]
    Produce,
    #[error("move failed (no such unit or out of range)")]
    Move,
    #[error("attack failed (no such unit or out of range)")]
    Attack,
    #[error("unsupported action for this game mode")]
    UnsupportedAction,
}

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),
}
