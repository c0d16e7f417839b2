//! Chain model: configuration, token stream, training and generation.

/// Settings of a named chain and their validation.
pub mod config;

/// Pattern-matching capability and the token stream built on it.
///
/// Text is cut into segments (separator), lines (optional) and tokens
/// (pattern matches), yielding lazily `Token` and `Boundary` events.
pub mod tokenizer;

/// Fixed-size ring buffer of the last N token ids.
pub mod window;

/// Two-pass training: dictionary encoding, then transition recording.
pub(crate) mod trainer;

/// Random walk over recorded transitions.
pub(crate) mod generator;
