//! SQLite persistence of chains.
//!
//! Every table is reached through a small handle borrowing the
//! `rusqlite::Connection`; none of them owns state of its own.

/// Table and index names, SQL fragments shared by the handles.
pub(crate) mod schema;

/// Scoped transaction with rollback on every non-commit exit.
pub mod transaction;

/// The `markov_metainfo` table: one row per `ChainConfig`.
pub(crate) mod metadata;

/// Token text <-> id tables, possibly shared between chains.
pub(crate) mod dictionary;

/// Per-chain n-gram observation tables.
pub(crate) mod transitions;

/// Row id of a dictionary entry.
pub type TokenId = i64;

/// Reserved id of the empty string: "no token", start and end of a chain.
pub const SENTINEL: TokenId = 0;
