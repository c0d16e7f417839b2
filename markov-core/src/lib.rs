//! Markov chain text models persisted in SQLite.
//!
//! This crate provides:
//! - Named chain configurations (`ChainConfig`) stored next to their tables
//! - Training: text is cut into tokens, encoded into a dictionary and folded
//!   into a table of n-gram transitions
//! - Generation: a random walk over the transitions, from the chain start
//!   (or a random window) until the chain ends or a cap is reached
//!
//! Everything goes through a `Connection`:
//!
//! ```no_run
//! use markov_core::{ChainConfig, Connection};
//!
//! # fn main() -> markov_core::Result<()> {
//! let mut conn = Connection::open_in_memory()?;
//! let mut config = ChainConfig::new(r"\w+", "words", "words_dict");
//! config.window_size = 1;
//! config.infix = " ".to_owned();
//! conn.add_config("words", &config)?;
//! conn.train("words", &["the cat sat"])?;
//! println!("{}", conn.output_string("words", None)?);
//! # Ok(())
//! # }
//! ```

/// Store handle and the public operations on chains.
mod connection;

/// Error type shared by every operation.
mod error;

/// Chain configuration, tokenization, training and generation.
pub mod model;

/// SQLite tables backing the chains.
pub mod store;

pub use connection::{Connection, ConnectionOptions, DEFAULT_TARGET};
pub use error::{MarkovError, Result};
pub use model::config::ChainConfig;
