use thiserror::Error;

/// Errors raised by chain configuration, training and generation.
///
/// Only unique-constraint violations on the metadata table are translated
/// (into `ConfigExist`). Every other storage failure is passed through as
/// `Storage`.
#[derive(Error, Debug)]
pub enum MarkovError {
	#[error("Invalid configuration: {0}")]
	BadConfig(String),
	#[error("Configuration already exist")]
	ConfigExist,
	#[error("Database is in readonly mode")]
	ReadOnly,
	#[error("Requested config not found")]
	ConfigNotFound,
	#[error("Storage error: {0}")]
	Storage(#[from] rusqlite::Error),
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MarkovError>;

/// Returns true if `err` is a SQLite UNIQUE constraint failure.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
	match err {
		rusqlite::Error::SqliteFailure(e, _) => e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
		_ => false,
	}
}
