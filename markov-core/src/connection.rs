use std::io::Write;

use log::info;
use rand::Rng;
use rusqlite::OpenFlags;
use serde::{Deserialize, Serialize};

use crate::error::{MarkovError, Result};
use crate::model::config::ChainConfig;
use crate::model::generator::ChainGenerator;
use crate::model::tokenizer::{PatternMatcher, RegexMatcher};
use crate::model::trainer::ChainTrainer;
use crate::store::dictionary::Dictionary;
use crate::store::metadata::Metadata;
use crate::store::transaction::TransactionGuard;
use crate::store::transitions::Transitions;

/// Named in-memory database used when no target is given.
pub const DEFAULT_TARGET: &str = "file:memdb1?mode=memory";

/// Where and how to open a chain store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectionOptions {
	/// SQLite file name or URI (`file:` URIs are accepted).
	pub target: String,

	/// Refuse every mutation with `ReadOnly`.
	pub read_only: bool,
}

impl Default for ConnectionOptions {
	fn default() -> Self {
		Self { target: DEFAULT_TARGET.to_owned(), read_only: false }
	}
}

/// A chain store: configs, dictionaries and transition tables in one
/// SQLite database.
///
/// # Responsibilities
/// - Register, read and delete named `ChainConfig`s
/// - Train a chain from raw texts
/// - Generate text from a trained chain
///
/// A `Connection` is a single mutable handle: mutations take `&mut self`,
/// and callers sharing one must serialize access themselves.
pub struct Connection<M: PatternMatcher = RegexMatcher> {
	db: rusqlite::Connection,
	read_only: bool,
	matcher: M,
}

impl Connection<RegexMatcher> {
	/// Opens `target`, read-only or read-write (created if missing).
	pub fn open(target: &str, read_only: bool) -> Result<Self> {
		Self::with_options(ConnectionOptions { target: target.to_owned(), read_only })
	}

	/// Opens a private in-memory store.
	pub fn open_in_memory() -> Result<Self> {
		Self::open(":memory:", false)
	}

	/// Opens the store described by `options`, with the default regex engine.
	pub fn with_options(options: ConnectionOptions) -> Result<Self> {
		Self::with_matcher(options, RegexMatcher)
	}
}

impl<M: PatternMatcher> Connection<M> {
	/// Opens a store whose patterns are compiled by `matcher`.
	///
	/// Writable stores get the metadata table created if missing.
	pub fn with_matcher(options: ConnectionOptions, matcher: M) -> Result<Self> {
		let mode = if options.read_only {
			OpenFlags::SQLITE_OPEN_READ_ONLY
		} else {
			OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
		};
		let db = rusqlite::Connection::open_with_flags(
			&options.target,
			mode | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI,
		)?;

		// Models are rebuildable, favor speed over durability
		db.pragma_update(None, "synchronous", 0)?;
		if !options.read_only {
			db.pragma_update_and_check(None, "journal_mode", "MEMORY", |row| row.get::<_, String>(0))?;
			Metadata::new(&db).create()?;
		}

		Ok(Self { db, read_only: options.read_only, matcher })
	}

	pub fn is_read_only(&self) -> bool {
		self.read_only
	}

	fn check_writable(&self) -> Result<()> {
		if self.read_only {
			return Err(MarkovError::ReadOnly);
		}
		Ok(())
	}

	/// Registers `config` under `name` and creates its tables.
	///
	/// The metadata row, the dictionary (if missing) and the transition table
	/// are created in one transaction.
	///
	/// # Errors
	/// - `ReadOnly` on a read-only store, before anything else
	/// - `BadConfig` if `config` is invalid or a pattern does not compile
	/// - `ConfigExist` if `name` or the transition table is already in use
	pub fn add_config(&mut self, name: &str, config: &ChainConfig) -> Result<()> {
		self.check_writable()?;
		config.validate_with(&self.matcher)?;

		let trans = TransactionGuard::begin(&self.db)?;
		Metadata::new(&self.db).insert(name, config)?;
		Dictionary::new(&self.db, &config.dictionary_table).create()?;
		Transitions::new(&self.db, &config.transition_table, config.window_size as usize).create()?;
		trans.commit()?;

		info!("Added chain {name} ({} / {})", config.transition_table, config.dictionary_table);
		Ok(())
	}

	/// Returns the config registered under `name`, if any.
	pub fn get_config(&self, name: &str) -> Result<Option<ChainConfig>> {
		let metadata = Metadata::new(&self.db);
		if self.read_only && !metadata.exists()? {
			return Ok(None);
		}
		metadata.get(name)
	}

	/// Deletes the config `name` and its transition table.
	///
	/// The dictionary is dropped too once no other config uses it.
	/// Returns false if `name` was not registered.
	///
	/// The three steps are not wrapped in a transaction: a failure between
	/// them can leave orphaned tables behind.
	pub fn delete_config(&mut self, name: &str) -> Result<bool> {
		self.check_writable()?;
		let Some(config) = self.get_config(name)? else {
			return Ok(false);
		};

		let metadata = Metadata::new(&self.db);
		metadata.delete(name)?;
		Transitions::new(&self.db, &config.transition_table, config.window_size as usize).drop_table()?;

		let users = metadata.dictionary_users(&config.dictionary_table)?;
		if users == 0 {
			Dictionary::new(&self.db, &config.dictionary_table).drop_table()?;
		}

		info!("Deleted chain {name} (dictionary {} still used by {users})", config.dictionary_table);
		Ok(true)
	}

	/// Trains the chain `name` on `texts`.
	///
	/// Rows are appended: training twice on the same texts doubles the weights.
	///
	/// # Errors
	/// - `ReadOnly` on a read-only store, before anything else
	/// - `ConfigNotFound` if `name` is not registered
	pub fn train<S: AsRef<str>>(&mut self, name: &str, texts: &[S]) -> Result<()> {
		self.check_writable()?;
		let config = self.get_config(name)?.ok_or(MarkovError::ConfigNotFound)?;
		ChainTrainer::new(&self.db, &config, &self.matcher)?.train(texts)
	}

	/// Writes a sequence generated by the chain `name` to `out`.
	///
	/// `cap` overrides the config's generation cap (0 means no limit).
	///
	/// # Errors
	/// `ConfigNotFound` if `name` is not registered.
	pub fn output<W: Write + ?Sized>(&self, name: &str, out: &mut W, cap: Option<u64>) -> Result<()> {
		self.output_with_rng(name, out, cap, &mut rand::rng())
	}

	/// Same as `output`, drawing every random choice from `rng`.
	pub fn output_with_rng<W, R>(&self, name: &str, out: &mut W, cap: Option<u64>, rng: &mut R) -> Result<()>
	where
		W: Write + ?Sized,
		R: Rng,
	{
		let config = self.get_config(name)?.ok_or(MarkovError::ConfigNotFound)?;
		let cap = cap.unwrap_or(config.generation_cap);
		ChainGenerator::new(&self.db, &config).generate(out, cap, rng)?;
		Ok(())
	}

	/// Generates a sequence from the chain `name` into a `String`.
	pub fn output_string(&self, name: &str, cap: Option<u64>) -> Result<String> {
		let mut out = Vec::new();
		self.output(name, &mut out, cap)?;
		Ok(String::from_utf8_lossy(&out).into_owned())
	}
}
