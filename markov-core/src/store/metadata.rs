use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::{MarkovError, Result, is_unique_violation};
use crate::model::config::ChainConfig;
use crate::store::schema::METADATA_TABLE;

/// Handle on the metadata table, mapping each name 1:1 to a `ChainConfig`.
pub(crate) struct Metadata<'c> {
	conn: &'c Connection,
}

impl<'c> Metadata<'c> {
	pub(crate) fn new(conn: &'c Connection) -> Self {
		Self { conn }
	}

	/// Creates the table if missing.
	///
	/// Unique `sqlite_table` keeps two configs from writing the same transitions.
	pub(crate) fn create(&self) -> Result<()> {
		self.conn.execute_batch(&format!(
			"CREATE TABLE IF NOT EXISTS {METADATA_TABLE} (\
				name TEXT NOT NULL UNIQUE,\
				iter TEXT NOT NULL,\
				prefixmiddle TEXT NOT NULL,\
				N UNSIGNED INTEGER NOT NULL,\
				splitstr TINYINT NOT NULL,\
				separator TEXT,\
				maxgen UNSIGNED BIGINT NOT NULL,\
				rndstart TINYINT NOT NULL,\
				sqlite_table TEXT NOT NULL UNIQUE,\
				sqlite_table_dict TEXT NOT NULL\
			);"
		))?;
		Ok(())
	}

	/// Returns true if the table exists (read-only stores may lack it).
	pub(crate) fn exists(&self) -> Result<bool> {
		let count: i64 = self.conn.query_row(
			"SELECT count(*) FROM sqlite_master WHERE type='table' AND name=?1;",
			[METADATA_TABLE],
			|row| row.get(0),
		)?;
		Ok(count > 0)
	}

	/// Inserts the row of `name`.
	///
	/// # Errors
	/// `ConfigExist` if `name` or the transition table is already registered.
	/// Table names are compared without case, as SQLite resolves them.
	pub(crate) fn insert(&self, name: &str, config: &ChainConfig) -> Result<()> {
		let taken: i64 = self.conn.query_row(
			&format!("SELECT count(*) FROM {METADATA_TABLE} WHERE sqlite_table=?1 COLLATE NOCASE;"),
			[&config.transition_table],
			|row| row.get(0),
		)?;
		if taken > 0 {
			return Err(MarkovError::ConfigExist);
		}

		// Caps above i64::MAX keep their bit pattern
		let maxgen = config.generation_cap as i64;
		let inserted = self.conn.execute(
			&format!("INSERT INTO {METADATA_TABLE} VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);"),
			params![
				name,
				config.pattern,
				config.infix,
				config.window_size,
				config.split_lines,
				config.separator,
				maxgen,
				config.random_start,
				config.transition_table,
				config.dictionary_table,
			],
		);
		match inserted {
			Ok(_) => Ok(()),
			Err(e) if is_unique_violation(&e) => Err(MarkovError::ConfigExist),
			Err(e) => Err(e.into()),
		}
	}

	pub(crate) fn get(&self, name: &str) -> Result<Option<ChainConfig>> {
		let config = self
			.conn
			.query_row(
				&format!("SELECT * FROM {METADATA_TABLE} WHERE name=?1;"),
				[name],
				read_config,
			)
			.optional()?;
		Ok(config)
	}

	pub(crate) fn delete(&self, name: &str) -> Result<()> {
		self.conn.execute(&format!("DELETE FROM {METADATA_TABLE} WHERE name=?1;"), [name])?;
		Ok(())
	}

	/// Number of configs still pointing at dictionary `table` (case-insensitive).
	pub(crate) fn dictionary_users(&self, table: &str) -> Result<i64> {
		let count = self.conn.query_row(
			&format!("SELECT count(*) FROM {METADATA_TABLE} WHERE sqlite_table_dict=?1 COLLATE NOCASE;"),
			[table],
			|row| row.get(0),
		)?;
		Ok(count)
	}
}

fn read_config(row: &Row<'_>) -> rusqlite::Result<ChainConfig> {
	let maxgen: i64 = row.get(6)?;
	Ok(ChainConfig {
		pattern: row.get(1)?,
		infix: row.get(2)?,
		window_size: row.get(3)?,
		split_lines: row.get(4)?,
		separator: row.get(5)?,
		generation_cap: maxgen as u64,
		random_start: row.get(7)?,
		transition_table: row.get(8)?,
		dictionary_table: row.get(9)?,
	})
}
