use log::debug;
use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;
use crate::store::schema::{index_name, quote};
use crate::store::{SENTINEL, TokenId};

/// Handle on a dictionary table `(id, str)`.
///
/// Ids are assigned by SQLite on first insertion and never reused.
/// The sentinel row `(0, "")` is seeded on creation.
pub(crate) struct Dictionary<'c> {
	conn: &'c Connection,
	table: String,
	index: String,
}

impl<'c> Dictionary<'c> {
	pub(crate) fn new(conn: &'c Connection, table: &str) -> Self {
		Self { conn, table: quote(table), index: index_name(table) }
	}

	/// Creates the table and its sentinel row, unless it already exists.
	pub(crate) fn create(&self) -> Result<()> {
		let table = &self.table;
		self.conn.execute_batch(&format!(
			"CREATE TABLE IF NOT EXISTS {table} (id INTEGER PRIMARY KEY ASC, str TEXT NOT NULL UNIQUE ON CONFLICT IGNORE);"
		))?;
		self.conn.execute(
			&format!("INSERT OR IGNORE INTO {table} (id, str) VALUES (?1, ?2);"),
			rusqlite::params![SENTINEL, ""],
		)?;
		Ok(())
	}

	pub(crate) fn drop_table(&self) -> Result<()> {
		self.conn.execute_batch(&format!("DROP TABLE {};", self.table))?;
		Ok(())
	}

	/// Drops the text index before a bulk insert.
	pub(crate) fn drop_index(&self) -> Result<()> {
		debug!("Dropping index of dictionary {}", self.table);
		self.conn.execute_batch(&format!("DROP INDEX IF EXISTS {};", self.index))?;
		Ok(())
	}

	/// Rebuilds the text index dropped by `drop_index`.
	pub(crate) fn rebuild_index(&self) -> Result<()> {
		debug!("Rebuilding index of dictionary {}", self.table);
		self.conn.execute_batch(&format!(
			"CREATE INDEX IF NOT EXISTS {} ON {} (str);",
			self.index,
			self.table
		))?;
		Ok(())
	}

	/// Adds `token` unless already present.
	pub(crate) fn insert(&self, token: &str) -> Result<()> {
		let mut stmt = self
			.conn
			.prepare_cached(&format!("INSERT OR IGNORE INTO {} (str) VALUES (?1);", self.table))?;
		stmt.execute([token])?;
		Ok(())
	}

	/// Id of `token`, by exact text match.
	pub(crate) fn lookup(&self, token: &str) -> Result<Option<TokenId>> {
		let mut stmt = self
			.conn
			.prepare_cached(&format!("SELECT id FROM {} WHERE str=?1 LIMIT 1;", self.table))?;
		Ok(stmt.query_row([token], |row| row.get(0)).optional()?)
	}

	/// Text of `id`.
	///
	/// # Errors
	/// A storage error if `id` is not in the table.
	pub(crate) fn resolve(&self, id: TokenId) -> Result<String> {
		let mut stmt = self
			.conn
			.prepare_cached(&format!("SELECT str FROM {} WHERE id=?1 LIMIT 1;", self.table))?;
		Ok(stmt.query_row([id], |row| row.get(0))?)
	}

	/// Number of entries, the sentinel included.
	pub(crate) fn len(&self) -> Result<i64> {
		Ok(self
			.conn
			.query_row(&format!("SELECT count(*) FROM {};", self.table), [], |row| row.get(0))?)
	}
}
