use log::debug;
use rand::Rng;
use rusqlite::{Connection, params_from_iter};

use crate::error::Result;
use crate::model::window::Window;
use crate::store::TokenId;
use crate::store::schema::{index_name, placeholders, prior_columns, quote, window_filter};

/// Handle on a transition table `(rstr, str1 .. strN)`.
///
/// Each row records one observation "after `str1 .. strN`, `rstr` came".
/// Rows are append-only: repeated n-grams give repeated rows, so the
/// number of rows is the weight of a transition.
pub(crate) struct Transitions<'c> {
	conn: &'c Connection,
	table: String,
	index: String,
	n: usize,
}

impl<'c> Transitions<'c> {
	pub(crate) fn new(conn: &'c Connection, table: &str, n: usize) -> Self {
		Self { conn, table: quote(table), index: index_name(table), n }
	}

	/// Creates the table with `n + 1` integer columns.
	///
	/// Fails if the table already exists.
	pub(crate) fn create(&self) -> Result<()> {
		let columns: Vec<String> = std::iter::once("rstr".to_owned())
			.chain(prior_columns(self.n))
			.map(|column| format!("{column} INTEGER NOT NULL"))
			.collect();
		self.conn
			.execute_batch(&format!("CREATE TABLE {} ({});", self.table, columns.join(", ")))?;
		Ok(())
	}

	pub(crate) fn drop_table(&self) -> Result<()> {
		self.conn.execute_batch(&format!("DROP TABLE {};", self.table))?;
		Ok(())
	}

	/// Drops the composite window index before a bulk insert.
	pub(crate) fn drop_index(&self) -> Result<()> {
		debug!("Dropping index of transitions {}", self.table);
		self.conn.execute_batch(&format!("DROP INDEX IF EXISTS {};", self.index))?;
		Ok(())
	}

	/// Rebuilds the index over `str1 .. strN`.
	pub(crate) fn rebuild_index(&self) -> Result<()> {
		debug!("Rebuilding index of transitions {}", self.table);
		self.conn.execute_batch(&format!(
			"CREATE INDEX IF NOT EXISTS {} ON {} ({});",
			self.index,
			self.table,
			prior_columns(self.n).join(", ")
		))?;
		Ok(())
	}

	/// Records that `result` followed `window`.
	pub(crate) fn append(&self, result: TokenId, window: &Window) -> Result<()> {
		let mut stmt = self.conn.prepare_cached(&format!(
			"INSERT INTO {} VALUES ({});",
			self.table,
			placeholders(self.n + 1)
		))?;
		stmt.execute(params_from_iter(std::iter::once(result).chain(window.iter())))?;
		Ok(())
	}

	/// Picks uniformly one row matching `window` and returns its result.
	///
	/// Returns `None` if no row follows `window`.
	pub(crate) fn choose_next<R: Rng>(&self, window: &Window, rng: &mut R) -> Result<Option<TokenId>> {
		let filter = window_filter(self.n);
		let mut count_stmt = self
			.conn
			.prepare_cached(&format!("SELECT count(*) FROM {} WHERE {filter};", self.table))?;
		let count: i64 = count_stmt.query_row(params_from_iter(window.iter()), |row| row.get(0))?;
		if count == 0 {
			return Ok(None);
		}

		let offset = rng.random_range(0..count);
		let mut stmt = self.conn.prepare_cached(&format!(
			"SELECT rstr FROM {} WHERE {filter} LIMIT 1 OFFSET ?{};",
			self.table,
			self.n + 1
		))?;
		let result = stmt.query_row(params_from_iter(window.iter().chain(std::iter::once(offset))), |row| {
			row.get(0)
		})?;
		Ok(Some(result))
	}

	/// Picks uniformly one row of the whole table and returns its window.
	///
	/// Returns `None` on an empty table.
	pub(crate) fn random_window<R: Rng>(&self, rng: &mut R) -> Result<Option<Window>> {
		let count = self.len()?;
		if count == 0 {
			return Ok(None);
		}

		let offset = rng.random_range(0..count);
		let mut stmt = self.conn.prepare(&format!(
			"SELECT {} FROM {} LIMIT 1 OFFSET ?1;",
			prior_columns(self.n).join(", "),
			self.table
		))?;
		let ids = stmt.query_row([offset], |row| {
			(0..self.n).map(|i| row.get::<_, TokenId>(i)).collect::<rusqlite::Result<Vec<_>>>()
		})?;
		Ok(Some(Window::from_ids(ids)))
	}

	pub(crate) fn len(&self) -> Result<i64> {
		Ok(self
			.conn
			.query_row(&format!("SELECT count(*) FROM {};", self.table), [], |row| row.get(0))?)
	}

	/// Every row as `(result, window)`, in insertion order.
	#[cfg(test)]
	pub(crate) fn rows(&self) -> Result<Vec<(TokenId, Vec<TokenId>)>> {
		let mut stmt = self.conn.prepare(&format!("SELECT * FROM {} ORDER BY rowid;", self.table))?;
		let rows = stmt
			.query_map([], |row| {
				let window = (1..=self.n).map(|i| row.get(i)).collect::<rusqlite::Result<Vec<_>>>()?;
				Ok((row.get(0)?, window))
			})?
			.collect::<rusqlite::Result<Vec<_>>>()?;
		Ok(rows)
	}
}
