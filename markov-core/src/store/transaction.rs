use log::warn;
use rusqlite::Connection;

use crate::error::Result;

/// A transaction opened on creation and rolled back unless committed.
///
/// Exactly one of commit or rollback takes effect: `commit` and `rollback`
/// consume the guard, and dropping an unfinished guard (a failed commit
/// included) rolls back.
///
/// Guards do not nest. SQLite refuses a second `BEGIN` on the same
/// connection, so `begin` fails while another guard is outstanding.
pub struct TransactionGuard<'c> {
	conn: &'c Connection,
	finished: bool,
}

impl<'c> TransactionGuard<'c> {
	/// Starts a transaction on `conn`.
	pub fn begin(conn: &'c Connection) -> Result<Self> {
		conn.execute_batch("BEGIN;")?;
		Ok(Self { conn, finished: false })
	}

	/// Makes every change since `begin` permanent.
	pub fn commit(mut self) -> Result<()> {
		self.conn.execute_batch("COMMIT;")?;
		self.finished = true;
		Ok(())
	}

	/// Discards every change since `begin`.
	pub fn rollback(mut self) -> Result<()> {
		self.conn.execute_batch("ROLLBACK;")?;
		self.finished = true;
		Ok(())
	}
}

impl Drop for TransactionGuard<'_> {
	fn drop(&mut self) {
		if self.finished {
			return;
		}
		if let Err(e) = self.conn.execute_batch("ROLLBACK;") {
			warn!("Automatic rollback failed: {e}");
		}
	}
}
