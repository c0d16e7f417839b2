use serde::{Deserialize, Serialize};

use crate::error::{MarkovError, Result};
use crate::model::tokenizer::PatternMatcher;
use crate::store::schema::METADATA_TABLE;

/// Largest window: a transition table has `N + 1` columns and SQLite
/// allows 2000 per table.
pub const MAX_WINDOW_SIZE: u32 = 1999;

/// Settings of a named chain.
///
/// A `ChainConfig` describes how training text is cut into tokens, how many
/// previous tokens condition the next one, how generated tokens are joined,
/// and which tables hold the chain.
///
/// # Invariants (checked by `validate`)
/// - `1 <= window_size <= MAX_WINDOW_SIZE`
/// - `separator`, if present, is non-empty
/// - both table names are non-empty SQL identifiers
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ChainConfig {
	/// Every match of this pattern becomes one token.
	pub pattern: String,

	/// Optional pattern breaking the text into independent chains.
	pub separator: Option<String>,

	/// Written after each generated token (except a lone newline).
	pub infix: String,

	/// Number of previous tokens considered when choosing the next one (N).
	pub window_size: u32,

	/// Split on newlines even if `pattern` never matches them, keeping
	/// a `"\n"` token between the lines.
	pub split_lines: bool,

	/// Stop after this many tokens (0 means only the chain end stops).
	pub generation_cap: u64,

	/// Seed the window from a random transition instead of the chain start.
	pub random_start: bool,

	/// Table holding the transitions, one per config.
	pub transition_table: String,

	/// Table mapping token text to ids, may be shared between configs.
	pub dictionary_table: String,
}

impl Default for ChainConfig {
	fn default() -> Self {
		Self {
			pattern: String::new(),
			separator: None,
			infix: String::new(),
			window_size: 3,
			split_lines: false,
			generation_cap: 0,
			random_start: false,
			transition_table: String::new(),
			dictionary_table: String::new(),
		}
	}
}

impl ChainConfig {
	/// Creates a config with default settings for the given pattern and tables.
	pub fn new(pattern: &str, transition_table: &str, dictionary_table: &str) -> Self {
		Self {
			pattern: pattern.to_owned(),
			transition_table: transition_table.to_owned(),
			dictionary_table: dictionary_table.to_owned(),
			..Self::default()
		}
	}

	/// Checks the structural invariants of the config.
	///
	/// Patterns are not compiled here, see `validate_with`.
	///
	/// # Errors
	/// Returns `BadConfig` describing the first violated rule.
	pub fn validate(&self) -> Result<()> {
		if self.window_size == 0 {
			return Err(bad("window size must be >= 1"));
		}
		if self.window_size > MAX_WINDOW_SIZE {
			return Err(MarkovError::BadConfig(format!("window size must be <= {MAX_WINDOW_SIZE}")));
		}
		if matches!(&self.separator, Some(s) if s.is_empty()) {
			return Err(bad("separator must not be empty"));
		}
		check_table_name(&self.transition_table)?;
		check_table_name(&self.dictionary_table)?;
		if self.transition_table.eq_ignore_ascii_case(&self.dictionary_table) {
			return Err(bad("transition and dictionary tables must differ"));
		}
		Ok(())
	}

	/// Checks the structural invariants, then compiles both patterns with `matcher`.
	pub fn validate_with<M: PatternMatcher>(&self, matcher: &M) -> Result<()> {
		self.validate()?;
		matcher.compile(&self.pattern)?;
		if let Some(separator) = &self.separator {
			matcher.compile(separator)?;
		}
		Ok(())
	}
}

fn bad(reason: &str) -> MarkovError {
	MarkovError::BadConfig(reason.to_owned())
}

/// Table names are spliced into SQL, so only plain identifiers are accepted.
fn check_table_name(name: &str) -> Result<()> {
	let mut chars = name.chars();
	let valid = match chars.next() {
		Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
		_ => false,
	};
	if !valid {
		return Err(MarkovError::BadConfig(format!("invalid table name {name:?}")));
	}
	if name.eq_ignore_ascii_case(METADATA_TABLE) || name.to_ascii_lowercase().starts_with("sqlite_") {
		return Err(MarkovError::BadConfig(format!("reserved table name {name:?}")));
	}
	Ok(())
}
