use log::info;
use rusqlite::Connection;

use crate::error::{MarkovError, Result};
use crate::model::config::ChainConfig;
use crate::model::tokenizer::{CompiledPattern, PatternMatcher, TokenEvent, Tokenizer};
use crate::model::window::Window;
use crate::store::dictionary::Dictionary;
use crate::store::transaction::TransactionGuard;
use crate::store::transitions::Transitions;

/// Folds training texts into the dictionary and transition tables of a chain.
///
/// Training runs two full passes over the texts, each in its own transaction:
/// 1. every token is inserted into the dictionary
/// 2. every token is resolved to its id and recorded as a transition from
///    the current window, which then shifts by one
///
/// Boundaries reset the window without recording anything.
/// A failing pass is rolled back, but an already committed first pass stays.
pub(crate) struct ChainTrainer<'c, P: CompiledPattern> {
	conn: &'c Connection,
	config: &'c ChainConfig,
	tokenizer: Tokenizer<P>,
}

impl<'c, P: CompiledPattern> ChainTrainer<'c, P> {
	pub(crate) fn new<M: PatternMatcher<Compiled = P>>(
		conn: &'c Connection,
		config: &'c ChainConfig,
		matcher: &M,
	) -> Result<Self> {
		Ok(Self { conn, config, tokenizer: Tokenizer::new(matcher, config)? })
	}

	/// Runs both passes over `texts`.
	///
	/// Not idempotent: rows are appended to the ones already recorded.
	pub(crate) fn train<S: AsRef<str>>(&self, texts: &[S]) -> Result<()> {
		let tokens = self.encode(texts)?;
		let rows = self.record(texts)?;
		info!(
			"Trained {} on {} texts: {} tokens, {} transitions",
			self.config.transition_table,
			texts.len(),
			tokens,
			rows
		);
		Ok(())
	}

	fn dictionary(&self) -> Dictionary<'c> {
		Dictionary::new(self.conn, &self.config.dictionary_table)
	}

	fn transitions(&self) -> Transitions<'c> {
		Transitions::new(self.conn, &self.config.transition_table, self.config.window_size as usize)
	}

	/// First pass: inserts every token into the dictionary.
	fn encode<S: AsRef<str>>(&self, texts: &[S]) -> Result<usize> {
		let dictionary = self.dictionary();
		let trans = TransactionGuard::begin(self.conn)?;
		dictionary.drop_index()?;

		let mut tokens = 0;
		for text in texts {
			for event in self.tokenizer.events(text.as_ref()) {
				if let TokenEvent::Token(token) = event {
					dictionary.insert(token)?;
					tokens += 1;
				}
			}
		}

		// The second pass looks every token up
		dictionary.rebuild_index()?;
		trans.commit()?;
		info!("Dictionary {} holds {} entries", self.config.dictionary_table, dictionary.len()?);
		Ok(tokens)
	}

	/// Second pass: records one transition per token.
	fn record<S: AsRef<str>>(&self, texts: &[S]) -> Result<usize> {
		let dictionary = self.dictionary();
		let transitions = self.transitions();
		let trans = TransactionGuard::begin(self.conn)?;
		transitions.drop_index()?;

		let mut window = Window::new(self.config.window_size as usize);
		let mut rows = 0;
		for text in texts {
			for event in self.tokenizer.events(text.as_ref()) {
				match event {
					TokenEvent::Token(token) => {
						let id = dictionary
							.lookup(token)?
							.ok_or(MarkovError::Storage(rusqlite::Error::QueryReturnedNoRows))?;
						transitions.append(id, &window)?;
						window.push(id);
						rows += 1;
					}
					TokenEvent::Boundary => window.reset(),
				}
			}
		}

		transitions.rebuild_index()?;
		trans.commit()?;
		Ok(rows)
	}
}
