use std::io::Write;

use log::debug;
use rand::Rng;
use rusqlite::Connection;

use crate::error::Result;
use crate::model::config::ChainConfig;
use crate::model::tokenizer::NEWLINE;
use crate::model::window::Window;
use crate::store::SENTINEL;
use crate::store::dictionary::Dictionary;
use crate::store::transitions::Transitions;

/// Random walk over the transition table of a chain.
///
/// # Behavior
/// - Starts from the all-sentinel window, or from the window of a random
///   row when `random_start` is set.
/// - At each step, picks uniformly one row whose window equals the current
///   one; its result is the next token.
/// - Stops on the sentinel, on a window without any row, or once `cap`
///   tokens were written (`cap == 0` means no limit).
pub(crate) struct ChainGenerator<'c> {
	config: &'c ChainConfig,
	dictionary: Dictionary<'c>,
	transitions: Transitions<'c>,
}

impl<'c> ChainGenerator<'c> {
	pub(crate) fn new(conn: &'c Connection, config: &'c ChainConfig) -> Self {
		Self {
			config,
			dictionary: Dictionary::new(conn, &config.dictionary_table),
			transitions: Transitions::new(conn, &config.transition_table, config.window_size as usize),
		}
	}

	/// Writes a generated sequence to `out`, returns the number of tokens.
	///
	/// Each token is followed by the configured infix, except a lone newline.
	pub(crate) fn generate<W, R>(&self, out: &mut W, cap: u64, rng: &mut R) -> Result<u64>
	where
		W: Write + ?Sized,
		R: Rng,
	{
		let mut window = self.start_window(rng)?;
		let mut emitted = 0;

		loop {
			let next = match self.transitions.choose_next(&window, rng)? {
				Some(SENTINEL) => {
					debug!("Reached end of chain after {emitted} tokens");
					break;
				}
				Some(id) => id,
				None => {
					debug!("No transition left after {emitted} tokens");
					break;
				}
			};

			let token = self.dictionary.resolve(next)?;
			out.write_all(token.as_bytes())?;
			if token != NEWLINE {
				out.write_all(self.config.infix.as_bytes())?;
			}

			emitted += 1;
			if cap > 0 && emitted == cap {
				debug!("Generation cap {cap} reached");
				break;
			}
			window.push(next);
		}

		Ok(emitted)
	}

	fn start_window<R: Rng>(&self, rng: &mut R) -> Result<Window> {
		let size = self.config.window_size as usize;
		if !self.config.random_start {
			return Ok(Window::new(size));
		}
		// Empty chains fall back to the chain start
		Ok(self.transitions.random_window(rng)?.unwrap_or_else(|| Window::new(size)))
	}
}
