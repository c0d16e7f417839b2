use std::iter::once;
use std::ops::Range;

use regex::Regex;

use crate::error::{MarkovError, Result};
use crate::model::config::ChainConfig;

/// Token inserted between lines when line splitting is forced.
pub const NEWLINE: &str = "\n";

/// Pattern used to split lines when line splitting is forced.
const LINE_BREAKS: &str = r"\n+";

/// A pattern-matching engine able to compile patterns.
pub trait PatternMatcher {
	type Compiled: CompiledPattern;

	/// Compiles `pattern`.
	///
	/// # Errors
	/// Returns `BadConfig` if the pattern is not valid for this engine.
	fn compile(&self, pattern: &str) -> Result<Self::Compiled>;
}

/// A compiled pattern.
pub trait CompiledPattern {
	/// Byte ranges of all non-overlapping matches in `text`, in order.
	fn find_all<'t>(&'t self, text: &'t str) -> impl Iterator<Item = Range<usize>> + 't;
}

/// Default engine, backed by the `regex` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegexMatcher;

impl PatternMatcher for RegexMatcher {
	type Compiled = Regex;

	fn compile(&self, pattern: &str) -> Result<Regex> {
		Regex::new(pattern).map_err(|e| MarkovError::BadConfig(e.to_string()))
	}
}

impl CompiledPattern for Regex {
	fn find_all<'t>(&'t self, text: &'t str) -> impl Iterator<Item = Range<usize>> + 't {
		self.find_iter(text).map(|m| m.range())
	}
}

/// One event of the token stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenEvent<'t> {
	/// A token to learn.
	Token(&'t str),
	/// End of a separator segment: the window must be reset.
	Boundary,
}

/// Cuts raw text into a stream of `TokenEvent`s following a `ChainConfig`.
///
/// Three levels are applied to each input:
/// 1. separator split (one `Boundary` after each segment, the whole text is a
///    single segment without separator)
/// 2. line split (only with `split_lines`, a `"\n"` token between lines)
/// 3. extraction of every pattern match as a token
pub struct Tokenizer<P: CompiledPattern> {
	pattern: P,
	separator: Option<P>,
	lines: Option<P>,
}

impl<P: CompiledPattern> Tokenizer<P> {
	/// Compiles the patterns of `config` with `matcher`.
	pub fn new<M: PatternMatcher<Compiled = P>>(matcher: &M, config: &ChainConfig) -> Result<Self> {
		Ok(Self {
			pattern: matcher.compile(&config.pattern)?,
			separator: config.separator.as_deref().map(|s| matcher.compile(s)).transpose()?,
			lines: if config.split_lines { Some(matcher.compile(LINE_BREAKS)?) } else { None },
		})
	}

	/// Lazily yields the events of `text`, in document order.
	pub fn events<'t>(&'t self, text: &'t str) -> impl Iterator<Item = TokenEvent<'t>> + 't {
		let segments: Box<dyn Iterator<Item = &'t str> + 't> = match &self.separator {
			Some(separator) => Box::new(split(separator, text)),
			None => Box::new(once(text)),
		};
		segments.flat_map(move |segment| self.segment_events(segment).chain(once(TokenEvent::Boundary)))
	}

	fn segment_events<'t>(&'t self, segment: &'t str) -> Box<dyn Iterator<Item = TokenEvent<'t>> + 't> {
		match &self.lines {
			Some(lines) => Box::new(split(lines, segment).enumerate().flat_map(move |(i, line)| {
				(i > 0).then_some(TokenEvent::Token(NEWLINE)).into_iter().chain(self.tokens(line))
			})),
			None => Box::new(self.tokens(segment)),
		}
	}

	fn tokens<'t>(&'t self, text: &'t str) -> impl Iterator<Item = TokenEvent<'t>> + 't {
		// Empty matches would alias the sentinel entry
		self.pattern
			.find_all(text)
			.filter(|range| !range.is_empty())
			.map(move |range| TokenEvent::Token(&text[range]))
	}
}

/// Pieces of `text` between the matches of `pattern` (matches discarded).
fn split<'t, P: CompiledPattern>(pattern: &'t P, text: &'t str) -> impl Iterator<Item = &'t str> + 't {
	let mut last = 0;
	pattern
		.find_all(text)
		.map(Some)
		.chain(once(None))
		.map(move |found| match found {
			Some(range) => {
				let piece = &text[last..range.start];
				last = range.end;
				piece
			}
			None => &text[last..],
		})
}
