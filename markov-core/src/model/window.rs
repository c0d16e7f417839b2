use crate::store::SENTINEL;
use crate::store::TokenId;

/// Fixed-size history of the last `N` token ids.
///
/// Conceptually the prefix of an n-gram: the ids that precede the token
/// being learned or generated, oldest first.
///
/// Stored as a ring buffer, so `push` is O(1).
///
/// # Invariants
/// - `ids.len()` is the window size and never changes
/// - `head` always indexes the oldest id
#[derive(Clone, Debug)]
pub struct Window {
	ids: Vec<TokenId>,
	head: usize,
}

impl Window {
	/// Creates a window of `size` sentinel ids.
	pub fn new(size: usize) -> Self {
		Self { ids: vec![SENTINEL; size], head: 0 }
	}

	/// Creates a window holding `ids`, oldest first.
	pub fn from_ids(ids: Vec<TokenId>) -> Self {
		Self { ids, head: 0 }
	}

	/// Refills the window with sentinels (chain boundary).
	pub fn reset(&mut self) {
		self.ids.fill(SENTINEL);
		self.head = 0;
	}

	/// Drops the oldest id and appends `id` as the newest.
	pub fn push(&mut self, id: TokenId) {
		if self.ids.is_empty() {
			return;
		}
		self.ids[self.head] = id;
		self.head = (self.head + 1) % self.ids.len();
	}

	/// Iterates over the ids, oldest first.
	pub fn iter(&self) -> impl Iterator<Item = TokenId> + '_ {
		let (newer, older) = self.ids.split_at(self.head);
		older.iter().chain(newer.iter()).copied()
	}
}
