//! Integration tests for chain configuration, training and generation.
//!
//! File-backed stores are inspected with a second SQLite handle to check
//! which tables exist.

use std::collections::HashSet;
use std::path::Path;

use markov_core::{ChainConfig, Connection, MarkovError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

fn words(table: &str, dict: &str) -> ChainConfig {
	let mut config = ChainConfig::new(r"\w+", table, dict);
	config.window_size = 1;
	config.infix = " ".to_owned();
	config
}

fn tables(path: &Path) -> HashSet<String> {
	let db = rusqlite::Connection::open(path).unwrap();
	let mut stmt = db.prepare("SELECT name FROM sqlite_master WHERE type='table';").unwrap();
	stmt.query_map([], |row| row.get::<_, String>(0))
		.unwrap()
		.collect::<rusqlite::Result<_>>()
		.unwrap()
}

fn file_store() -> (TempDir, String) {
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("chains.db").to_string_lossy().into_owned();
	(dir, path)
}

/// Test that a stored config comes back unchanged.
#[test]
fn test_get_config_returns_added_config() {
	let mut conn = Connection::open_in_memory().unwrap();
	let mut config = words("c1", "d1");
	config.separator = Some(r"\.".to_owned());
	config.split_lines = true;
	config.generation_cap = 12;
	config.random_start = true;

	conn.add_config("chain", &config).unwrap();

	assert_eq!(conn.get_config("chain").unwrap(), Some(config));
	assert_eq!(conn.get_config("other").unwrap(), None);
}

/// Test the walk of the three-word scenario.
#[test]
fn test_three_words_walk_deterministically() {
	let mut conn = Connection::open_in_memory().unwrap();
	conn.add_config("chain", &words("c1", "d1")).unwrap();
	conn.train("chain", &["the cat sat"]).unwrap();

	for _ in 0..5 {
		assert_eq!(conn.output_string("chain", None).unwrap(), "the cat sat ");
	}
}

/// Test that the infix is written after every token but a lone newline.
#[test]
fn test_infix_skips_newlines() {
	let mut conn = Connection::open_in_memory().unwrap();
	let mut config = words("c1", "d1");
	config.infix = "_".to_owned();
	config.split_lines = true;
	conn.add_config("lines", &config).unwrap();
	conn.train("lines", &["one\ntwo"]).unwrap();

	assert_eq!(conn.output_string("lines", None).unwrap(), "one_\ntwo_");
}

/// Test that an untrained chain generates nothing.
#[test]
fn test_empty_training_yields_empty_output() {
	let mut conn = Connection::open_in_memory().unwrap();
	conn.add_config("chain", &words("c1", "d1")).unwrap();
	conn.train::<&str>("chain", &[]).unwrap();

	assert_eq!(conn.output_string("chain", None).unwrap(), "");
}

/// Test that the stored cap and the override both stop generation.
#[test]
fn test_generation_cap() {
	let mut conn = Connection::open_in_memory().unwrap();
	let mut config = words("c1", "d1");
	config.generation_cap = 2;
	conn.add_config("capped", &config).unwrap();
	conn.train("capped", &["one two three four"]).unwrap();

	assert_eq!(conn.output_string("capped", None).unwrap(), "one two ");
	assert_eq!(conn.output_string("capped", Some(3)).unwrap(), "one two three ");
	assert_eq!(conn.output_string("capped", Some(0)).unwrap(), "one two three four ");
}

/// Test that separators split the text into independent chains.
#[test]
fn test_separator_starts_new_chains() {
	let mut conn = Connection::open_in_memory().unwrap();
	let mut config = words("c1", "d1");
	config.window_size = 2;
	config.separator = Some(r"\.".to_owned());
	conn.add_config("chain", &config).unwrap();
	conn.train("chain", &["red fox. red fox"]).unwrap();

	assert_eq!(conn.output_string("chain", None).unwrap(), "red fox ");
}

/// Test that every branch of a fork is eventually taken.
#[test]
fn test_walk_picks_among_matching_rows() {
	let mut conn = Connection::open_in_memory().unwrap();
	conn.add_config("fork", &words("c1", "d1")).unwrap();
	conn.train("fork", &["x a", "x b"]).unwrap();

	let mut rng = StdRng::seed_from_u64(42);
	let mut seen = HashSet::new();
	for _ in 0..100 {
		let mut out = Vec::new();
		conn.output_with_rng("fork", &mut out, None, &mut rng).unwrap();
		seen.insert(String::from_utf8(out).unwrap());
	}

	assert_eq!(seen, HashSet::from(["x a ".to_owned(), "x b ".to_owned()]));
}

/// Test that a random start begins anywhere in the chain.
#[test]
fn test_random_start() {
	let mut conn = Connection::open_in_memory().unwrap();
	let mut config = words("c1", "d1");
	config.random_start = true;
	conn.add_config("chain", &config).unwrap();

	// No transition at all: the walk ends at once
	assert_eq!(conn.output_string("chain", None).unwrap(), "");

	conn.train("chain", &["a b c"]).unwrap();
	let mut rng = StdRng::seed_from_u64(7);
	let mut seen = HashSet::new();
	for _ in 0..100 {
		let mut out = Vec::new();
		conn.output_with_rng("chain", &mut out, None, &mut rng).unwrap();
		seen.insert(String::from_utf8(out).unwrap());
	}

	let expected: HashSet<String> = ["a b c ", "b c ", "c "].iter().map(|s| s.to_string()).collect();
	assert_eq!(seen, expected);
}

/// Test that structural and pattern errors are rejected without side effect.
#[test]
fn test_bad_configs_leave_no_trace() {
	let (_dir, path) = file_store();
	let mut conn = Connection::open(&path, false).unwrap();

	let mut zero = words("c1", "d1");
	zero.window_size = 0;
	let mut broken = words("c1", "d1");
	broken.pattern = "(".to_owned();
	let mut broken_separator = words("c1", "d1");
	broken_separator.separator = Some("[".to_owned());

	for config in [zero, broken, broken_separator, words("", "d1"), words("c1", "")] {
		assert!(matches!(conn.add_config("bad", &config), Err(MarkovError::BadConfig(_))));
	}

	assert_eq!(conn.get_config("bad").unwrap(), None);
	assert_eq!(tables(Path::new(&path)), HashSet::from(["markov_metainfo".to_owned()]));
}

/// Test that duplicate names and transition tables are refused.
#[test]
fn test_duplicates_are_refused() {
	let (_dir, path) = file_store();
	let mut conn = Connection::open(&path, false).unwrap();
	conn.add_config("first", &words("c1", "d1")).unwrap();
	conn.train("first", &["the cat sat"]).unwrap();

	assert!(matches!(conn.add_config("first", &words("c2", "d2")), Err(MarkovError::ConfigExist)));
	assert!(matches!(conn.add_config("second", &words("c1", "d2")), Err(MarkovError::ConfigExist)));

	let expected: HashSet<String> = ["markov_metainfo", "c1", "d1"].iter().map(|s| s.to_string()).collect();
	assert_eq!(tables(Path::new(&path)), expected);
	assert_eq!(conn.output_string("first", None).unwrap(), "the cat sat ");
}

/// Test that a shared dictionary lives until its last user is deleted.
#[test]
fn test_shared_dictionary_reference_counting() {
	let (_dir, path) = file_store();
	let mut conn = Connection::open(&path, false).unwrap();
	conn.add_config("one", &words("c1", "shared")).unwrap();
	conn.add_config("two", &words("c2", "shared")).unwrap();
	conn.train("one", &["alpha beta"]).unwrap();
	conn.train("two", &["beta gamma"]).unwrap();

	assert!(conn.delete_config("one").unwrap());
	let remaining = tables(Path::new(&path));
	assert!(remaining.contains("shared"));
	assert!(!remaining.contains("c1"));
	assert_eq!(conn.output_string("two", None).unwrap(), "beta gamma ");

	assert!(conn.delete_config("two").unwrap());
	assert_eq!(tables(Path::new(&path)), HashSet::from(["markov_metainfo".to_owned()]));
	assert!(!conn.delete_config("two").unwrap());
}

/// Test that table names differing only in case name the same table.
#[test]
fn test_table_names_ignore_case() {
	let (_dir, path) = file_store();
	let mut conn = Connection::open(&path, false).unwrap();
	conn.add_config("one", &words("c1", "shared")).unwrap();
	conn.add_config("two", &words("c2", "SHARED")).unwrap();
	conn.train("one", &["alpha beta"]).unwrap();
	conn.train("two", &["beta gamma"]).unwrap();

	assert!(matches!(conn.add_config("three", &words("C1", "d3")), Err(MarkovError::ConfigExist)));
	assert_eq!(conn.get_config("three").unwrap(), None);

	assert!(conn.delete_config("one").unwrap());
	assert!(tables(Path::new(&path)).contains("shared"));
	assert_eq!(conn.output_string("two", None).unwrap(), "beta gamma ");
}

/// Test that SQL keywords work as table names.
#[test]
fn test_keyword_table_names() {
	let (_dir, path) = file_store();
	let mut conn = Connection::open(&path, false).unwrap();
	conn.add_config("chain", &words("order", "index")).unwrap();
	conn.train("chain", &["the cat sat"]).unwrap();

	assert_eq!(conn.output_string("chain", None).unwrap(), "the cat sat ");
	assert!(conn.delete_config("chain").unwrap());
	assert_eq!(tables(Path::new(&path)), HashSet::from(["markov_metainfo".to_owned()]));
}

/// Test that windows wider than a table can hold are refused up front.
#[test]
fn test_oversized_window_refused() {
	let (_dir, path) = file_store();
	let mut conn = Connection::open(&path, false).unwrap();
	let mut config = words("c1", "d1");
	config.window_size = 5000;

	assert!(matches!(conn.add_config("wide", &config), Err(MarkovError::BadConfig(_))));
	assert_eq!(tables(Path::new(&path)), HashSet::from(["markov_metainfo".to_owned()]));
}

/// Test that training rebuilds both secondary indexes, even when run twice.
#[test]
fn test_training_rebuilds_indexes() {
	let (_dir, path) = file_store();
	let mut conn = Connection::open(&path, false).unwrap();
	let mut config = words("c1", "d1");
	config.window_size = 2;
	conn.add_config("chain", &config).unwrap();
	conn.train("chain", &["the cat sat"]).unwrap();
	conn.train("chain", &["the cat ran"]).unwrap();

	let db = rusqlite::Connection::open(&path).unwrap();
	let mut stmt = db.prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE '%_index';").unwrap();
	let indexes: HashSet<String> = stmt
		.query_map([], |row| row.get::<_, String>(0))
		.unwrap()
		.collect::<rusqlite::Result<_>>()
		.unwrap();
	assert_eq!(indexes, HashSet::from(["c1_index".to_owned(), "d1_index".to_owned()]));

	let mut stmt = db.prepare("SELECT name FROM pragma_index_info('c1_index') ORDER BY seqno;").unwrap();
	let columns: Vec<String> = stmt
		.query_map([], |row| row.get::<_, String>(0))
		.unwrap()
		.collect::<rusqlite::Result<_>>()
		.unwrap();
	assert_eq!(columns, vec!["str1", "str2"]);

	let mut stmt = db.prepare("SELECT name FROM pragma_index_info('d1_index');").unwrap();
	let columns: Vec<String> = stmt
		.query_map([], |row| row.get::<_, String>(0))
		.unwrap()
		.collect::<rusqlite::Result<_>>()
		.unwrap();
	assert_eq!(columns, vec!["str"]);
}

/// Test that a failure after the metadata row is written undoes the whole registration.
#[test]
fn test_failed_add_rolls_back() {
	let (_dir, path) = file_store();
	let mut conn = Connection::open(&path, false).unwrap();
	conn.add_config("first", &words("c1", "d1")).unwrap();

	// The transition table collides with the dictionary of "first"
	assert!(matches!(conn.add_config("second", &words("d1", "d2")), Err(MarkovError::Storage(_))));
	assert_eq!(conn.get_config("second").unwrap(), None);

	let expected: HashSet<String> = ["markov_metainfo", "c1", "d1"].iter().map(|s| s.to_string()).collect();
	assert_eq!(tables(Path::new(&path)), expected);

	// The name is free again
	conn.add_config("second", &words("c2", "d2")).unwrap();
}

/// Test that caps above i64::MAX survive storage.
#[test]
fn test_huge_generation_cap() {
	let (_dir, path) = file_store();
	let mut conn = Connection::open(&path, false).unwrap();
	let mut config = words("c1", "d1");
	config.generation_cap = u64::MAX;
	conn.add_config("chain", &config).unwrap();
	assert_eq!(conn.get_config("chain").unwrap().unwrap().generation_cap, u64::MAX);

	conn.add_config("other", &words("c2", "d1")).unwrap();
	let db = rusqlite::Connection::open(&path).unwrap();
	db.execute("UPDATE markov_metainfo SET maxgen=?1 WHERE name='other';", [i64::MIN]).unwrap();
	assert_eq!(conn.get_config("other").unwrap().unwrap().generation_cap, 1 << 63);
}

/// Test that a deleted name can be registered again from scratch.
#[test]
fn test_delete_then_add_again() {
	let mut conn = Connection::open_in_memory().unwrap();
	conn.add_config("chain", &words("c1", "d1")).unwrap();
	conn.train("chain", &["old words"]).unwrap();
	assert!(conn.delete_config("chain").unwrap());

	conn.add_config("chain", &words("c1", "d1")).unwrap();
	assert_eq!(conn.output_string("chain", None).unwrap(), "");
}

/// Test that operations on unknown names fail.
#[test]
fn test_unknown_chain() {
	let mut conn = Connection::open_in_memory().unwrap();

	assert!(matches!(conn.train("missing", &["text"]), Err(MarkovError::ConfigNotFound)));
	assert!(matches!(conn.output_string("missing", None), Err(MarkovError::ConfigNotFound)));
	assert!(!conn.delete_config("missing").unwrap());
}

/// Test that read-only stores refuse mutations before any other check.
#[test]
fn test_read_only_store() {
	let (_dir, path) = file_store();
	{
		let mut conn = Connection::open(&path, false).unwrap();
		conn.add_config("chain", &words("c1", "d1")).unwrap();
		conn.train("chain", &["the cat sat"]).unwrap();
	}

	let mut conn = Connection::open(&path, true).unwrap();
	assert!(conn.is_read_only());

	let mut invalid = words("c2", "d2");
	invalid.window_size = 0;
	assert!(matches!(conn.add_config("new", &invalid), Err(MarkovError::ReadOnly)));
	assert!(matches!(conn.add_config("chain", &words("c1", "d1")), Err(MarkovError::ReadOnly)));
	assert!(matches!(conn.delete_config("missing"), Err(MarkovError::ReadOnly)));
	assert!(matches!(conn.train("missing", &["x"]), Err(MarkovError::ReadOnly)));

	assert_eq!(conn.get_config("chain").unwrap(), Some(words("c1", "d1")));
	assert_eq!(conn.output_string("chain", None).unwrap(), "the cat sat ");
}

/// Test that a read-only store without any chain reports no config.
#[test]
fn test_read_only_empty_store() {
	let (_dir, path) = file_store();
	std::fs::File::create(&path).unwrap();

	let conn = Connection::open(&path, true).unwrap();
	assert_eq!(conn.get_config("chain").unwrap(), None);
	assert!(matches!(conn.output_string("chain", None), Err(MarkovError::ConfigNotFound)));
}

/// Test that patterns operate on characters, not bytes.
#[test]
fn test_character_level_chain() {
	let mut conn = Connection::open_in_memory().unwrap();
	let mut config = ChainConfig::new(".", "chars", "chars_dict");
	config.window_size = 2;
	conn.add_config("chars", &config).unwrap();
	conn.train("chars", &["żółw"]).unwrap();

	assert_eq!(conn.output_string("chars", None).unwrap(), "żółw");
}
