/// Name of the table holding every `ChainConfig`.
pub(crate) const METADATA_TABLE: &str = "markov_metainfo";

/// `name` as a quoted SQL identifier, so keywords are valid table names.
///
/// Names are checked by `ChainConfig::validate` and never contain quotes.
pub(crate) fn quote(name: &str) -> String {
	format!("\"{name}\"")
}

/// Quoted name of the secondary index of `table`.
pub(crate) fn index_name(table: &str) -> String {
	quote(&format!("{table}_index"))
}

/// Names of the `n` prior-token columns, oldest first (`str1` .. `strN`).
pub(crate) fn prior_columns(n: usize) -> Vec<String> {
	(1..=n).map(|i| format!("str{i}")).collect()
}

/// `count` positional placeholders joined with commas.
pub(crate) fn placeholders(count: usize) -> String {
	vec!["?"; count].join(", ")
}

/// `str1=?1 AND str2=?2 ...` for the `n` prior-token columns.
pub(crate) fn window_filter(n: usize) -> String {
	prior_columns(n)
		.iter()
		.enumerate()
		.map(|(i, column)| format!("{column}=?{}", i + 1))
		.collect::<Vec<_>>()
		.join(" AND ")
}
