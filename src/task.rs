use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};
use crate::timeframe::Timeframe;

pub const MAX_TASK_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntry {
	pub text: String,
	pub completed: bool,
	pub timeframe: Timeframe,
	/// Last create/complete/move applied to this entry, if known.
	pub touched: Option<DateTime<Utc>>,
}

impl TaskEntry {
	pub fn new(text: impl Into<String>, timeframe: Timeframe) -> Self {
		TaskEntry { text: text.into(), completed: false, timeframe, touched: None }
	}

	pub fn key(&self) -> String {
		normalize(&self.text)
	}
}

/// Trim and collapse runs of whitespace to one space. Case is kept.
pub fn clean_text(s: &str) -> String {
	s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Comparison key for dedup and matching: cleaned and lowercased.
pub fn normalize(s: &str) -> String {
	clean_text(s).to_lowercase()
}

/// Clean `raw` and reject text that cannot be stored as a checklist line.
pub fn validate_text(raw: &str) -> Result<String> {
	let text = clean_text(raw);
	if text.is_empty() {
		return Err(Error::InvalidTask("task text cannot be empty".into()));
	}
	let len = text.chars().count();
	if len > MAX_TASK_LEN {
		return Err(Error::InvalidTask(format!("task text is {} characters, limit is {}", len, MAX_TASK_LEN)));
	}
	Ok(text)
}

/// How a pattern argument selects entries.
#[derive(Debug, Clone)]
pub enum Pattern {
	/// Every entry; used for plain listings.
	Any,
	/// Case-insensitive substring of the normalized text.
	Substring(String),
	/// Full normalized-text equality.
	Exact(String),
	/// Substring of the display text, case kept.
	CaseSensitive(String),
	Regex(Regex),
}

impl Pattern {
	pub fn substring(p: &str) -> Self {
		Pattern::Substring(normalize(p))
	}

	pub fn exact(p: &str) -> Self {
		Pattern::Exact(normalize(p))
	}

	pub fn case_sensitive(p: &str) -> Self {
		Pattern::CaseSensitive(clean_text(p))
	}

	/// Regexes are case-insensitive unless the pattern opts out with `(?-i)`.
	pub fn regex(p: &str) -> Result<Self> {
		let re = RegexBuilder::new(p).case_insensitive(true).build()?;
		Ok(Pattern::Regex(re))
	}

	pub fn matches(&self, entry: &TaskEntry) -> bool {
		match self {
			Pattern::Any => true,
			// an empty needle would match everything; treat it as no match
			Pattern::Substring(p) => !p.is_empty() && entry.key().contains(p.as_str()),
			Pattern::Exact(p) => !p.is_empty() && entry.key() == *p,
			Pattern::CaseSensitive(p) => !p.is_empty() && clean_text(&entry.text).contains(p.as_str()),
			Pattern::Regex(re) => re.is_match(&entry.text),
		}
	}
}

impl From<&str> for Pattern {
	fn from(p: &str) -> Self {
		Pattern::substring(p)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn entry(text: &str) -> TaskEntry {
		TaskEntry::new(text, Timeframe::Today)
	}

	#[test]
	fn normalize_collapses_and_lowercases() {
		assert_eq!(normalize("  Buy   MILK\tnow "), "buy milk now");
		assert_eq!(clean_text("  Buy   MILK\tnow "), "Buy MILK now");
	}

	#[test]
	fn validate_rejects_empty_and_long_text() {
		assert!(matches!(validate_text("   "), Err(Error::InvalidTask(_))));
		let long = "a".repeat(MAX_TASK_LEN + 1);
		assert!(matches!(validate_text(&long), Err(Error::InvalidTask(_))));
		assert_eq!(validate_text(" Write   docs ").unwrap(), "Write docs");
	}

	#[test]
	fn substring_is_case_insensitive() {
		let e = entry("Buy Groceries");
		assert!(Pattern::substring("groc").matches(&e));
		assert!(Pattern::substring("BUY").matches(&e));
		assert!(!Pattern::substring("milk").matches(&e));
	}

	#[test]
	fn empty_pattern_matches_nothing() {
		assert!(!Pattern::substring("  ").matches(&entry("Anything")));
		assert!(Pattern::Any.matches(&entry("Anything")));
	}

	#[test]
	fn exact_requires_full_normalized_equality() {
		let e = entry("Buy groceries");
		assert!(Pattern::exact("buy  GROCERIES").matches(&e));
		assert!(!Pattern::exact("Buy").matches(&e));
	}

	#[test]
	fn case_sensitive_and_regex() {
		let e = entry("Email Bob about API");
		assert!(Pattern::case_sensitive("API").matches(&e));
		assert!(!Pattern::case_sensitive("api").matches(&e));
		assert!(Pattern::regex(r"^email\s+\w+").unwrap().matches(&e));
		assert!(matches!(Pattern::regex("(unclosed"), Err(Error::InvalidPattern(_))));
	}
}
