//! Turning a raw brain dump into filed tasks.
//!
//! A dump is split into clauses (one per line, then one per comma), each
//! clause is stripped of list markers and a leading filler phrase, classified
//! on its own, and cleaned of the cue that placed it. Clauses that cannot be
//! placed are dropped with a warning; they never stop the rest of the batch.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::classify::{classify, cues};
use crate::error::Result;
use crate::registry::{AddOutcome, TaskRegistry};
use crate::store::Backend;
use crate::task::{clean_text, TaskEntry};
use crate::timeframe::Timeframe;

static LIST_MARKER_RE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)]|\[[ xX]?\])\s+").expect("valid list marker regex"));
static FILLER_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"(?i)^(?:i need to|i have to|i should|i want to|need to|have to|should|gotta|must|want to)(?:\s+|$)")
		.expect("valid filler regex")
});
static CUE_RES: Lazy<[Regex; 4]> = Lazy::new(|| Timeframe::ALL.map(cue_regex));

const CONNECTORS: &[&str] = &["by", "in", "within", "for", "on", "over", "the", "this", "next", "a", "an"];

fn cue_regex(tf: Timeframe) -> Regex {
	let mut words: Vec<&str> = cues(tf).to_vec();
	words.sort_by_key(|w| std::cmp::Reverse(w.len()));
	let alternation = words.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join("|");
	Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).expect("valid cue regex")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
	pub text: String,
	pub timeframe: Timeframe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
	/// No timeframe keyword in the clause.
	Unclassified,
	/// Nothing left once filler and cue words were removed.
	Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dropped {
	pub clause: String,
	pub reason: DropReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
	pub items: Vec<Extracted>,
	pub dropped: Vec<Dropped>,
}

#[derive(Debug, Clone, Default)]
pub struct CommitReport {
	pub added: Vec<TaskEntry>,
	pub duplicates: Vec<TaskEntry>,
	pub dropped: Vec<Dropped>,
}

/// Split a dump into trimmed, non-empty clauses in input order.
pub fn clauses(raw: &str) -> Vec<String> {
	raw.lines()
		.map(|line| LIST_MARKER_RE.replace(line, "").into_owned())
		.flat_map(|line| line.split(',').map(clean_text).collect::<Vec<_>>())
		.filter(|c| !c.is_empty())
		.collect()
}

/// Drop at most one leading filler phrase.
pub fn strip_filler(clause: &str) -> String {
	clean_text(&FILLER_RE.replace(clause, ""))
}

/// Remove the cue words of `tf` and any connector they leave dangling.
pub fn strip_cues(text: &str, tf: Timeframe) -> String {
	let without = CUE_RES[tf as usize].replace_all(text, " ");
	let cleaned = clean_text(&without);
	let cleaned = cleaned.trim_end_matches(|c: char| matches!(c, '.' | '!' | ';' | ':') || c.is_whitespace());
	let mut words: Vec<&str> = cleaned.split(' ').filter(|w| !w.is_empty()).collect();
	while words.last().is_some_and(|w| is_connector(w)) {
		words.pop();
	}
	let lead = words.iter().take_while(|w| is_connector(w)).count();
	if lead < words.len() {
		words.drain(..lead);
	}
	words.join(" ")
}

fn is_connector(word: &str) -> bool {
	CONNECTORS.iter().any(|c| c.eq_ignore_ascii_case(word))
}

/// Upper-case the first character, leaving the rest as typed.
pub fn capitalize(s: &str) -> String {
	let mut chars = s.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
		None => String::new(),
	}
}

pub fn extract(raw: &str) -> Extraction {
	let mut out = Extraction::default();
	for clause in clauses(raw) {
		let body = strip_filler(&clause);
		let tf = match classify(&body, None) {
			Ok(tf) => tf,
			Err(e) => {
				warn!(clause = %clause, "dropping clause: {}", e);
				out.dropped.push(Dropped { clause, reason: DropReason::Unclassified });
				continue;
			}
		};
		let text = strip_cues(&body, tf);
		if text.is_empty() {
			warn!(clause = %clause, "dropping clause: nothing left after removing cue words");
			out.dropped.push(Dropped { clause, reason: DropReason::Empty });
			continue;
		}
		out.items.push(Extracted { text: capitalize(&text), timeframe: tf });
	}
	out
}

/// Append a note to the brain-dump buffer.
pub fn append<B: Backend>(registry: &mut TaskRegistry<B>, text: &str) -> Result<()> {
	let backend = registry.backend_mut();
	let mut buffer = backend.read_dump()?;
	if !buffer.is_empty() && !buffer.ends_with('\n') {
		buffer.push('\n');
	}
	buffer.push_str(text.trim_end());
	buffer.push('\n');
	backend.write_dump(&buffer)
}

/// Extract the buffer into the registry, then empty the buffer.
///
/// The buffer is only cleared once every extracted item has been added
/// (duplicates included). Clauses dropped during extraction do not hold it
/// back. The batch is all or nothing: a failed add undoes the adds before it
/// and leaves the buffer as it was.
pub fn commit<B: Backend>(registry: &mut TaskRegistry<B>) -> Result<CommitReport> {
	let raw = registry.backend().read_dump()?;
	let extraction = extract(&raw);
	let report = registry.transaction(|reg| {
		let mut report = CommitReport { dropped: extraction.dropped, ..Default::default() };
		for item in extraction.items {
			match reg.add(&item.text, item.timeframe, false)? {
				AddOutcome::Added(e) => report.added.push(e),
				AddOutcome::Duplicate(e) => report.duplicates.push(e),
			}
		}
		if !raw.is_empty() {
			reg.backend_mut().write_dump("")?;
		}
		Ok(report)
	})?;
	info!(added = report.added.len(), duplicates = report.duplicates.len(), dropped = report.dropped.len(), "processed brain dump");
	Ok(report)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::Error;
	use crate::store::{FailingSaves, MemoryBackend};

	fn pairs(x: &Extraction) -> Vec<(&str, Timeframe)> {
		x.items.iter().map(|i| (i.text.as_str(), i.timeframe)).collect()
	}

	#[test]
	fn extracts_comma_separated_clauses_independently() {
		let x = extract("need to finish api today, apply to jobs this week, learn rust this month");
		assert_eq!(
			pairs(&x),
			vec![("Finish api", Timeframe::Today), ("Apply to jobs", Timeframe::Week), ("Learn rust", Timeframe::Month)]
		);
		assert!(x.dropped.is_empty());
	}

	#[test]
	fn lines_and_list_markers() {
		let raw = "- call mom tonight\n\n* 1. nothing\n2) renew passport next month\n[ ] write novel eventually\n   \n";
		let x = extract(raw);
		assert_eq!(
			pairs(&x),
			vec![("Call mom", Timeframe::Today), ("Renew passport", Timeframe::Month), ("Write novel", Timeframe::Year)]
		);
		assert_eq!(x.dropped.len(), 1);
		assert_eq!(x.dropped[0].reason, DropReason::Unclassified);
	}

	#[test]
	fn only_one_leading_filler_is_removed() {
		assert_eq!(strip_filler("Need to  have to fix bike"), "have to fix bike");
		assert_eq!(strip_filler("I should call Bob"), "call Bob");
		assert_eq!(strip_filler("shouldn't matter"), "shouldn't matter");
		assert_eq!(strip_filler("fix the need to thing"), "fix the need to thing");
	}

	#[test]
	fn cue_removal_cleans_dangling_connectors() {
		assert_eq!(strip_cues("send invoice by friday", Timeframe::Week), "send invoice");
		assert_eq!(strip_cues("do taxes in a month.", Timeframe::Month), "do taxes");
		assert_eq!(strip_cues("today reply to Sam", Timeframe::Today), "reply to Sam");
		// whole words only, "know" keeps its "now"
		assert_eq!(strip_cues("get to know the team now", Timeframe::Today), "get to know the team");
	}

	#[test]
	fn capitalizes_only_the_first_letter() {
		assert_eq!(capitalize("email Bob about API"), "Email Bob about API");
		assert_eq!(capitalize(""), "");
		// typed case is kept, shouting included
		assert_eq!(pairs(&extract("FINISH API today")), vec![("FINISH API", Timeframe::Today)]);
	}

	#[test]
	fn clause_that_is_only_a_cue_is_dropped() {
		let x = extract("today, this week");
		assert!(x.items.is_empty());
		assert!(x.dropped.iter().all(|d| d.reason == DropReason::Empty));
	}

	#[test]
	fn commit_files_tasks_and_clears_buffer() {
		let backend = MemoryBackend::new().with_dump("need to finish api today, apply to jobs this week, learn rust this month\n");
		let mut reg = TaskRegistry::open(backend).unwrap();
		let report = commit(&mut reg).unwrap();
		assert_eq!(report.added.len(), 3);
		assert_eq!(reg.checklist(Timeframe::Today).entries()[0].text, "Finish api");
		assert!(!reg.checklist(Timeframe::Week).entries()[0].completed);
		assert_eq!(reg.checklist(Timeframe::Month).entries()[0].text, "Learn rust");
		assert_eq!(reg.backend().read_dump().unwrap(), "");
	}

	#[test]
	fn unclassifiable_clause_commits_nothing_but_still_clears() {
		let backend = MemoryBackend::new().with_dump("buy milk");
		let mut reg = TaskRegistry::open(backend).unwrap();
		let report = commit(&mut reg).unwrap();
		assert!(report.added.is_empty());
		assert_eq!(report.dropped.len(), 1);
		assert!(Timeframe::ALL.iter().all(|tf| reg.checklist(*tf).is_empty()));
		assert_eq!(reg.backend().read_dump().unwrap(), "");
	}

	#[test]
	fn duplicates_are_reported_not_fatal() {
		let backend = MemoryBackend::new()
			.with_document(Timeframe::Today, "[ ] Call mom\n")
			.with_dump("call mom tonight\ncall   MOM now");
		let mut reg = TaskRegistry::open(backend).unwrap();
		let report = commit(&mut reg).unwrap();
		assert!(report.added.is_empty());
		assert_eq!(report.duplicates.len(), 2);
		assert_eq!(reg.checklist(Timeframe::Today).len(), 1);
	}

	#[test]
	fn append_adds_lines_to_the_buffer() {
		let mut reg = TaskRegistry::open(MemoryBackend::new().with_dump("call mom tonight")).unwrap();
		append(&mut reg, "learn rust this month").unwrap();
		assert_eq!(reg.backend().read_dump().unwrap(), "call mom tonight\nlearn rust this month\n");
	}

	#[test]
	fn failed_add_rolls_back_the_whole_batch() {
		let dump = "finish api today, apply to jobs this week";
		let inner = MemoryBackend::new().with_document(Timeframe::Today, "[ ] Call mom\n").with_dump(dump);
		let backend = FailingSaves { inner, fail_on: Timeframe::Week };
		let mut reg = TaskRegistry::open(backend).unwrap();
		let err = commit(&mut reg).unwrap_err();
		assert!(matches!(err, Error::Io { .. }));
		assert_eq!(reg.backend().read_dump().unwrap(), dump);
		assert_eq!(reg.backend().inner.document(Timeframe::Today), "[ ] Call mom\n");
		assert_eq!(reg.checklist(Timeframe::Today).len(), 1);
		assert!(reg.checklist(Timeframe::Week).is_empty());
	}
}
