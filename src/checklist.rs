use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::task::{Pattern, TaskEntry};
use crate::timeframe::Timeframe;

const TOUCHED_OPEN: &str = " <!-- touched:";
const TOUCHED_CLOSE: &str = " -->";

/// A line in a checklist document that is neither blank nor a checklist item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptLine {
	pub timeframe: Timeframe,
	/// 1-based line number
	pub line: usize,
	pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct Loaded {
	pub entries: Vec<TaskEntry>,
	pub warnings: Vec<CorruptLine>,
}

/// Ordered entries of one timeframe plus a count index on normalized text.
///
/// Every mutation goes through a method here so the index never drifts from
/// the entries. Counts rather than a set because `add --force` may store the
/// same normalized text twice.
#[derive(Debug, Clone)]
pub struct Checklist {
	timeframe: Timeframe,
	entries: Vec<TaskEntry>,
	index: HashMap<String, usize>,
}

impl Checklist {
	pub fn new(timeframe: Timeframe) -> Self {
		Checklist { timeframe, entries: Vec::new(), index: HashMap::new() }
	}

	pub fn from_entries(timeframe: Timeframe, entries: Vec<TaskEntry>) -> Self {
		let mut list = Checklist::new(timeframe);
		for e in entries {
			list.push(e);
		}
		list
	}

	pub fn entries(&self) -> &[TaskEntry] {
		&self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.index.get(key).is_some_and(|n| *n > 0)
	}

	pub fn find_key(&self, key: &str) -> Option<&TaskEntry> {
		if !self.contains_key(key) {
			return None;
		}
		self.entries.iter().find(|e| e.key() == key)
	}

	/// Append, re-homing the entry to this timeframe.
	pub fn push(&mut self, mut entry: TaskEntry) {
		entry.timeframe = self.timeframe;
		*self.index.entry(entry.key()).or_insert(0) += 1;
		self.entries.push(entry);
	}

	pub fn remove_at(&mut self, idx: usize) -> TaskEntry {
		let entry = self.entries.remove(idx);
		self.unindex(&entry.key());
		entry
	}

	/// Apply `f` to the entry at `idx`, re-keying if its text changed.
	pub fn update(&mut self, idx: usize, f: impl FnOnce(&mut TaskEntry)) {
		let before = self.entries[idx].key();
		f(&mut self.entries[idx]);
		self.entries[idx].timeframe = self.timeframe;
		let after = self.entries[idx].key();
		if before != after {
			self.unindex(&before);
			*self.index.entry(after).or_insert(0) += 1;
		}
	}

	/// Remove every entry matching `drop`, returning them in order.
	pub fn drain_where(&mut self, mut drop: impl FnMut(&TaskEntry) -> bool) -> Vec<TaskEntry> {
		let mut removed = Vec::new();
		let mut kept = Vec::with_capacity(self.entries.len());
		for e in self.entries.drain(..) {
			if drop(&e) {
				removed.push(e);
			} else {
				kept.push(e);
			}
		}
		self.entries = kept;
		for e in &removed {
			self.unindex(&e.key());
		}
		removed
	}

	/// Indexes of entries matching `pattern`, in stored order.
	pub fn positions(&self, pattern: &Pattern) -> Vec<usize> {
		self.entries.iter().enumerate().filter(|(_, e)| pattern.matches(e)).map(|(i, _)| i).collect()
	}

	fn unindex(&mut self, key: &str) {
		if let Some(n) = self.index.get_mut(key) {
			*n -= 1;
			if *n == 0 {
				self.index.remove(key);
			}
		}
	}
}

/// Render one entry as `[ ] Text` / `[x] Text`, with a trailing comment
/// carrying the touched timestamp when known.
pub fn render_line(entry: &TaskEntry) -> String {
	let mark = if entry.completed { "x" } else { " " };
	match entry.touched {
		Some(t) => format!("[{}] {}{}{}{}", mark, entry.text, TOUCHED_OPEN, t.to_rfc3339_opts(SecondsFormat::Secs, true), TOUCHED_CLOSE),
		None => format!("[{}] {}", mark, entry.text),
	}
}

/// Parse one non-blank line. `None` when it is not a checklist item.
pub fn parse_line(line: &str, timeframe: Timeframe) -> Option<TaskEntry> {
	let trimmed = line.trim();
	// tolerate markdown list bullets written by other editors
	let trimmed = trimmed.strip_prefix("- ").unwrap_or(trimmed);
	let (completed, rest) = if let Some(rest) = trimmed.strip_prefix("[ ]") {
		(false, rest)
	} else if let Some(rest) = trimmed.strip_prefix("[x]").or_else(|| trimmed.strip_prefix("[X]")) {
		(true, rest)
	} else {
		return None;
	};
	if !rest.starts_with(' ') {
		return None;
	}
	let (text, touched) = split_touched(rest.trim());
	if text.is_empty() {
		return None;
	}
	Some(TaskEntry { text: text.to_string(), completed, timeframe, touched })
}

fn split_touched(rest: &str) -> (&str, Option<DateTime<Utc>>) {
	let Some(body) = rest.strip_suffix(TOUCHED_CLOSE.trim_start()) else { return (rest, None) };
	let Some(open) = body.rfind(TOUCHED_OPEN.trim_start()) else { return (rest, None) };
	let stamp = body[open + TOUCHED_OPEN.trim_start().len()..].trim();
	match DateTime::parse_from_rfc3339(stamp) {
		Ok(t) => (body[..open].trim_end(), Some(t.with_timezone(&Utc))),
		Err(_) => (rest, None),
	}
}

pub fn parse_document(timeframe: Timeframe, contents: &str) -> Loaded {
	let mut loaded = Loaded::default();
	for (i, line) in contents.lines().enumerate() {
		if line.trim().is_empty() {
			continue;
		}
		match parse_line(line, timeframe) {
			Some(entry) => loaded.entries.push(entry),
			None => loaded.warnings.push(CorruptLine { timeframe, line: i + 1, content: line.to_string() }),
		}
	}
	loaded
}

pub fn render_document(entries: &[TaskEntry]) -> String {
	if entries.is_empty() {
		return String::new();
	}
	let lines: Vec<String> = entries.iter().map(render_line).collect();
	format!("{}\n", lines.join("\n"))
}
