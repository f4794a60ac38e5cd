use std::str::FromStr;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use tracing::{debug, info, warn};

use crate::checklist::{Checklist, CorruptLine};
use crate::classify::classify;
use crate::error::{Error, Result};
use crate::store::Backend;
use crate::task::{normalize, validate_text, Pattern, TaskEntry};
use crate::timeframe::{Scope, Timeframe};

/// Result of an add: either a new entry or the one already filed under the
/// same normalized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
	Added(TaskEntry),
	Duplicate(TaskEntry),
}

impl AddOutcome {
	pub fn entry(&self) -> &TaskEntry {
		match self {
			AddOutcome::Added(e) | AddOutcome::Duplicate(e) => e,
		}
	}

	pub fn is_duplicate(&self) -> bool {
		matches!(self, AddOutcome::Duplicate(_))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
	#[default]
	Any,
	Completed,
	Incomplete,
}

impl StatusFilter {
	fn accepts(self, entry: &TaskEntry) -> bool {
		match self {
			StatusFilter::Any => true,
			StatusFilter::Completed => entry.completed,
			StatusFilter::Incomplete => !entry.completed,
		}
	}
}

impl FromStr for StatusFilter {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"any" | "all" => Ok(StatusFilter::Any),
			"completed" | "complete" | "done" => Ok(StatusFilter::Completed),
			"incomplete" | "pending" | "open" => Ok(StatusFilter::Incomplete),
			other => Err(format!("invalid status: {} (expected completed, incomplete or any)", other)),
		}
	}
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
	pub pattern: Pattern,
	pub scope: Scope,
	pub status: StatusFilter,
	/// Only entries touched within this many days. Entries with no recorded
	/// timestamp never pass this filter.
	pub days: Option<u32>,
}

impl SearchQuery {
	pub fn new(pattern: Pattern) -> Self {
		SearchQuery { pattern, scope: Scope::All, status: StatusFilter::Any, days: None }
	}

	pub fn scope(mut self, scope: Scope) -> Self {
		self.scope = scope;
		self
	}

	pub fn status(mut self, status: StatusFilter) -> Self {
		self.status = status;
		self
	}

	pub fn within_days(mut self, days: Option<u32>) -> Self {
		self.days = days;
		self
	}
}

#[derive(Debug, Clone, Copy)]
enum Completion {
	Complete,
	Uncomplete,
	Toggle,
}

/// Owns the four checklists and the backend they persist to.
///
/// Open one per operation: all four checklists are loaded up front, each
/// mutation edits them in memory and immediately saves every checklist it
/// changed.
pub struct TaskRegistry<B: Backend> {
	backend: B,
	lists: [Checklist; 4],
	warnings: Vec<CorruptLine>,
	clock: fn() -> DateTime<Utc>,
}

fn slot(tf: Timeframe) -> usize {
	tf as usize
}

impl<B: Backend> TaskRegistry<B> {
	pub fn open(backend: B) -> Result<Self> {
		let mut warnings = Vec::new();
		let mut load = |tf: Timeframe| -> Result<Checklist> {
			let loaded = backend.load(tf)?;
			warnings.extend(loaded.warnings);
			Ok(Checklist::from_entries(tf, loaded.entries))
		};
		let lists = [load(Timeframe::Today)?, load(Timeframe::Week)?, load(Timeframe::Month)?, load(Timeframe::Year)?];
		Ok(TaskRegistry { backend, lists, warnings, clock: Utc::now })
	}

	pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
		self.clock = clock;
		self
	}

	pub fn backend(&self) -> &B {
		&self.backend
	}

	pub fn backend_mut(&mut self) -> &mut B {
		&mut self.backend
	}

	/// Malformed lines skipped while loading.
	pub fn warnings(&self) -> &[CorruptLine] {
		&self.warnings
	}

	pub fn checklist(&self, tf: Timeframe) -> &Checklist {
		&self.lists[slot(tf)]
	}

	fn now(&self) -> DateTime<Utc> {
		(self.clock)().trunc_subsecs(0)
	}

	fn persist(&mut self, tf: Timeframe) -> Result<()> {
		self.backend.save(tf, self.lists[slot(tf)].entries())
	}

	/// Run `op` as one unit. If it fails, every checklist it changed is put
	/// back and saved again, so stores already written end up as they were.
	pub fn transaction<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
		let before = self.lists.clone();
		let result = op(self);
		if result.is_err() {
			for (tf, list) in Timeframe::ALL.into_iter().zip(before) {
				if self.lists[slot(tf)].entries() == list.entries() {
					continue;
				}
				self.lists[slot(tf)] = list;
				if let Err(e) = self.persist(tf) {
					warn!(%tf, "rollback could not restore checklist: {}", e);
				}
			}
		}
		result
	}

	pub fn add(&mut self, text: &str, tf: Timeframe, force: bool) -> Result<AddOutcome> {
		let text = validate_text(text)?;
		let key = normalize(&text);
		if !force {
			if let Some(existing) = self.lists[slot(tf)].find_key(&key) {
				debug!(%tf, text = %existing.text, "already filed");
				return Ok(AddOutcome::Duplicate(existing.clone()));
			}
		}
		let mut entry = TaskEntry::new(text, tf);
		entry.touched = Some(self.now());
		self.lists[slot(tf)].push(entry.clone());
		self.persist(tf)?;
		info!(%tf, text = %entry.text, "added task");
		Ok(AddOutcome::Added(entry))
	}

	/// Add under `hint`, or wherever the keywords in `text` point.
	pub fn add_classified(&mut self, text: &str, hint: Option<Timeframe>, force: bool) -> Result<(Timeframe, AddOutcome)> {
		let tf = classify(text, hint)?;
		let outcome = self.add(text, tf, force)?;
		Ok((tf, outcome))
	}

	pub fn quick(&mut self, text: &str) -> Result<(Timeframe, AddOutcome)> {
		self.add_classified(text, None, false)
	}

	/// Remove matches, only the first per checklist unless `match_all`.
	pub fn remove(&mut self, pattern: &Pattern, scope: Scope, match_all: bool) -> Result<usize> {
		let mut total = 0;
		for tf in scope.timeframes() {
			let mut hits = self.lists[slot(tf)].positions(pattern);
			if hits.is_empty() {
				continue;
			}
			if !match_all {
				hits.truncate(1);
			}
			for idx in hits.iter().rev() {
				let gone = self.lists[slot(tf)].remove_at(*idx);
				debug!(%tf, text = %gone.text, "removed task");
			}
			total += hits.len();
			self.persist(tf)?;
		}
		Ok(total)
	}

	pub fn complete(&mut self, pattern: &Pattern, scope: Scope) -> Result<usize> {
		self.set_completion(pattern, scope, Completion::Complete)
	}

	pub fn uncomplete(&mut self, pattern: &Pattern, scope: Scope) -> Result<usize> {
		self.set_completion(pattern, scope, Completion::Uncomplete)
	}

	pub fn toggle(&mut self, pattern: &Pattern, scope: Scope) -> Result<usize> {
		self.set_completion(pattern, scope, Completion::Toggle)
	}

	// Counts entries whose flag actually changed.
	fn set_completion(&mut self, pattern: &Pattern, scope: Scope, how: Completion) -> Result<usize> {
		let now = self.now();
		let mut total = 0;
		for tf in scope.timeframes() {
			let list = &mut self.lists[slot(tf)];
			let mut changed = 0;
			for idx in list.positions(pattern) {
				let current = list.entries()[idx].completed;
				let next = match how {
					Completion::Complete => true,
					Completion::Uncomplete => false,
					Completion::Toggle => !current,
				};
				if next == current {
					continue;
				}
				list.update(idx, |e| {
					e.completed = next;
					e.touched = Some(now);
				});
				changed += 1;
			}
			if changed > 0 {
				debug!(%tf, changed, ?how, "updated completion");
				self.persist(tf)?;
				total += changed;
			}
		}
		Ok(total)
	}

	/// Move every match from `from` to the end of `to`, keeping its completion
	/// flag. A match whose text `to` already holds is dropped rather than
	/// duplicated and still counts as moved. A failed save undoes the move in
	/// both checklists.
	pub fn move_tasks(&mut self, pattern: &Pattern, from: Timeframe, to: Timeframe) -> Result<usize> {
		if from == to {
			return Err(Error::SameTimeframe(from));
		}
		self.transaction(|reg| reg.transfer(pattern, from, to))
	}

	fn transfer(&mut self, pattern: &Pattern, from: Timeframe, to: Timeframe) -> Result<usize> {
		let moved = self.lists[slot(from)].drain_where(|e| pattern.matches(e));
		if moved.is_empty() {
			return Ok(0);
		}
		let now = self.now();
		let count = moved.len();
		let dest = &mut self.lists[slot(to)];
		for mut entry in moved {
			if dest.contains_key(&entry.key()) {
				debug!(%from, %to, text = %entry.text, "destination already has task, dropping moved copy");
				continue;
			}
			entry.touched = Some(now);
			dest.push(entry);
		}
		self.persist(to)?;
		self.persist(from)?;
		info!(%from, %to, count, "moved tasks");
		Ok(count)
	}

	/// One step toward today. Nothing happens for today itself.
	pub fn promote(&mut self, pattern: &Pattern, tf: Timeframe) -> Result<usize> {
		match tf.promoted() {
			Some(to) => self.move_tasks(pattern, tf, to),
			None => Ok(0),
		}
	}

	/// One step away from today. Nothing happens for year.
	pub fn demote(&mut self, pattern: &Pattern, tf: Timeframe) -> Result<usize> {
		match tf.demoted() {
			Some(to) => self.move_tasks(pattern, tf, to),
			None => Ok(0),
		}
	}

	/// Matching entries in timeframe order, then stored order.
	pub fn search(&self, query: &SearchQuery) -> Vec<TaskEntry> {
		// None inside Some: the window reaches past the earliest date, so any
		// tracked entry qualifies
		let cutoff = query.days.map(|d| self.now().checked_sub_signed(Duration::days(i64::from(d))));
		query
			.scope
			.timeframes()
			.into_iter()
			.flat_map(|tf| self.lists[slot(tf)].entries().iter())
			.filter(|e| query.pattern.matches(e))
			.filter(|e| query.status.accepts(e))
			.filter(|e| match cutoff {
				Some(Some(c)) => e.touched.is_some_and(|t| t >= c),
				Some(None) => e.touched.is_some(),
				None => true,
			})
			.cloned()
			.collect()
	}

	/// Delete completed entries.
	pub fn cleanup(&mut self, scope: Scope) -> Result<usize> {
		self.drain_scope(scope, |e| e.completed)
	}

	/// Delete every entry.
	pub fn clear(&mut self, scope: Scope) -> Result<usize> {
		self.drain_scope(scope, |_| true)
	}

	fn drain_scope(&mut self, scope: Scope, drop: fn(&TaskEntry) -> bool) -> Result<usize> {
		let mut total = 0;
		for tf in scope.timeframes() {
			let removed = self.lists[slot(tf)].drain_where(drop);
			if removed.is_empty() {
				continue;
			}
			debug!(%tf, removed = removed.len(), "dropped tasks");
			total += removed.len();
			self.persist(tf)?;
		}
		Ok(total)
	}
}
