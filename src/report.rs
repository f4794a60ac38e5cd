//! Read-only views over registry state.

use chrono::{DateTime, Duration, Utc};

use crate::registry::TaskRegistry;
use crate::store::Backend;
use crate::task::TaskEntry;
use crate::timeframe::{Scope, Timeframe};

pub const RECENT_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
	pub total: usize,
	pub completed: usize,
}

impl Tally {
	pub fn of(entries: &[TaskEntry]) -> Self {
		Tally { total: entries.len(), completed: entries.iter().filter(|e| e.completed).count() }
	}

	pub fn incomplete(&self) -> usize {
		self.total - self.completed
	}

	/// Completed share in percent, 0 for an empty list.
	pub fn percent(&self) -> f64 {
		if self.total == 0 {
			return 0.0;
		}
		self.completed as f64 / self.total as f64 * 100.0
	}

	pub fn ratio(&self) -> String {
		format!("{}/{}", self.completed, self.total)
	}
}

impl std::ops::Add for Tally {
	type Output = Tally;

	fn add(self, rhs: Tally) -> Tally {
		Tally { total: self.total + rhs.total, completed: self.completed + rhs.completed }
	}
}

/// `████░░░░ 50.0%`
pub fn progress_bar(percent: f64, width: usize) -> String {
	let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64) as usize;
	format!("{}{} {:.1}%", "█".repeat(filled), "░".repeat(width - filled), percent)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
	pub rows: Vec<(Timeframe, Tally)>,
	pub total: Tally,
}

pub fn overview<B: Backend>(registry: &TaskRegistry<B>, scope: Scope) -> Overview {
	let rows: Vec<(Timeframe, Tally)> =
		scope.timeframes().into_iter().map(|tf| (tf, Tally::of(registry.checklist(tf).entries()))).collect();
	let total = rows.iter().fold(Tally::default(), |acc, (_, t)| acc + *t);
	Overview { rows, total }
}

#[derive(Debug, Clone)]
pub struct TimeframeStatus {
	pub timeframe: Timeframe,
	pub tally: Tally,
	/// Completed within `RECENT_DAYS`, newest first.
	pub recently_completed: Vec<TaskEntry>,
	pub incomplete: Vec<TaskEntry>,
}

pub fn status<B: Backend>(registry: &TaskRegistry<B>, tf: Timeframe, now: DateTime<Utc>) -> TimeframeStatus {
	let entries = registry.checklist(tf).entries();
	let cutoff = now - Duration::days(RECENT_DAYS);
	let mut recently_completed: Vec<TaskEntry> =
		entries.iter().filter(|e| e.completed && e.touched.is_some_and(|t| t >= cutoff)).cloned().collect();
	recently_completed.sort_by(|a, b| b.touched.cmp(&a.touched));
	TimeframeStatus {
		timeframe: tf,
		tally: Tally::of(entries),
		recently_completed,
		incomplete: entries.iter().filter(|e| !e.completed).cloned().collect(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::MemoryBackend;
	use chrono::TimeZone;

	#[test]
	fn tally_and_percent() {
		let t = Tally { total: 4, completed: 1 };
		assert_eq!(t.incomplete(), 3);
		assert_eq!(t.percent(), 25.0);
		assert_eq!(t.ratio(), "1/4");
		assert_eq!(Tally::default().percent(), 0.0);
	}

	#[test]
	fn bar_rendering() {
		assert_eq!(progress_bar(50.0, 10), "█████░░░░░ 50.0%");
		assert_eq!(progress_bar(0.0, 4), "░░░░ 0.0%");
		assert_eq!(progress_bar(100.0, 4), "████ 100.0%");
	}

	#[test]
	fn overview_sums_every_timeframe() {
		let backend = MemoryBackend::new()
			.with_document(Timeframe::Today, "[x] A\n[ ] B\n")
			.with_document(Timeframe::Year, "[x] C\n");
		let reg = TaskRegistry::open(backend).unwrap();
		let ov = overview(&reg, Scope::All);
		assert_eq!(ov.rows.len(), 4);
		assert_eq!(ov.rows[0], (Timeframe::Today, Tally { total: 2, completed: 1 }));
		assert_eq!(ov.rows[1].1, Tally::default());
		assert_eq!(ov.total, Tally { total: 3, completed: 2 });
		assert_eq!(overview(&reg, Timeframe::Year.into()).total.completed, 1);
	}

	#[test]
	fn status_lists_recent_completions_newest_first() {
		let backend = MemoryBackend::new().with_document(
			Timeframe::Week,
			"[x] Old <!-- touched:2026-09-01T00:00:00Z -->\n\
			 [x] Older recent <!-- touched:2026-10-12T00:00:00Z -->\n\
			 [x] Newest <!-- touched:2026-10-15T00:00:00Z -->\n\
			 [x] Unknown\n\
			 [ ] Open\n",
		);
		let reg = TaskRegistry::open(backend).unwrap();
		let now = Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap();
		let st = status(&reg, Timeframe::Week, now);
		assert_eq!(st.tally, Tally { total: 5, completed: 4 });
		let recent: Vec<_> = st.recently_completed.iter().map(|e| e.text.as_str()).collect();
		assert_eq!(recent, vec!["Newest", "Older recent"]);
		assert_eq!(st.incomplete.len(), 1);
	}
}
