//! Keyword heuristics that file free text under a timeframe.

use crate::error::{Error, Result};
use crate::timeframe::Timeframe;

const TODAY_CUES: &[&str] = &["today", "now", "immediate", "asap", "tonight"];
const WEEK_CUES: &[&str] = &["week", "this week", "few days", "weekend", "by friday"];
const MONTH_CUES: &[&str] = &["month", "this month", "few weeks", "next month"];
const YEAR_CUES: &[&str] = &["year", "this year", "long-term", "eventually"];

/// Keyword set for a timeframe.
pub fn cues(timeframe: Timeframe) -> &'static [&'static str] {
	match timeframe {
		Timeframe::Today => TODAY_CUES,
		Timeframe::Week => WEEK_CUES,
		Timeframe::Month => MONTH_CUES,
		Timeframe::Year => YEAR_CUES,
	}
}

/// Resolve the timeframe for `text`.
///
/// An explicit hint is returned as is. Otherwise the keyword sets are tried
/// in urgency order and the first set with any substring hit wins, so a note
/// mentioning both "today" and "next month" lands in today. No hit is an
/// error; callers decide whether to drop the text or ask for a hint.
pub fn classify(text: &str, hint: Option<Timeframe>) -> Result<Timeframe> {
	if let Some(tf) = hint {
		return Ok(tf);
	}
	let lower = text.to_lowercase();
	Timeframe::ALL
		.into_iter()
		.find(|tf| cues(*tf).iter().any(|cue| lower.contains(cue)))
		.ok_or_else(|| Error::Classification(text.trim().to_string()))
}
