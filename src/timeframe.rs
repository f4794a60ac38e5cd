use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Urgency bucket a task is filed under, most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timeframe {
	Today,
	Week,
	Month,
	Year,
}

impl Timeframe {
	pub const ALL: [Timeframe; 4] = [Timeframe::Today, Timeframe::Week, Timeframe::Month, Timeframe::Year];

	pub fn as_str(self) -> &'static str {
		match self {
			Timeframe::Today => "today",
			Timeframe::Week => "week",
			Timeframe::Month => "month",
			Timeframe::Year => "year",
		}
	}

	pub fn title(self) -> &'static str {
		match self {
			Timeframe::Today => "Today",
			Timeframe::Week => "Week",
			Timeframe::Month => "Month",
			Timeframe::Year => "Year",
		}
	}

	/// Name of the checklist document backing this timeframe.
	pub fn file_name(self) -> &'static str {
		match self {
			Timeframe::Today => "_2_today.md",
			Timeframe::Week => "_3_week.md",
			Timeframe::Month => "_4_month.md",
			Timeframe::Year => "_5_year.md",
		}
	}

	/// One step toward today; `None` when already there.
	pub fn promoted(self) -> Option<Timeframe> {
		match self {
			Timeframe::Today => None,
			Timeframe::Week => Some(Timeframe::Today),
			Timeframe::Month => Some(Timeframe::Week),
			Timeframe::Year => Some(Timeframe::Month),
		}
	}

	/// One step away from today; `None` when already at year.
	pub fn demoted(self) -> Option<Timeframe> {
		match self {
			Timeframe::Today => Some(Timeframe::Week),
			Timeframe::Week => Some(Timeframe::Month),
			Timeframe::Month => Some(Timeframe::Year),
			Timeframe::Year => None,
		}
	}
}

impl fmt::Display for Timeframe {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Timeframe {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"today" => Ok(Timeframe::Today),
			"week" => Ok(Timeframe::Week),
			"month" => Ok(Timeframe::Month),
			"year" => Ok(Timeframe::Year),
			_ => Err(Error::InvalidTimeframe(s.to_string())),
		}
	}
}

/// Which checklists an operation touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
	#[default]
	All,
	Only(Timeframe),
}

impl Scope {
	pub fn timeframes(self) -> Vec<Timeframe> {
		match self {
			Scope::All => Timeframe::ALL.to_vec(),
			Scope::Only(tf) => vec![tf],
		}
	}

	/// `None` means all four, anything else must parse as a timeframe.
	pub fn parse(s: Option<&str>) -> Result<Scope, Error> {
		match s {
			None => Ok(Scope::All),
			Some(v) if v.eq_ignore_ascii_case("all") => Ok(Scope::All),
			Some(v) => Ok(Scope::Only(v.parse()?)),
		}
	}
}

impl From<Timeframe> for Scope {
	fn from(tf: Timeframe) -> Self {
		Scope::Only(tf)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_case_insensitively() {
		assert_eq!("Today".parse::<Timeframe>().unwrap(), Timeframe::Today);
		assert_eq!(" YEAR ".parse::<Timeframe>().unwrap(), Timeframe::Year);
	}

	#[test]
	fn rejects_unknown_timeframe() {
		let err = "vomit".parse::<Timeframe>().unwrap_err();
		assert!(matches!(err, Error::InvalidTimeframe(ref s) if s == "vomit"));
	}

	#[test]
	fn ladder_stops_at_both_ends() {
		assert_eq!(Timeframe::Year.promoted(), Some(Timeframe::Month));
		assert_eq!(Timeframe::Today.promoted(), None);
		assert_eq!(Timeframe::Today.demoted(), Some(Timeframe::Week));
		assert_eq!(Timeframe::Year.demoted(), None);
	}

	#[test]
	fn scope_parsing() {
		assert_eq!(Scope::parse(None).unwrap(), Scope::All);
		assert_eq!(Scope::parse(Some("all")).unwrap(), Scope::All);
		assert_eq!(Scope::parse(Some("week")).unwrap(), Scope::Only(Timeframe::Week));
		assert!(Scope::parse(Some("someday")).is_err());
		assert_eq!(Scope::All.timeframes().len(), 4);
	}
}
