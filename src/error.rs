use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	#[error("invalid timeframe: {0} (expected today, week, month or year)")]
	InvalidTimeframe(String),

	#[error("no timeframe keyword found in: {0}")]
	Classification(String),

	#[error("invalid task: {0}")]
	InvalidTask(String),

	#[error("invalid pattern: {0}")]
	InvalidPattern(#[from] regex::Error),

	#[error("cannot move tasks from {0} to the same timeframe")]
	SameTimeframe(crate::Timeframe),

	#[error("{action} {}: {source}", .path.display())]
	Io {
		action: &'static str,
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

impl Error {
	pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		Error::Io { action, path: path.into(), source }
	}
}
