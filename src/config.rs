//! Where the documents live and how loud logging is.

use std::env;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

pub const DIR_ENV: &str = "VOMIT_DIR";
pub const LOG_ENV: &str = "VOMIT_LOG";

/// Resolve the data directory: explicit flag, then `VOMIT_DIR`, then a
/// `data/` folder in the working directory if one exists, then the
/// platform data directory.
pub fn data_dir(flag: Option<&Path>, cwd: &Path) -> Option<PathBuf> {
	if let Some(dir) = flag {
		return Some(dir.to_path_buf());
	}
	if let Some(dir) = env::var_os(DIR_ENV).filter(|v| !v.is_empty()) {
		return Some(PathBuf::from(dir));
	}
	let local = cwd.join("data");
	if local.is_dir() {
		return Some(local);
	}
	ProjectDirs::from("dev", "local", "vomit").map(|p| p.data_dir().to_path_buf())
}

/// Filter directive for the tracing subscriber. `VOMIT_LOG` wins, otherwise
/// warnings only, raised by each `-v`.
pub fn log_directive(verbose: u8) -> String {
	if let Ok(v) = env::var(LOG_ENV) {
		if !v.trim().is_empty() {
			return v;
		}
	}
	match verbose {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	}
	.to_string()
}
