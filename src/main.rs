use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use vomit::config;
use vomit::extract::{self, DropReason};
use vomit::report::{self, progress_bar};
use vomit::{AddOutcome, Error, FileBackend, Pattern, Scope, SearchQuery, StatusFilter, TaskEntry, TaskRegistry, Timeframe};

#[derive(Parser)]
#[command(
	name = "vomit",
	version,
	about = "Brain dump to checklists",
	long_about = "Turn raw brain dumps into checklists filed under today, week, month and year.\n\nNotes are split into clauses, each clause is filed by the timeframe words it\ncontains (today, this week, next month, eventually, ...), and every timeframe is\nkept as a markdown checklist you can edit by hand.",
	after_help = "Examples:\n  vomit dump \"need to finish api today, apply to jobs this week\"\n  vomit process\n  vomit add -t week \"Plan trip\"\n  vomit quick \"call mom tonight\"\n  vomit complete api\n  vomit move flights --from week --to month\n  vomit promote book -t year\n  vomit search fix -s incomplete\n  vomit overview"
)]
struct Cli {
	/// Data directory (default: $VOMIT_DIR, ./data, or the platform data dir)
	#[arg(long = "dir", global = true)]
	dir: Option<PathBuf>,
	/// More log output on stderr (-v info, -vv debug)
	#[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
	verbose: u8,
	#[command(subcommand)]
	action: Action,
}

#[derive(Args)]
struct Match {
	/// Task text or part of it (case-insensitive)
	pattern: String,
	/// Match the whole task text only
	#[arg(short = 'e', long = "exact")]
	exact: bool,
}

impl Match {
	fn pattern(&self) -> Pattern {
		if self.exact { Pattern::exact(&self.pattern) } else { Pattern::substring(&self.pattern) }
	}
}

#[derive(Subcommand)]
enum Action {
	/// Add a task; without -t the timeframe comes from keywords in the text
	Add {
		text: Vec<String>,
		/// today, week, month or year
		#[arg(short = 't', long = "timeframe")]
		timeframe: Option<String>,
		/// Add even if the same text is already filed
		#[arg(short = 'f', long = "force")]
		force: bool,
	},
	/// Add a task filed by keywords only
	Quick { text: Vec<String> },
	/// Append raw notes to the brain dump (reads stdin when no text is given)
	Dump { text: Vec<String> },
	/// File everything in the brain dump and empty it
	Process,
	/// Remove the first matching task per timeframe
	Remove {
		#[command(flatten)]
		m: Match,
		#[arg(short = 't', long = "timeframe")]
		timeframe: Option<String>,
		/// Remove every match, not just the first
		#[arg(short = 'a', long = "all")]
		all: bool,
	},
	/// Mark matching tasks done
	Complete {
		#[command(flatten)]
		m: Match,
		#[arg(short = 't', long = "timeframe")]
		timeframe: Option<String>,
	},
	/// Mark matching tasks not done
	Uncomplete {
		#[command(flatten)]
		m: Match,
		#[arg(short = 't', long = "timeframe")]
		timeframe: Option<String>,
	},
	/// Flip matching tasks
	Toggle {
		#[command(flatten)]
		m: Match,
		#[arg(short = 't', long = "timeframe")]
		timeframe: Option<String>,
	},
	/// Search tasks with filters
	Search {
		#[command(flatten)]
		m: Match,
		#[arg(short = 't', long = "timeframe")]
		timeframe: Option<String>,
		/// Treat the pattern as a regular expression
		#[arg(short = 'r', long = "regex", conflicts_with = "exact")]
		regex: bool,
		/// Keep the case of the pattern
		#[arg(short = 'c', long = "case-sensitive", conflicts_with_all = ["exact", "regex"])]
		case_sensitive: bool,
		/// completed, incomplete or any
		#[arg(short = 's', long = "status", default_value = "any")]
		status: String,
		/// Only tasks touched in the last N days
		#[arg(short = 'd', long = "days")]
		days: Option<u32>,
	},
	/// Quick search across all timeframes
	Find {
		pattern: String,
		#[arg(short = 't', long = "timeframe")]
		timeframe: Option<String>,
	},
	/// List tasks
	Show {
		#[arg(short = 't', long = "timeframe")]
		timeframe: Option<String>,
		/// Completed tasks only
		#[arg(long = "done", conflicts_with = "pending")]
		done: bool,
		/// Incomplete tasks only
		#[arg(long = "pending")]
		pending: bool,
	},
	/// Move matching tasks between timeframes
	Move {
		#[command(flatten)]
		m: Match,
		#[arg(long = "from")]
		from: String,
		#[arg(long = "to")]
		to: String,
	},
	/// Move matching tasks one step toward today
	Promote {
		#[command(flatten)]
		m: Match,
		#[arg(short = 't', long = "timeframe")]
		timeframe: String,
	},
	/// Move matching tasks one step away from today
	Demote {
		#[command(flatten)]
		m: Match,
		#[arg(short = 't', long = "timeframe")]
		timeframe: String,
	},
	/// Delete completed tasks
	Cleanup {
		#[arg(short = 't', long = "timeframe")]
		timeframe: Option<String>,
	},
	/// Delete every task in a timeframe
	Clear {
		#[arg(short = 't', long = "timeframe")]
		timeframe: Option<String>,
		/// Required; clearing cannot be undone
		#[arg(long = "yes")]
		yes: bool,
	},
	/// Completion status per timeframe (default today)
	Status {
		#[arg(short = 't', long = "timeframe")]
		timeframe: Option<String>,
		/// Recently completed and open tasks
		#[arg(short = 'd', long = "details")]
		details: bool,
	},
	/// Progress bars per timeframe
	Progress {
		#[arg(short = 't', long = "timeframe")]
		timeframe: Option<String>,
	},
	/// One line per timeframe plus the total
	Overview,
	/// Copy every document to a timestamped .bak file
	Backup,
	/// Print the data directory
	Path,
}

fn main() -> Result<()> {
	let cli = Cli::parse();
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::new(config::log_directive(cli.verbose)))
		.with_writer(io::stderr)
		.with_target(false)
		.init();

	let cwd = std::env::current_dir().context("cannot read working directory")?;
	let dir = config::data_dir(cli.dir.as_deref(), &cwd).context("cannot resolve data directory")?;
	tracing::debug!(dir = %dir.display(), "using data directory");

	match cli.action {
		Action::Add { text, timeframe, force } => {
			let hint = timeframe.as_deref().map(parse_timeframe).transpose()?;
			let mut reg = open_registry(&dir)?;
			let (tf, outcome) = reg.add_classified(&text.join(" "), hint, force).map_err(explain_classification)?;
			print_added(tf, &outcome);
		}
		Action::Quick { text } => {
			let mut reg = open_registry(&dir)?;
			let (tf, outcome) = reg.quick(&text.join(" ")).map_err(explain_classification)?;
			print_added(tf, &outcome);
		}
		Action::Dump { text } => {
			let text = if text.is_empty() { read_stdin()? } else { text.join(" ") };
			if text.trim().is_empty() {
				bail!("nothing to dump");
			}
			let mut reg = open_registry(&dir)?;
			extract::append(&mut reg, &text)?;
			println!("{} Dumped to {}", "✓".green(), dir.join(vomit::store::DUMP_FILE).display());
		}
		Action::Process => {
			let mut reg = open_registry(&dir)?;
			let report = extract::commit(&mut reg)?;
			for e in &report.added {
				println!("{} {:<6} {}", "+".green(), e.timeframe.title(), e.text);
			}
			for e in &report.duplicates {
				println!("{} {:<6} {} {}", "=".yellow(), e.timeframe.title(), e.text, "(already filed)".dimmed());
			}
			for d in &report.dropped {
				let why = match d.reason {
					DropReason::Unclassified => "no timeframe word",
					DropReason::Empty => "nothing left after cue words",
				};
				println!("{} {} {}", "-".red(), d.clause, format!("({})", why).dimmed());
			}
			println!("Filed {}, already present {}, dropped {}", report.added.len(), report.duplicates.len(), report.dropped.len());
		}
		Action::Remove { m, timeframe, all } => {
			let scope = parse_scope(timeframe.as_deref())?;
			let mut reg = open_registry(&dir)?;
			let n = reg.remove(&m.pattern(), scope, all)?;
			print_count("Removed", n, &m.pattern);
		}
		Action::Complete { m, timeframe } => {
			let scope = parse_scope(timeframe.as_deref())?;
			let mut reg = open_registry(&dir)?;
			let n = reg.complete(&m.pattern(), scope)?;
			print_count("Completed", n, &m.pattern);
		}
		Action::Uncomplete { m, timeframe } => {
			let scope = parse_scope(timeframe.as_deref())?;
			let mut reg = open_registry(&dir)?;
			let n = reg.uncomplete(&m.pattern(), scope)?;
			print_count("Reopened", n, &m.pattern);
		}
		Action::Toggle { m, timeframe } => {
			let scope = parse_scope(timeframe.as_deref())?;
			let mut reg = open_registry(&dir)?;
			let n = reg.toggle(&m.pattern(), scope)?;
			print_count("Toggled", n, &m.pattern);
		}
		Action::Search { m, timeframe, regex, case_sensitive, status, days } => {
			let pattern = if regex {
				Pattern::regex(&m.pattern)?
			} else if case_sensitive {
				Pattern::case_sensitive(&m.pattern)
			} else {
				m.pattern()
			};
			let status: StatusFilter = status.parse().map_err(anyhow::Error::msg)?;
			let query = SearchQuery::new(pattern).scope(parse_scope(timeframe.as_deref())?).status(status).within_days(days);
			let reg = open_registry(&dir)?;
			print_results(&reg.search(&query), &m.pattern);
		}
		Action::Find { pattern, timeframe } => {
			let query = SearchQuery::new(Pattern::substring(&pattern)).scope(parse_scope(timeframe.as_deref())?);
			let reg = open_registry(&dir)?;
			print_results(&reg.search(&query), &pattern);
		}
		Action::Show { timeframe, done, pending } => {
			let status = if done {
				StatusFilter::Completed
			} else if pending {
				StatusFilter::Incomplete
			} else {
				StatusFilter::Any
			};
			let scope = parse_scope(timeframe.as_deref())?;
			let reg = open_registry(&dir)?;
			for tf in scope.timeframes() {
				let entries = reg.search(&SearchQuery::new(Pattern::Any).scope(tf.into()).status(status));
				println!("\n# {}", tf.title().bold());
				if entries.is_empty() {
					println!("{}", "  (empty)".dimmed());
				}
				for (i, e) in entries.iter().enumerate() {
					println!("{:>3}. {}", i + 1, entry_line(e));
				}
			}
		}
		Action::Move { m, from, to } => {
			let (from, to) = (parse_timeframe(&from)?, parse_timeframe(&to)?);
			let mut reg = open_registry(&dir)?;
			let n = reg.move_tasks(&m.pattern(), from, to)?;
			print_count(&format!("Moved {} → {}:", from.title(), to.title()), n, &m.pattern);
		}
		Action::Promote { m, timeframe } => {
			let tf = parse_timeframe(&timeframe)?;
			let Some(to) = tf.promoted() else {
				println!("{} {} is already the most urgent timeframe (0 moved)", "!".yellow(), tf.title());
				return Ok(());
			};
			let mut reg = open_registry(&dir)?;
			let n = reg.promote(&m.pattern(), tf)?;
			print_count(&format!("Promoted {} → {}:", tf.title(), to.title()), n, &m.pattern);
		}
		Action::Demote { m, timeframe } => {
			let tf = parse_timeframe(&timeframe)?;
			let Some(to) = tf.demoted() else {
				println!("{} {} is already the least urgent timeframe (0 moved)", "!".yellow(), tf.title());
				return Ok(());
			};
			let mut reg = open_registry(&dir)?;
			let n = reg.demote(&m.pattern(), tf)?;
			print_count(&format!("Demoted {} → {}:", tf.title(), to.title()), n, &m.pattern);
		}
		Action::Cleanup { timeframe } => {
			let scope = parse_scope(timeframe.as_deref())?;
			let mut reg = open_registry(&dir)?;
			let n = reg.cleanup(scope)?;
			println!("{} Cleaned up {} completed task(s)", "✓".green(), n);
		}
		Action::Clear { timeframe, yes } => {
			let scope = parse_scope(timeframe.as_deref())?;
			if !yes {
				bail!("clear deletes every task in {}; re-run with --yes", scope_label(scope));
			}
			let mut reg = open_registry(&dir)?;
			let n = reg.clear(scope)?;
			println!("{} Cleared {} task(s) from {}", "✓".green(), n, scope_label(scope));
		}
		Action::Status { timeframe, details } => {
			let scope = match timeframe {
				Some(t) => Scope::parse(Some(t.as_str()))?,
				None => Scope::Only(Timeframe::Today),
			};
			let reg = open_registry(&dir)?;
			for tf in scope.timeframes() {
				print_status(&report::status(&reg, tf, Utc::now()), details);
			}
		}
		Action::Progress { timeframe } => {
			let scope = parse_scope(timeframe.as_deref())?;
			let reg = open_registry(&dir)?;
			let ov = report::overview(&reg, scope);
			println!("{:<8} {:<38} {:>9} {:>6}", "", "Progress", "Completed", "Total");
			for (tf, t) in &ov.rows {
				println!("{:<8} {:<38} {:>9} {:>6}", tf.title().cyan(), progress_bar(t.percent(), 30), t.completed, t.total);
			}
		}
		Action::Overview => {
			let reg = open_registry(&dir)?;
			let ov = report::overview(&reg, Scope::All);
			println!("{}", "Overview".bold());
			for (tf, t) in &ov.rows {
				if t.total == 0 {
					println!("{}", format!("{}: empty", tf.title()).dimmed());
				} else {
					println!("{}: {} ({})", tf.title(), progress_bar(t.percent(), 15), t.ratio());
				}
			}
			println!("{}: {} ({})", "Total".bold(), progress_bar(ov.total.percent(), 15), ov.total.ratio());
		}
		Action::Backup => {
			let backend = FileBackend::open(&dir)?;
			let written = backend.backup()?;
			if written.is_empty() {
				println!("Nothing to back up in {}", dir.display());
			}
			for p in written {
				println!("{} {}", "✓".green(), p.display());
			}
		}
		Action::Path => println!("{}", dir.display()),
	}
	Ok(())
}

fn open_registry(dir: &Path) -> Result<TaskRegistry<FileBackend>> {
	let backend = FileBackend::open(dir)?;
	let reg = TaskRegistry::open(backend).with_context(|| format!("load tasks from {}", dir.display()))?;
	Ok(reg)
}

fn parse_timeframe(s: &str) -> Result<Timeframe> {
	Ok(s.parse::<Timeframe>()?)
}

fn parse_scope(s: Option<&str>) -> Result<Scope> {
	Ok(Scope::parse(s)?)
}

fn scope_label(scope: Scope) -> String {
	match scope {
		Scope::All => "all timeframes".to_string(),
		Scope::Only(tf) => tf.title().to_string(),
	}
}

fn explain_classification(e: Error) -> anyhow::Error {
	match e {
		Error::Classification(_) => anyhow::Error::new(e).context("pass -t today|week|month|year or add a timeframe word"),
		other => other.into(),
	}
}

fn read_stdin() -> Result<String> {
	let stdin = io::stdin();
	if stdin.is_terminal() {
		bail!("no text given and stdin is a terminal");
	}
	let mut s = String::new();
	stdin.lock().read_to_string(&mut s).context("read stdin")?;
	Ok(s)
}

fn entry_line(e: &TaskEntry) -> String {
	if e.completed {
		format!("{} {}", "✓".green(), e.text.dimmed())
	} else {
		format!("{} {}", "○".yellow(), e.text)
	}
}

fn print_added(tf: Timeframe, outcome: &AddOutcome) {
	match outcome {
		AddOutcome::Added(e) => println!("{} Added to {}: {}", "✓".green(), tf.title(), e.text.cyan()),
		AddOutcome::Duplicate(e) => println!("{} Already in {}: {}", "=".yellow(), tf.title(), e.text),
	}
}

fn print_count(verb: &str, n: usize, pattern: &str) {
	if n == 0 {
		println!("{} No tasks matched '{}' (0 changed)", "!".yellow(), pattern);
	} else {
		println!("{} {} {} task(s) matching '{}'", "✓".green(), verb, n, pattern);
	}
}

fn print_results(results: &[TaskEntry], pattern: &str) {
	if results.is_empty() {
		println!("{} No tasks matched '{}' (0 found)", "!".yellow(), pattern);
		return;
	}
	for e in results {
		println!("{:<6} {}", e.timeframe.title().cyan(), entry_line(e));
	}
	println!("{} found", results.len());
}

fn print_status(st: &report::TimeframeStatus, details: bool) {
	let name = st.timeframe.title().bold();
	if st.tally.total == 0 {
		println!("{}: {}", name, "no tasks".dimmed());
		return;
	}
	println!("{}: {} complete ({})", name, st.tally.ratio(), progress_bar(st.tally.percent(), 20));
	if !details {
		return;
	}
	if !st.recently_completed.is_empty() {
		println!("{}", format!("Recently completed (last {} days):", report::RECENT_DAYS).green());
		for e in st.recently_completed.iter().take(5) {
			let ago = e.touched.map(|t| (Utc::now() - t).num_days()).unwrap_or_default();
			println!("  ✓ {} {}", e.text, format!("({} days ago)", ago).dimmed());
		}
	}
	if !st.incomplete.is_empty() {
		println!("{}", format!("Incomplete ({}):", st.incomplete.len()).yellow());
		for e in st.incomplete.iter().take(10) {
			println!("  ○ {}", e.text);
		}
	}
}
