use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, warn};

use crate::checklist::{parse_document, render_document, CorruptLine, Loaded};
use crate::error::{Error, Result};
use crate::task::TaskEntry;
use crate::timeframe::Timeframe;

pub const DUMP_FILE: &str = "_1_vomit.txt";

/// Persistence behind the registry: one checklist document per timeframe plus
/// the raw brain-dump buffer. Saves replace the whole document.
pub trait Backend {
	fn load(&self, timeframe: Timeframe) -> Result<Loaded>;
	fn save(&mut self, timeframe: Timeframe, entries: &[TaskEntry]) -> Result<()>;
	fn read_dump(&self) -> Result<String>;
	fn write_dump(&mut self, text: &str) -> Result<()>;
}

fn report_corrupt(loaded: &Loaded, source: &str) {
	for w in &loaded.warnings {
		warn!(timeframe = %w.timeframe, line = w.line, content = %w.content, "skipping malformed line in {}", source);
	}
}

/// Plain files in one data directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
	dir: PathBuf,
}

impl FileBackend {
	pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
		let dir = dir.into();
		fs::create_dir_all(&dir).map_err(|e| Error::io("create data dir", &dir, e))?;
		Ok(FileBackend { dir })
	}

	pub fn path_for(&self, timeframe: Timeframe) -> PathBuf {
		self.dir.join(timeframe.file_name())
	}

	pub fn dump_path(&self) -> PathBuf {
		self.dir.join(DUMP_FILE)
	}

	/// Copy every existing document to `<name>.<stamp>.bak` next to it.
	pub fn backup(&self) -> Result<Vec<PathBuf>> {
		let stamp = Local::now().format("%Y%m%d-%H%M%S");
		let mut names = vec![DUMP_FILE];
		names.extend(Timeframe::ALL.iter().map(|tf| tf.file_name()));
		let mut written = Vec::new();
		for name in names {
			let src = self.dir.join(name);
			if !src.exists() {
				continue;
			}
			let dst = self.dir.join(format!("{}.{}.bak", name, stamp));
			fs::copy(&src, &dst).map_err(|e| Error::io("back up", &src, e))?;
			written.push(dst);
		}
		Ok(written)
	}
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
	if !path.exists() {
		return Ok(Vec::new());
	}
	let mut f = OpenOptions::new().read(true).open(path).map_err(|e| Error::io("open", path, e))?;
	let mut buf = Vec::new();
	f.read_to_end(&mut buf).map_err(|e| Error::io("read", path, e))?;
	Ok(buf)
}

fn read_file(path: &Path) -> Result<String> {
	let bytes = read_bytes(path)?;
	match String::from_utf8(bytes) {
		Ok(s) => Ok(s),
		Err(e) => {
			warn!("{} is not valid UTF-8, replacing undecodable bytes", path.display());
			Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
		}
	}
}

/// Split raw document bytes into text for the parser and the lines that are
/// not UTF-8. Those lines are blanked so the parser keeps the numbering.
fn decode_lines(timeframe: Timeframe, bytes: &[u8]) -> (String, Vec<CorruptLine>) {
	let mut text = String::with_capacity(bytes.len());
	let mut bad = Vec::new();
	for (i, raw) in bytes.split(|b| *b == b'\n').enumerate() {
		if i > 0 {
			text.push('\n');
		}
		match std::str::from_utf8(raw) {
			Ok(line) => text.push_str(line),
			Err(_) => bad.push(CorruptLine {
				timeframe,
				line: i + 1,
				content: String::from_utf8_lossy(raw).trim_end().to_string(),
			}),
		}
	}
	(text, bad)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
	let mut f = OpenOptions::new().create(true).truncate(true).write(true).open(path).map_err(|e| Error::io("write", path, e))?;
	f.write_all(contents.as_bytes()).map_err(|e| Error::io("write", path, e))?;
	Ok(())
}

impl Backend for FileBackend {
	fn load(&self, timeframe: Timeframe) -> Result<Loaded> {
		let path = self.path_for(timeframe);
		let (text, undecodable) = decode_lines(timeframe, &read_bytes(&path)?);
		let mut loaded = parse_document(timeframe, &text);
		loaded.warnings.extend(undecodable);
		loaded.warnings.sort_by_key(|w| w.line);
		report_corrupt(&loaded, &path.display().to_string());
		debug!(%timeframe, entries = loaded.entries.len(), "loaded {}", path.display());
		Ok(loaded)
	}

	fn save(&mut self, timeframe: Timeframe, entries: &[TaskEntry]) -> Result<()> {
		let path = self.path_for(timeframe);
		write_file(&path, &render_document(entries))?;
		debug!(%timeframe, entries = entries.len(), "saved {}", path.display());
		Ok(())
	}

	fn read_dump(&self) -> Result<String> {
		read_file(&self.dump_path())
	}

	fn write_dump(&mut self, text: &str) -> Result<()> {
		write_file(&self.dump_path(), text)
	}
}

/// Documents held as strings, parsed and rendered exactly like files.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
	docs: HashMap<Timeframe, String>,
	dump: String,
}

impl MemoryBackend {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_document(mut self, timeframe: Timeframe, contents: &str) -> Self {
		self.docs.insert(timeframe, contents.to_string());
		self
	}

	pub fn with_dump(mut self, text: &str) -> Self {
		self.dump = text.to_string();
		self
	}

	pub fn document(&self, timeframe: Timeframe) -> &str {
		self.docs.get(&timeframe).map(String::as_str).unwrap_or("")
	}
}

impl Backend for MemoryBackend {
	fn load(&self, timeframe: Timeframe) -> Result<Loaded> {
		let loaded = parse_document(timeframe, self.document(timeframe));
		report_corrupt(&loaded, timeframe.file_name());
		Ok(loaded)
	}

	fn save(&mut self, timeframe: Timeframe, entries: &[TaskEntry]) -> Result<()> {
		self.docs.insert(timeframe, render_document(entries));
		Ok(())
	}

	fn read_dump(&self) -> Result<String> {
		Ok(self.dump.clone())
	}

	fn write_dump(&mut self, text: &str) -> Result<()> {
		self.dump = text.to_string();
		Ok(())
	}
}

/// A backend whose saves to one timeframe always fail.
#[cfg(test)]
pub(crate) struct FailingSaves {
	pub inner: MemoryBackend,
	pub fail_on: Timeframe,
}

#[cfg(test)]
impl Backend for FailingSaves {
	fn load(&self, tf: Timeframe) -> Result<Loaded> {
		self.inner.load(tf)
	}
	fn save(&mut self, tf: Timeframe, entries: &[TaskEntry]) -> Result<()> {
		if tf == self.fail_on {
			return Err(Error::io("write", tf.file_name(), std::io::Error::other("disk full")));
		}
		self.inner.save(tf, entries)
	}
	fn read_dump(&self) -> Result<String> {
		self.inner.read_dump()
	}
	fn write_dump(&mut self, text: &str) -> Result<()> {
		self.inner.write_dump(text)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::registry::TaskRegistry;

	#[test]
	fn missing_documents_load_empty() {
		let tmp = tempfile::tempdir().unwrap();
		let backend = FileBackend::open(tmp.path().join("data")).unwrap();
		let loaded = backend.load(Timeframe::Week).unwrap();
		assert!(loaded.entries.is_empty());
		assert_eq!(backend.read_dump().unwrap(), "");
	}

	#[test]
	fn file_round_trip() {
		let tmp = tempfile::tempdir().unwrap();
		let mut backend = FileBackend::open(tmp.path()).unwrap();
		let mut done = TaskEntry::new("Ship release", Timeframe::Today);
		done.completed = true;
		let open = TaskEntry::new("Write docs", Timeframe::Today);
		backend.save(Timeframe::Today, &[done.clone(), open.clone()]).unwrap();
		let on_disk = fs::read_to_string(tmp.path().join("_2_today.md")).unwrap();
		assert_eq!(on_disk, "[x] Ship release\n[ ] Write docs\n");
		assert_eq!(backend.load(Timeframe::Today).unwrap().entries, vec![done, open]);
	}

	#[test]
	fn undecodable_line_is_skipped_not_fatal() {
		let tmp = tempfile::tempdir().unwrap();
		fs::write(tmp.path().join("_5_year.md"), b"[ ] Good\n[ ] bad \xff\xfe line\n[x] Also good\n").unwrap();
		let backend = FileBackend::open(tmp.path()).unwrap();
		let loaded = backend.load(Timeframe::Year).unwrap();
		let texts: Vec<_> = loaded.entries.iter().map(|e| e.text.as_str()).collect();
		assert_eq!(texts, vec!["Good", "Also good"]);
		assert_eq!(loaded.warnings.len(), 1);
		assert_eq!(loaded.warnings[0].line, 2);
		assert!(loaded.warnings[0].content.starts_with("[ ] bad"));

		let mut reg = TaskRegistry::open(backend).unwrap();
		assert_eq!(reg.warnings().len(), 1);
		assert!(!reg.add("Write docs", Timeframe::Today, false).unwrap().is_duplicate());
	}

	#[test]
	fn undecodable_dump_is_read_lossily() {
		let tmp = tempfile::tempdir().unwrap();
		fs::write(tmp.path().join(DUMP_FILE), b"call mom tonight \xff\n").unwrap();
		let backend = FileBackend::open(tmp.path()).unwrap();
		assert!(backend.read_dump().unwrap().starts_with("call mom tonight"));
	}

	#[test]
	fn empty_save_truncates() {
		let tmp = tempfile::tempdir().unwrap();
		let mut backend = FileBackend::open(tmp.path()).unwrap();
		backend.save(Timeframe::Year, &[TaskEntry::new("Run a marathon", Timeframe::Year)]).unwrap();
		backend.save(Timeframe::Year, &[]).unwrap();
		assert_eq!(fs::read_to_string(backend.path_for(Timeframe::Year)).unwrap(), "");
	}

	#[test]
	fn backup_copies_existing_documents_only() {
		let tmp = tempfile::tempdir().unwrap();
		let mut backend = FileBackend::open(tmp.path()).unwrap();
		backend.write_dump("call mom tonight").unwrap();
		backend.save(Timeframe::Week, &[TaskEntry::new("Plan trip", Timeframe::Week)]).unwrap();
		let written = backend.backup().unwrap();
		assert_eq!(written.len(), 2);
		for p in written {
			assert!(p.exists());
			assert!(p.display().to_string().ends_with(".bak"));
		}
	}

	#[test]
	fn memory_backend_uses_the_same_format() {
		let mut backend = MemoryBackend::new().with_document(Timeframe::Month, "[ ] Learn rust\nnot a task\n");
		let loaded = backend.load(Timeframe::Month).unwrap();
		assert_eq!(loaded.entries.len(), 1);
		assert_eq!(loaded.warnings.len(), 1);
		backend.save(Timeframe::Month, &loaded.entries).unwrap();
		assert_eq!(backend.document(Timeframe::Month), "[ ] Learn rust\n");
	}
}
