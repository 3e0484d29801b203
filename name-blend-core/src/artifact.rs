use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{ArtifactWriteError, PersistenceError};
use crate::selection::SelectionSet;

/// Highest collision suffix tried before giving up.
const MAX_SUFFIX: usize = 100_000;

/// Free-text tags attached to every artifact of a session.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunMetadata {
	pub culture: String,
	pub era: String,
	pub notes: String,
}

impl RunMetadata {
	pub fn new(culture: impl Into<String>, era: impl Into<String>, notes: impl Into<String>) -> Self {
		Self { culture: culture.into(), era: era.into(), notes: notes.into() }
	}
}

/// Optional durable save path, distinct from the text artifact.
pub trait ArtifactStore {
	fn persist(&self, metadata: &RunMetadata, selections: &SelectionSet, names: &[String]) -> Result<(), PersistenceError>;
}

/// Writes runs as dated text files, never overwriting an existing one.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
	dir: PathBuf,
}

impl ArtifactWriter {
	pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
		Self { dir: dir.into() }
	}

	/// Writes a run stamped with today's local date.
	pub fn write(
		&self,
		names: &[String],
		metadata: &RunMetadata,
		selections: &SelectionSet,
	) -> Result<PathBuf, ArtifactWriteError> {
		self.write_dated(Local::now().date_naive(), names, metadata, selections)
	}

	/// Writes a run as `<date>_<culture>.txt`, or `<date>_<culture>_<n>.txt`
	/// with the first free `n` when that name is taken.
	///
	/// The content is staged in a temporary file inside the target directory
	/// and linked into place only once complete. The staging file is removed
	/// on every failure path, so a failed write leaves nothing behind.
	pub fn write_dated(
		&self,
		date: NaiveDate,
		names: &[String],
		metadata: &RunMetadata,
		selections: &SelectionSet,
	) -> Result<PathBuf, ArtifactWriteError> {
		let base = base_name(date, &metadata.culture);
		let target = self.dir.join(file_name(&base, 0));
		let io_error = |path: &Path| {
			let path = path.to_owned();
			move |source: io::Error| ArtifactWriteError::Io { path, source }
		};

		fs::create_dir_all(&self.dir).map_err(io_error(&target))?;
		let mut staged = NamedTempFile::new_in(&self.dir).map_err(io_error(&target))?;
		staged.write_all(render(names, metadata, selections).as_bytes()).map_err(io_error(&target))?;
		staged.as_file().sync_all().map_err(io_error(&target))?;

		for suffix in 0..MAX_SUFFIX {
			let candidate = self.dir.join(file_name(&base, suffix));
			if candidate.exists() {
				continue;
			}
			match staged.persist_noclobber(&candidate) {
				Ok(_) => {
					info!("wrote {} names to {}", names.len(), candidate.display());
					return Ok(candidate);
				}
				Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
					debug!("{} appeared concurrently, trying the next suffix", candidate.display());
					staged = err.file;
				}
				Err(err) => return Err(io_error(&candidate)(err.error)),
			}
		}
		Err(ArtifactWriteError::Exhausted { base })
	}
}

/// `<YYYY-MM-DD>_<culture>` with whitespace turned into underscores.
pub fn base_name(date: NaiveDate, culture: &str) -> String {
	format!("{}_{}", date.format("%Y-%m-%d"), sanitize(culture))
}

fn sanitize(culture: &str) -> String {
	let cleaned: String = culture
		.trim()
		.chars()
		.map(|c| if c.is_whitespace() || c == '/' || c == '\\' { '_' } else { c })
		.collect();
	if cleaned.is_empty() { "untitled".to_owned() } else { cleaned }
}

fn file_name(base: &str, suffix: usize) -> String {
	if suffix == 0 {
		format!("{base}.txt")
	} else {
		format!("{base}_{suffix}.txt")
	}
}

/// Artifact body: metadata, selections with their raw weights, then names.
pub fn render(names: &[String], metadata: &RunMetadata, selections: &SelectionSet) -> String {
	let mut out = String::new();
	// Writing into a String cannot fail
	let _ = writeln!(out, "culture: {}", metadata.culture);
	let _ = writeln!(out, "era: {}", metadata.era);
	let _ = writeln!(out, "notes: {}", metadata.notes);
	out.push('\n');
	for selection in selections.iter() {
		let _ = writeln!(out, "{}: {}", selection.corpus.display_name, selection.weight);
	}
	out.push('\n');
	for name in names {
		out.push_str(name);
		out.push('\n');
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::corpus::{Corpus, CorpusId, Origin};
	use crate::selection::Selection;
	use pretty_assertions::assert_eq;

	fn selections() -> SelectionSet {
		SelectionSet::new(vec![
			Selection::new(Corpus::new(CorpusId::real("gaelic"), "Gaelic", Origin::RealWorld), 20.0),
			Selection::new(Corpus::new(CorpusId::real("elvish"), "Elvish", Origin::RealWorld), 0.6),
		])
		.expect("valid selections")
	}

	fn date() -> NaiveDate {
		NaiveDate::from_ymd_opt(2024, 3, 9).expect("valid date")
	}

	#[test]
	fn content_layout() {
		let names = vec!["Aerin".to_owned(), "Brona".to_owned()];
		let metadata = RunMetadata::new("Sea folk", "Bronze age", "");
		assert_eq!(
			render(&names, &metadata, &selections()),
			"culture: Sea folk\nera: Bronze age\nnotes: \n\nGaelic: 20\nElvish: 0.6\n\nAerin\nBrona\n"
		);
	}

	#[test]
	fn file_names_are_sanitized() {
		assert_eq!(base_name(date(), "High  Elves"), "2024-03-09_High__Elves");
		assert_eq!(base_name(date(), "a/b"), "2024-03-09_a_b");
		assert_eq!(base_name(date(), "  "), "2024-03-09_untitled");
	}

	#[test]
	fn collisions_get_increasing_suffixes() {
		let dir = tempfile::tempdir().expect("tempdir");
		let writer = ArtifactWriter::new(dir.path());
		let metadata = RunMetadata::new("Sea folk", "", "");
		let names = vec!["Aerin".to_owned()];

		let mut written = Vec::new();
		for _ in 0..4 {
			let path = writer.write_dated(date(), &names, &metadata, &selections()).expect("write");
			written.push(path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_owned());
		}

		assert_eq!(
			written,
			vec![
				"2024-03-09_Sea_folk.txt",
				"2024-03-09_Sea_folk_1.txt",
				"2024-03-09_Sea_folk_2.txt",
				"2024-03-09_Sea_folk_3.txt",
			]
		);
	}

	#[test]
	fn existing_files_are_never_overwritten() {
		let dir = tempfile::tempdir().expect("tempdir");
		let taken = dir.path().join("2024-03-09_Sea_folk.txt");
		fs::write(&taken, "keep me").expect("seed file");

		let writer = ArtifactWriter::new(dir.path());
		let path = writer
			.write_dated(date(), &["Aerin".to_owned()], &RunMetadata::new("Sea folk", "", ""), &selections())
			.expect("write");

		assert_eq!(path, dir.path().join("2024-03-09_Sea_folk_1.txt"));
		assert_eq!(fs::read_to_string(&taken).expect("read"), "keep me");
	}

	#[test]
	fn failed_writes_name_the_intended_file() {
		let dir = tempfile::tempdir().expect("tempdir");
		let blocker = dir.path().join("blocker");
		fs::write(&blocker, "").expect("blocker");

		let writer = ArtifactWriter::new(&blocker);
		let err = writer
			.write_dated(date(), &["Aerin".to_owned()], &RunMetadata::new("Sea folk", "", ""), &selections())
			.expect_err("a file is not a directory");

		match err {
			ArtifactWriteError::Io { path, .. } => assert_eq!(path, blocker.join("2024-03-09_Sea_folk.txt")),
			other => panic!("unexpected error: {other}"),
		}
	}

	#[test]
	fn no_staging_files_are_left_behind() {
		let dir = tempfile::tempdir().expect("tempdir");
		let writer = ArtifactWriter::new(dir.path());
		writer
			.write_dated(date(), &[], &RunMetadata::default(), &selections())
			.expect("write");
		let entries = fs::read_dir(dir.path()).expect("list").count();
		assert_eq!(entries, 1);
	}
}
