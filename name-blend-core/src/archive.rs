use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use log::info;
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::artifact::{ArtifactStore, RunMetadata};
use crate::corpus::{Corpus, CorpusId, Origin};
use crate::error::PersistenceError;
use crate::selection::SelectionSet;

const SCHEMA: &str = "
	CREATE TABLE IF NOT EXISTS generated_culture (
		id TEXT PRIMARY KEY,
		culture TEXT NOT NULL,
		era TEXT NOT NULL,
		notes TEXT NOT NULL,
		created_at TEXT NOT NULL
	);
	CREATE TABLE IF NOT EXISTS generated_selection (
		culture_id TEXT NOT NULL REFERENCES generated_culture(id),
		position INTEGER NOT NULL,
		corpus_id TEXT NOT NULL,
		display_name TEXT NOT NULL,
		weight REAL NOT NULL
	);
	CREATE TABLE IF NOT EXISTS generated_name (
		culture_id TEXT NOT NULL REFERENCES generated_culture(id),
		position INTEGER NOT NULL,
		name TEXT NOT NULL
	);
	CREATE INDEX IF NOT EXISTS generated_name_culture ON generated_name(culture_id);
";

/// Display name given to archived runs without a culture.
pub const UNTITLED_CULTURE: &str = "untitled";

/// SQLite archive of persisted runs.
///
/// Every persisted run becomes a `Generated` corpus that later sessions can
/// blend like any real-world language.
pub struct ArchiveStore {
	conn: Mutex<Connection>,
}

impl ArchiveStore {
	pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
		Self::init(Connection::open(path)?)
	}

	pub fn open_in_memory() -> Result<Self, PersistenceError> {
		Self::init(Connection::open_in_memory()?)
	}

	fn init(conn: Connection) -> Result<Self, PersistenceError> {
		conn.execute_batch(SCHEMA)?;
		Ok(Self { conn: Mutex::new(conn) })
	}

	fn conn(&self) -> Result<MutexGuard<'_, Connection>, PersistenceError> {
		self.conn.lock().map_err(|_| PersistenceError::Poisoned)
	}

	/// Archived runs as corpora, oldest first.
	pub fn cultures(&self) -> Result<Vec<Corpus>, PersistenceError> {
		let conn = self.conn()?;
		let mut statement = conn.prepare("SELECT id, culture FROM generated_culture ORDER BY rowid")?;
		let rows = statement.query_map([], |row| {
			let id: String = row.get(0)?;
			let culture: String = row.get(1)?;
			Ok((id, culture))
		})?;

		let mut corpora = Vec::new();
		for row in rows {
			let (id, culture) = row?;
			let display_name = if culture.trim().is_empty() { UNTITLED_CULTURE.to_owned() } else { culture };
			corpora.push(Corpus::new(CorpusId::generated(&id), display_name, Origin::Generated));
		}
		Ok(corpora)
	}

	/// Names stored for one archived run, in generation order.
	pub fn names_for(&self, key: &str) -> Result<Vec<String>, PersistenceError> {
		let conn = self.conn()?;
		let mut statement = conn.prepare("SELECT name FROM generated_name WHERE culture_id = ?1 ORDER BY position")?;
		let names = statement
			.query_map([key], |row| row.get::<_, String>(0))?
			.collect::<Result<Vec<_>, _>>()?;
		Ok(names)
	}

	pub fn contains(&self, key: &str) -> Result<bool, PersistenceError> {
		let conn = self.conn()?;
		let count: i64 = conn.query_row("SELECT COUNT(*) FROM generated_culture WHERE id = ?1", [key], |row| row.get(0))?;
		Ok(count > 0)
	}
}

impl ArtifactStore for ArchiveStore {
	fn persist(&self, metadata: &RunMetadata, selections: &SelectionSet, names: &[String]) -> Result<(), PersistenceError> {
		let key = Uuid::new_v4().to_string();
		let mut conn = self.conn()?;
		let tx = conn.transaction()?;

		tx.execute(
			"INSERT INTO generated_culture (id, culture, era, notes, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
			params![key, metadata.culture, metadata.era, metadata.notes, Utc::now().to_rfc3339()],
		)?;
		for (position, selection) in selections.iter().enumerate() {
			tx.execute(
				"INSERT INTO generated_selection (culture_id, position, corpus_id, display_name, weight)
				 VALUES (?1, ?2, ?3, ?4, ?5)",
				params![
					key,
					position as i64,
					selection.corpus.id.as_str(),
					selection.corpus.display_name,
					selection.weight
				],
			)?;
		}
		for (position, name) in names.iter().enumerate() {
			tx.execute(
				"INSERT INTO generated_name (culture_id, position, name) VALUES (?1, ?2, ?3)",
				params![key, position as i64, name],
			)?;
		}
		tx.commit()?;

		info!("archived {} names as culture {key}", names.len());
		Ok(())
	}
}
