use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Malformed operator input. Always recoverable by prompting again.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
	#[error("no input given")]
	Empty,

	#[error("'{0}' is not a number")]
	NotANumber(String),

	#[error("'{0}' is not one of the offered choices")]
	UnknownChoice(String),
}

/// Violation of a selection, weight or configuration rule.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
	#[error("at least 2 corpora must be selected before finishing (have {have})")]
	InsufficientSelections { have: usize },

	#[error("no corpus matches '{0}'")]
	UnknownCorpus(String),

	#[error("'{0}' is already selected")]
	DuplicateSelection(String),

	#[error("at most 3 corpora can be blended")]
	TooManySelections,

	#[error("'{0}' is not a positive number of parts")]
	InvalidWeight(String),

	#[error("weights sum to {0}, cannot normalize")]
	DegenerateWeights(f64),

	#[error("invalid generation parameters: {0}")]
	InvalidConfig(String),
}

/// Failure reported by a corpus source or a generation backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
	#[error("backend unavailable: {0}")]
	Unavailable(String),

	#[error("backend rejected the request: {0}")]
	Rejected(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("cannot access config file {path}: {source}")]
	Io { path: PathBuf, source: io::Error },

	#[error("malformed config file {path}: {source}")]
	Parse { path: PathBuf, source: serde_json::Error },

	#[error(transparent)]
	Invalid(#[from] ValidationError),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
	#[error("archive database error: {0}")]
	Database(#[from] rusqlite::Error),

	#[error("archive connection lock poisoned")]
	Poisoned,
}

#[derive(Error, Debug)]
pub enum ArtifactWriteError {
	#[error("cannot write {}: {source}", path.display())]
	Io { path: PathBuf, source: io::Error },

	#[error("no free artifact name left for {base}.txt")]
	Exhausted { base: String },
}

/// Failures of the local n-gram models.
#[derive(Error, Debug)]
pub enum ModelError {
	#[error(transparent)]
	Io(#[from] io::Error),

	#[error("model cache codec error: {0}")]
	Codec(#[from] postcard::Error),

	#[error("cannot merge models: {0}")]
	Mismatch(String),

	#[error("model training worker failed")]
	Worker,
}

/// Errors that end an interactive session.
#[derive(Error, Debug)]
pub enum SessionError {
	#[error("corpus catalog unavailable: {0}")]
	Catalog(BackendError),

	#[error("the catalog offers {0} corpora, a blend needs at least 2")]
	NotEnoughCorpora(usize),

	#[error("terminal input closed")]
	InputClosed,

	#[error("terminal error: {0}")]
	Terminal(#[from] io::Error),
}
