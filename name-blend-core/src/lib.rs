//! Name blending library.
//!
//! This crate drives an interactive session that blends 2 or 3 name corpora
//! into new names:
//! - Corpus catalog and selection rules
//! - Weight normalization and generation requests
//! - Artifact files and an optional SQLite archive
//! - A local character-level n-gram backend
//!
//! Outside collaborators (corpus source, generation backend, config store,
//! archive, terminal) are traits, so the session runs the same against the
//! local library, a remote server or test doubles.

/// Error types of every layer.
pub mod error;

/// Corpus identifiers, the `CorpusSource` trait and the ordered catalog.
pub mod corpus;

/// Selection parsing, validation and accumulation.
pub mod selection;

/// Rescaling of sample parts into percentages.
pub mod weights;

/// Generation parameters, settings file and `ConfigStore`.
pub mod config;

/// Generation requests and the `GenerationBackend` trait.
pub mod backend;

/// Dated run files and the `ArtifactStore` trait.
pub mod artifact;

/// SQLite archive of generated runs.
pub mod archive;

/// Character-level n-gram models.
pub mod model;

/// Local corpus directory acting as source and backend.
pub mod library;

/// Line-oriented operator terminal.
pub mod console;

/// The generate / review / refine state machine.
pub mod session;

/// Top-level menu.
pub mod menu;

/// I/O utilities (file loading, path helpers).
///
/// Not exposed
pub(crate) mod io;
