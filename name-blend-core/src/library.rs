use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::{debug, warn};
use rand::Rng;

use crate::archive::ArchiveStore;
use crate::backend::{GenerationBackend, GenerationRequest};
use crate::config::SynthesisOptions;
use crate::corpus::{Corpus, CorpusId, CorpusSource, Origin};
use crate::error::BackendError;
use crate::io;
use crate::model::blend::Blender;
use crate::model::corpus_model::CorpusModel;

const CORPUS_EXTENSION: &str = "dat";

/// Local corpora and synthesis.
///
/// Real-world corpora are the `*.dat` files of a data directory (one name per
/// line). When an archive is attached, every archived run is offered as a
/// generated corpus too. Models are trained on first use and kept for the
/// lifetime of the library.
pub struct CorpusLibrary {
	data_dir: PathBuf,
	archive: Option<Arc<ArchiveStore>>,
	options: SynthesisOptions,
	models: Mutex<HashMap<CorpusId, Arc<CorpusModel>>>,
}

impl CorpusLibrary {
	pub fn new<P: Into<PathBuf>>(data_dir: P, options: SynthesisOptions) -> Self {
		Self { data_dir: data_dir.into(), archive: None, options, models: Mutex::new(HashMap::new()) }
	}

	pub fn with_archive(mut self, archive: Arc<ArchiveStore>) -> Self {
		self.archive = Some(archive);
		self
	}

	fn real_corpora(&self) -> Result<Vec<Corpus>, BackendError> {
		let stems = io::list_stems(&self.data_dir, CORPUS_EXTENSION).map_err(|err| {
			BackendError::Unavailable(format!("cannot list corpora in {}: {err}", self.data_dir.display()))
		})?;
		Ok(stems
			.into_iter()
			.map(|stem| Corpus::new(CorpusId::real(&stem), stem, Origin::RealWorld))
			.collect())
	}

	/// Path of a real-world corpus, refusing stems that would leave the data
	/// directory.
	fn corpus_path(&self, id: &CorpusId) -> Result<PathBuf, BackendError> {
		let stem = id.real_stem().ok_or_else(|| unknown(id))?;
		if stem.is_empty() || stem.starts_with('.') || stem.contains(['/', '\\']) {
			return Err(unknown(id));
		}
		let path = self.data_dir.join(format!("{stem}.{CORPUS_EXTENSION}"));
		if path.is_file() { Ok(path) } else { Err(unknown(id)) }
	}

	fn archive_for(&self, id: &CorpusId) -> Result<(&ArchiveStore, String), BackendError> {
		let key = id.generated_key().ok_or_else(|| unknown(id))?;
		let archive = self.archive.as_deref().ok_or_else(|| unknown(id))?;
		match archive.contains(key) {
			Ok(true) => Ok((archive, key.to_owned())),
			Ok(false) => Err(unknown(id)),
			Err(err) => Err(BackendError::Unavailable(err.to_string())),
		}
	}

	/// Returns the trained model of a corpus, training it on first use.
	fn model(&self, id: &CorpusId) -> Result<Arc<CorpusModel>, BackendError> {
		let mut models = self
			.models
			.lock()
			.map_err(|_| BackendError::Unavailable("model cache lock poisoned".to_owned()))?;
		if let Some(model) = models.get(id) {
			return Ok(Arc::clone(model));
		}

		let model = if id.real_stem().is_some() {
			let path = self.corpus_path(id)?;
			CorpusModel::load_or_train(&path)
				.map_err(|err| BackendError::Unavailable(format!("cannot train {}: {err}", path.display())))?
		} else {
			let names = self.names_for(id)?;
			CorpusModel::train_parallel(names).map_err(|err| BackendError::Unavailable(err.to_string()))?
		};
		debug!("model for {id} ready ({} names)", model.name_count());

		let model = Arc::new(model);
		models.insert(id.clone(), Arc::clone(&model));
		Ok(model)
	}

	/// Runs a request with the given random source.
	///
	/// # Errors
	/// - `Rejected` for malformed requests, unknown ids or corpora without names
	/// - `Unavailable` when a corpus cannot be read
	pub fn generate_with<R: Rng>(&self, request: &GenerationRequest, rng: &mut R) -> Result<Vec<String>, BackendError> {
		request.check()?;

		let models = request
			.corpus_ids
			.iter()
			.map(|id| self.model(id))
			.collect::<Result<Vec<_>, _>>()?;
		if models.iter().all(|model| model.is_empty()) {
			return Err(BackendError::Rejected("the selected corpora contain no names".to_owned()));
		}

		let sources = models.iter().map(|model| &**model).zip(request.weights.iter().copied()).collect();
		let names = Blender::new(sources, self.options).synthesize(
			request.final_name_count,
			request.min_name_length,
			request.max_name_length,
			rng,
		);
		debug!("synthesized {} of {} requested names", names.len(), request.final_name_count);
		Ok(names)
	}
}

fn unknown(id: &CorpusId) -> BackendError {
	BackendError::Rejected(format!("unknown corpus {id}"))
}

impl CorpusSource for CorpusLibrary {
	fn list(&self) -> Result<Vec<Corpus>, BackendError> {
		let mut corpora = self.real_corpora()?;
		if let Some(archive) = &self.archive {
			match archive.cultures() {
				Ok(cultures) => corpora.extend(cultures),
				Err(err) => warn!("archived cultures unavailable: {err}"),
			}
		}
		Ok(corpora)
	}

	fn names_for(&self, id: &CorpusId) -> Result<Vec<String>, BackendError> {
		if id.real_stem().is_some() {
			let path = self.corpus_path(id)?;
			return io::read_names(&path)
				.map_err(|err| BackendError::Unavailable(format!("cannot read {}: {err}", path.display())));
		}
		let (archive, key) = self.archive_for(id)?;
		archive.names_for(&key).map_err(|err| BackendError::Unavailable(err.to_string()))
	}
}

impl GenerationBackend for CorpusLibrary {
	fn generate(&self, request: &GenerationRequest) -> Result<Vec<String>, BackendError> {
		self.generate_with(request, &mut rand::rng())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::artifact::{ArtifactStore, RunMetadata};
	use crate::selection::{Selection, SelectionSet};
	use rand::SeedableRng;
	use rand::rngs::StdRng;
	use std::fs;
	use std::path::Path;

	fn library(dir: &Path) -> CorpusLibrary {
		fs::write(dir.join("norse.dat"), "Astrid\nBjorn\nEirik\nFreydis\nGunnar\nHalvard\n").expect("write");
		fs::write(dir.join("gaelic.dat"), "Aoife\nBrigid\nCiaran\nDeirdre\nEoghan\nFionn\n").expect("write");
		fs::write(dir.join("empty.dat"), "\n").expect("write");
		CorpusLibrary::new(dir, SynthesisOptions::default())
	}

	fn request(ids: &[&str], weights: &[f64]) -> GenerationRequest {
		GenerationRequest {
			corpus_ids: ids.iter().map(|id| CorpusId::real(id)).collect(),
			weights: weights.to_vec(),
			final_name_count: 6,
			max_name_length: 8,
			min_name_length: 3,
		}
	}

	#[test]
	fn lists_real_corpora_from_data_dir() {
		let dir = tempfile::tempdir().expect("tempdir");
		let library = library(dir.path());
		let names: Vec<String> = library.list().expect("list").into_iter().map(|c| c.display_name).collect();
		assert_eq!(names, vec!["empty", "gaelic", "norse"]);
	}

	#[test]
	fn missing_data_dir_is_unavailable() {
		let library = CorpusLibrary::new("/definitely/not/here", SynthesisOptions::default());
		assert!(matches!(library.list(), Err(BackendError::Unavailable(_))));
	}

	#[test]
	fn generates_within_bounds() {
		let dir = tempfile::tempdir().expect("tempdir");
		let library = library(dir.path());
		let names = library
			.generate_with(&request(&["norse", "gaelic"], &[25.0, 75.0]), &mut StdRng::seed_from_u64(3))
			.expect("generate");
		assert!(!names.is_empty() && names.len() <= 6);
		assert!(names.iter().all(|n| (3..=8).contains(&n.chars().count())));
	}

	#[test]
	fn rejects_unknown_and_escaping_ids() {
		let dir = tempfile::tempdir().expect("tempdir");
		let library = library(dir.path());
		for id in ["klingon", "../norse", ""] {
			let result = library.generate_with(&request(&[id, "norse"], &[50.0, 50.0]), &mut StdRng::seed_from_u64(1));
			assert!(matches!(result, Err(BackendError::Rejected(_))), "{id}");
		}
	}

	#[test]
	fn rejects_empty_corpora() {
		let dir = tempfile::tempdir().expect("tempdir");
		let library = library(dir.path());
		let result = library.generate_with(&request(&["empty"], &[100.0]), &mut StdRng::seed_from_u64(1));
		assert!(matches!(result, Err(BackendError::Rejected(_))));
	}

	#[test]
	fn archived_runs_are_listed_and_browsable() {
		let dir = tempfile::tempdir().expect("tempdir");
		let archive = Arc::new(ArchiveStore::open_in_memory().expect("archive"));
		let library = library(dir.path()).with_archive(Arc::clone(&archive));

		let corpora = library.list().expect("list");
		let selections = SelectionSet::new(vec![
			Selection::new(corpora[1].clone(), 1.0),
			Selection::new(corpora[2].clone(), 1.0),
		])
		.expect("selections");
		archive
			.persist(&RunMetadata::new("Isles", "", ""), &selections, &["Brynn".to_owned(), "Eiran".to_owned()])
			.expect("persist");

		let corpora = library.list().expect("list");
		let isles = corpora.iter().find(|c| c.origin == Origin::Generated).expect("generated corpus");
		assert_eq!(isles.display_name, "Isles");
		assert_eq!(library.names_for(&isles.id).expect("names"), vec!["Brynn", "Eiran"]);

		let blend = GenerationRequest {
			corpus_ids: vec![isles.id.clone(), CorpusId::real("norse")],
			weights: vec![50.0, 50.0],
			final_name_count: 3,
			max_name_length: 10,
			min_name_length: 1,
		};
		assert!(library.generate_with(&blend, &mut StdRng::seed_from_u64(8)).is_ok());
	}
}
