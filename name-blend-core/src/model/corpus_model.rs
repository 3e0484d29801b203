use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::iter::once;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ngram_model::NGramModel;
use crate::error::ModelError;
use crate::io;

/// Marks the beginning of a name inside the n-gram tables.
pub const START_MARK: char = '\u{2}';
/// Marks the end of a name inside the n-gram tables.
pub const END_MARK: char = '\u{3}';

/// Partial models built per CPU when training in parallel.
const CHUNKS_PER_CPU: usize = 8;

/// Every n-gram order learned from one corpus.
///
/// Each training name is lowercased, framed as `START name END` and counted
/// into the tables of order 2 up to its framed length. The lowercased names
/// themselves are kept so that generation can skip names the corpus already
/// contains.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CorpusModel {
	tables: BTreeMap<usize, NGramModel>,
	names: HashSet<String>,
}

impl CorpusModel {
	/// Trains sequentially on the given names.
	pub fn train<I, S>(names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut model = Self::default();
		for name in names {
			model.add_name(name.as_ref());
		}
		model
	}

	/// Splits `names` into chunks, trains partial models on worker threads and
	/// merges them.
	///
	/// # Errors
	/// `ModelError::Worker` if a worker dies before reporting its model.
	pub fn train_parallel(names: Vec<String>) -> Result<Self, ModelError> {
		if names.is_empty() {
			return Ok(Self::default());
		}

		let chunks = num_cpus::get() * CHUNKS_PER_CPU;
		let chunk_size = names.len().div_ceil(chunks);

		let (tx, rx) = mpsc::channel();
		let mut workers = 0;
		for chunk in names.chunks(chunk_size) {
			let tx = tx.clone();
			let chunk = chunk.to_vec();
			thread::spawn(move || {
				// The receiver outlives every worker; a failed send only means
				// the merge loop already bailed out.
				let _ = tx.send(CorpusModel::train(chunk));
			});
			workers += 1;
		}
		drop(tx);

		let mut model = Self::default();
		let mut received = 0;
		for partial in rx {
			model.merge(&partial)?;
			received += 1;
		}
		if received != workers {
			return Err(ModelError::Worker);
		}
		Ok(model)
	}

	/// Loads the model of a `.dat` corpus, using the sibling `.bin` cache when
	/// it is at least as recent as the corpus.
	///
	/// A missing, stale or undecodable cache is rebuilt from the corpus and
	/// written back. Failing to write the cache is not an error.
	pub fn load_or_train<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
		let path = path.as_ref();
		let cache = io::sibling_with_extension(path, "bin")?;

		if io::is_fresh(&cache, path) {
			let cached = fs::read(&cache)
				.map_err(ModelError::from)
				.and_then(|bytes| postcard::from_bytes::<Self>(&bytes).map_err(ModelError::from));
			match cached {
				Ok(model) => {
					debug!("loaded model cache {}", cache.display());
					return Ok(model);
				}
				Err(err) => warn!("ignoring unreadable model cache {}: {err}", cache.display()),
			}
		}

		let model = Self::train_parallel(io::read_names(path)?)?;
		match postcard::to_stdvec(&model) {
			Ok(bytes) => {
				if let Err(err) = fs::write(&cache, bytes) {
					warn!("cannot write model cache {}: {err}", cache.display());
				}
			}
			Err(err) => warn!("cannot encode model cache {}: {err}", cache.display()),
		}
		debug!("trained {} on {} names", path.display(), model.name_count());
		Ok(model)
	}

	/// Counts one name into every order it spans. Blank and repeated names are
	/// ignored.
	pub fn add_name(&mut self, name: &str) {
		let lowered = lowercase(name.trim());
		if lowered.is_empty() || !self.names.insert(lowered.clone()) {
			return;
		}

		let framed: Vec<char> = once(START_MARK).chain(lowered.chars()).chain(once(END_MARK)).collect();
		for n in 2..=framed.len() {
			self.tables
				.entry(n)
				.or_insert_with(|| NGramModel::new(n))
				.observe(&framed);
		}
	}

	/// Adds another model's counts and names to this one.
	pub fn merge(&mut self, other: &Self) -> Result<(), ModelError> {
		for (n, table) in &other.tables {
			match self.tables.get_mut(n) {
				Some(existing) => existing.merge(table)?,
				None => {
					self.tables.insert(*n, table.clone());
				}
			}
		}
		self.names.extend(other.names.iter().cloned());
		Ok(())
	}

	/// Case-insensitive membership test against the training names.
	pub fn contains(&self, name: &str) -> bool {
		self.names.contains(&lowercase(name))
	}

	pub fn is_empty(&self) -> bool {
		self.names.is_empty()
	}

	pub fn name_count(&self) -> usize {
		self.names.len()
	}

	/// Highest order learned; 0 for an empty model.
	pub fn max_order(&self) -> usize {
		self.tables.keys().next_back().copied().unwrap_or(0)
	}

	/// Draws the character following `prefix` (framed, starting with
	/// [`START_MARK`]).
	///
	/// The longest order allowed by the prefix, `order_cap` (0 = no cap) and
	/// the model is tried first, then shorter ones down to bigrams. With
	/// probability `randomness` the search starts from a random shorter order
	/// instead.
	pub fn next_char<R: Rng>(&self, prefix: &[char], order_cap: usize, randomness: f32, rng: &mut R) -> Option<char> {
		let mut top = (prefix.len() + 1).min(self.max_order());
		if order_cap >= 2 {
			top = top.min(order_cap);
		}
		if top < 2 {
			return None;
		}
		if randomness > 0.0 && rng.random_range(0.0..1.0) < f64::from(randomness) {
			top = rng.random_range(2..=top);
		}
		(2..=top).rev().find_map(|n| self.tables.get(&n)?.sample(prefix, &mut *rng))
	}
}

fn lowercase(s: &str) -> String {
	s.chars().flat_map(char::to_lowercase).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn framed(s: &str) -> Vec<char> {
		once(START_MARK).chain(s.chars()).collect()
	}

	#[test]
	fn training_is_case_insensitive_and_deduplicated() {
		let model = CorpusModel::train(["Astrid", "ASTRID", "  ", "Eir"]);
		assert_eq!(model.name_count(), 2);
		assert!(model.contains("astrid"));
		assert!(model.contains("EIR"));
		assert!(!model.contains("bjorn"));
	}

	#[test]
	fn longest_context_wins() {
		let model = CorpusModel::train(["abc", "abd", "xbe"]);
		let mut rng = StdRng::seed_from_u64(11);
		for _ in 0..20 {
			// After "<x" only "b" was seen, and after "<xb" only "e"
			assert_eq!(model.next_char(&framed("x"), 0, 0.0, &mut rng), Some('b'));
			assert_eq!(model.next_char(&framed("xb"), 0, 0.0, &mut rng), Some('e'));
		}
	}

	#[test]
	fn order_cap_limits_context() {
		let model = CorpusModel::train(["abc", "xbd"]);
		let mut rng = StdRng::seed_from_u64(5);
		let mut seen = HashSet::new();
		for _ in 0..200 {
			if let Some(c) = model.next_char(&framed("xb"), 2, 0.0, &mut rng) {
				seen.insert(c);
			}
		}
		// With bigrams only, "b" may be followed by either continuation
		assert!(seen.contains(&'c') && seen.contains(&'d'));
	}

	#[test]
	fn parallel_training_matches_sequential() {
		let names: Vec<String> = (0..500).map(|i| format!("name{i}")).collect();
		let sequential = CorpusModel::train(&names);
		let parallel = CorpusModel::train_parallel(names).expect("training");
		assert_eq!(parallel, sequential);
	}

	#[test]
	fn cache_is_written_and_reused() {
		let dir = tempfile::tempdir().expect("tempdir");
		let corpus = dir.path().join("norse.dat");
		fs::write(&corpus, "Astrid\nBjorn\n").expect("write");

		let trained = CorpusModel::load_or_train(&corpus).expect("train");
		assert!(dir.path().join("norse.bin").exists());
		let cached = CorpusModel::load_or_train(&corpus).expect("cache");
		assert_eq!(cached, trained);
	}

	#[test]
	fn corrupt_cache_is_rebuilt() {
		let dir = tempfile::tempdir().expect("tempdir");
		let corpus = dir.path().join("norse.dat");
		fs::write(&corpus, "Astrid\n").expect("write");
		fs::write(dir.path().join("norse.bin"), [0xff, 0xff, 0xff]).expect("write");

		let model = CorpusModel::load_or_train(&corpus).expect("rebuild");
		assert!(model.contains("astrid"));
	}
}
