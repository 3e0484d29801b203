use std::collections::HashSet;

use rand::Rng;

use super::corpus_model::{CorpusModel, END_MARK, START_MARK};
use crate::config::SynthesisOptions;

/// Generates names by interleaving several corpus models.
///
/// # Responsibilities
/// - Rank the models per character with a weighted random key, so a model
///   with twice the weight leads about twice as often
/// - Continue the name with the first model able to extend it
/// - Enforce length bounds, novelty against the training names and
///   uniqueness within a batch
pub struct Blender<'a> {
	sources: Vec<(&'a CorpusModel, f64)>,
	options: SynthesisOptions,
}

impl<'a> Blender<'a> {
	/// `sources` pairs each model with its weight (any positive scale).
	pub fn new(sources: Vec<(&'a CorpusModel, f64)>, options: SynthesisOptions) -> Self {
		Self { sources, options }
	}

	/// Orders the usable models by `u^(1/w)` with `u` uniform in `[0, 1)`.
	///
	/// Heavier models tend to come first; zero-weight and empty models are
	/// left out.
	fn ranked<R: Rng>(&self, rng: &mut R) -> Vec<&'a CorpusModel> {
		let mut scored: Vec<(&'a CorpusModel, f64)> = self
			.sources
			.iter()
			.filter(|(model, weight)| *weight > 0.0 && !model.is_empty())
			.map(|(model, weight)| {
				let u: f64 = rng.random();
				(*model, u.powf(1.0 / weight))
			})
			.collect();

		scored.sort_by(|a, b| b.1.total_cmp(&a.1));
		scored.into_iter().map(|(model, _)| model).collect()
	}

	/// Builds one lowercase candidate.
	///
	/// Returns `None` when nothing can be produced or the candidate grows past
	/// `max_len` characters.
	pub fn draft<R: Rng>(&self, max_len: usize, rng: &mut R) -> Option<String> {
		let mut framed = vec![START_MARK];
		loop {
			let ranked = self.ranked(rng);
			let next = ranked.into_iter().find_map(|model| {
				model.next_char(&framed, self.options.max_order, self.options.randomness, &mut *rng)
			});
			match next {
				Some(c) if c != END_MARK => {
					framed.push(c);
					if framed.len() - 1 > max_len {
						return None;
					}
				}
				_ => break,
			}
		}
		let draft: String = framed[1..].iter().collect();
		(!draft.is_empty()).then_some(draft)
	}

	/// Produces up to `count` capitalised names of `min_len..=max_len`
	/// characters.
	///
	/// The batch ends once `attempts_per_name` draws in a row add nothing
	/// new. Names already present in a
	/// training corpus are set aside and used only when the batch ends before
	/// `count` novel names were found.
	pub fn synthesize<R: Rng>(&self, count: usize, min_len: usize, max_len: usize, rng: &mut R) -> Vec<String> {
		let patience = self.options.attempts_per_name.max(1);
		let mut seen = HashSet::new();
		let mut names = Vec::new();
		let mut known = Vec::new();
		let mut misses = 0;

		while names.len() < count && misses < patience {
			let fresh = self
				.draft(max_len, rng)
				.filter(|draft| (min_len..=max_len).contains(&draft.chars().count()))
				.filter(|draft| seen.insert(draft.clone()));
			let Some(draft) = fresh else {
				misses += 1;
				continue;
			};
			misses = 0;
			if self.sources.iter().any(|(model, _)| model.contains(&draft)) {
				known.push(draft);
			} else {
				names.push(capitalize(&draft));
			}
		}

		let missing = count.saturating_sub(names.len());
		names.extend(known.iter().take(missing).map(|name| capitalize(name)));
		names
	}
}

/// Uppercases the first character.
pub fn capitalize(s: &str) -> String {
	let mut chars = s.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn options() -> SynthesisOptions {
		SynthesisOptions { max_order: 0, randomness: 0.2, attempts_per_name: 50 }
	}

	fn norse() -> CorpusModel {
		CorpusModel::train(["Astrid", "Bjorn", "Eirik", "Freydis", "Gunnar", "Halvard", "Ingrid", "Sigrun"])
	}

	fn gaelic() -> CorpusModel {
		CorpusModel::train(["Aoife", "Brigid", "Ciaran", "Deirdre", "Eoghan", "Fionn", "Grainne", "Niamh"])
	}

	#[test]
	fn names_respect_bounds() {
		let (norse, gaelic) = (norse(), gaelic());
		let blender = Blender::new(vec![(&norse, 40.0), (&gaelic, 60.0)], options());
		let names = blender.synthesize(10, 3, 7, &mut StdRng::seed_from_u64(42));

		assert!(names.len() <= 10);
		assert!(!names.is_empty());
		for name in &names {
			let length = name.chars().count();
			assert!((3..=7).contains(&length), "{name} has length {length}");
			assert!(name.chars().next().is_some_and(char::is_uppercase), "{name} is not capitalised");
		}
		let distinct: HashSet<String> = names.iter().map(|n| n.to_lowercase()).collect();
		assert_eq!(distinct.len(), names.len());
	}

	#[test]
	fn same_seed_same_names() {
		let (norse, gaelic) = (norse(), gaelic());
		let blender = Blender::new(vec![(&norse, 1.0), (&gaelic, 3.0)], options());
		let first = blender.synthesize(5, 2, 10, &mut StdRng::seed_from_u64(9));
		let second = blender.synthesize(5, 2, 10, &mut StdRng::seed_from_u64(9));
		assert_eq!(first, second);
	}

	#[test]
	fn zero_weight_models_are_never_consulted() {
		let vowels = CorpusModel::train(["aaa", "aea", "eae"]);
		let consonants = CorpusModel::train(["xyz", "zyx"]);
		let blender = Blender::new(vec![(&vowels, 100.0), (&consonants, 0.0)], options());
		for name in blender.synthesize(5, 1, 6, &mut StdRng::seed_from_u64(1)) {
			assert!(name.to_lowercase().chars().all(|c| c == 'a' || c == 'e'), "{name}");
		}
	}

	#[test]
	fn empty_models_produce_nothing() {
		let empty = CorpusModel::default();
		let blender = Blender::new(vec![(&empty, 50.0)], options());
		assert!(blender.synthesize(3, 0, 8, &mut StdRng::seed_from_u64(1)).is_empty());
	}

	#[test]
	fn huge_counts_do_not_preallocate() {
		let tiny = CorpusModel::train(["ab"]);
		let options = SynthesisOptions { attempts_per_name: 1, ..options() };
		let blender = Blender::new(vec![(&tiny, 1.0)], options);
		// Only one distinct draft exists, so the batch ends after one idle draw
		let names = blender.synthesize(1usize << 60, 1, 8, &mut StdRng::seed_from_u64(1));
		assert!(names.len() <= 1);
	}

	#[test]
	fn capitalize_handles_unicode() {
		assert_eq!(capitalize("éowyn"), "Éowyn");
		assert_eq!(capitalize(""), "");
	}
}
