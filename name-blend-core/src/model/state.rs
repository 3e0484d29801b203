use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Outgoing transitions of one n-gram prefix.
///
/// A node of the Markov chain: each observed next character is an edge
/// weighted by how many times it followed the prefix in the corpus.
///
/// ## Invariants
/// - Every stored count is strictly positive
///
/// Transitions are kept ordered so that a seeded generator replays the same
/// choices.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct State {
	/// Example: { 'e' => 42, 'a' => 3 }
	transitions: BTreeMap<char, usize>,
}

impl State {
	/// Records one more occurrence of `next_char` after this prefix.
	pub fn record(&mut self, next_char: char) {
		*self.transitions.entry(next_char).or_insert(0) += 1;
	}

	/// Number of observations behind this prefix.
	pub fn total(&self) -> usize {
		self.transitions.values().sum()
	}

	/// Draws the next character with probability proportional to its count.
	///
	/// Returns `None` if nothing was ever observed after this prefix.
	pub fn sample<R: Rng>(&self, rng: &mut R) -> Option<char> {
		let total = self.total();
		if total == 0 {
			return None;
		}

		let mut ticket = rng.random_range(0..total);
		for (next_char, count) in &self.transitions {
			if ticket < *count {
				return Some(*next_char);
			}
			ticket -= count;
		}
		None
	}

	/// Adds the counts of `other` to this state.
	///
	/// Used to combine partial models trained on separate chunks.
	pub fn merge(&mut self, other: &Self) {
		for (next_char, count) in &other.transitions {
			*self.transitions.entry(*next_char).or_insert(0) += *count;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	#[test]
	fn empty_state_predicts_nothing() {
		assert_eq!(State::default().sample(&mut StdRng::seed_from_u64(1)), None);
	}

	#[test]
	fn single_transition_is_certain() {
		let mut state = State::default();
		state.record('a');
		state.record('a');
		let mut rng = StdRng::seed_from_u64(7);
		for _ in 0..20 {
			assert_eq!(state.sample(&mut rng), Some('a'));
		}
	}

	#[test]
	fn merge_sums_counts() {
		let mut left = State::default();
		left.record('a');
		let mut right = State::default();
		right.record('a');
		right.record('b');
		left.merge(&right);
		assert_eq!(left.total(), 3);
	}
}
