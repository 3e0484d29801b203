use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::State;
use crate::error::ModelError;

/// Transition table of a single order `n`.
///
/// Keys are the `n - 1` characters preceding a transition. Input is expected
/// lowercased and framed with the start/end markers by the caller.
///
/// # Invariants
/// - `n >= 2`
/// - Every key holds exactly `n - 1` characters
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NGramModel {
	n: usize,
	states: HashMap<String, State>,
}

impl NGramModel {
	/// Orders below 2 are raised to bigrams.
	pub(crate) fn new(n: usize) -> Self {
		Self { n: n.max(2), states: HashMap::new() }
	}

	/// Counts every n-gram of `chars`. Sequences shorter than `n` are ignored.
	pub fn observe(&mut self, chars: &[char]) {
		for window in chars.windows(self.n) {
			let (prefix, next) = window.split_at(self.n - 1);
			let key: String = prefix.iter().collect();
			self.states.entry(key).or_default().record(next[0]);
		}
	}

	/// Draws a continuation for the last `n - 1` characters of `context`.
	///
	/// Returns `None` when the context is too short or the prefix was never seen.
	pub fn sample<R: Rng>(&self, context: &[char], rng: &mut R) -> Option<char> {
		let width = self.n - 1;
		if context.len() < width {
			return None;
		}
		let key: String = context[context.len() - width..].iter().collect();
		self.states.get(&key)?.sample(rng)
	}

	/// Adds the counts of another table of the same order.
	///
	/// # Errors
	/// `ModelError::Mismatch` if the orders differ.
	pub fn merge(&mut self, other: &Self) -> Result<(), ModelError> {
		if self.n != other.n {
			return Err(ModelError::Mismatch(format!("order {} vs {}", self.n, other.n)));
		}
		for (key, state) in &other.states {
			self.states.entry(key.clone()).or_default().merge(state);
		}
		Ok(())
	}
}
