use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::corpus::CorpusId;
use crate::error::BackendError;
use crate::weights::{NormalizedWeights, PERCENT_TOTAL};

/// Tolerance when checking that request weights add up to 100.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Largest batch a single request may ask for.
pub const MAX_NAME_COUNT: usize = 10_000;

/// Parameters of one synthesis call.
///
/// `corpus_ids` and `weights` are parallel; weights are shares of 100.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenerationRequest {
	pub corpus_ids: Vec<CorpusId>,
	pub weights: Vec<f64>,
	pub final_name_count: usize,
	pub max_name_length: usize,
	pub min_name_length: usize,
}

impl GenerationRequest {
	pub fn new(weights: &NormalizedWeights, config: &GenerationConfig) -> Self {
		let (corpus_ids, weights): (Vec<CorpusId>, Vec<f64>) = weights.active().map(|(id, percentage)| (id.clone(), percentage)).unzip();
		Self {
			corpus_ids,
			weights,
			final_name_count: config.final_name_count,
			max_name_length: config.max_name_length,
			min_name_length: config.min_name_length,
		}
	}

	/// Structural checks every backend applies before doing any work.
	///
	/// # Errors
	/// `BackendError::Rejected` with the reason.
	pub fn check(&self) -> Result<(), BackendError> {
		let reject = |reason: String| -> Result<(), BackendError> { Err(BackendError::Rejected(reason)) };

		if self.corpus_ids.is_empty() || self.corpus_ids.len() > 3 {
			return reject(format!("expected 1 to 3 corpora, got {}", self.corpus_ids.len()));
		}
		if self.corpus_ids.len() != self.weights.len() {
			return reject(format!("{} corpora but {} weights", self.corpus_ids.len(), self.weights.len()));
		}
		if self.weights.iter().any(|w| !w.is_finite() || !(0.0..=PERCENT_TOTAL).contains(w)) {
			return reject("weights must lie within [0, 100]".to_owned());
		}
		let sum: f64 = self.weights.iter().sum();
		if (sum - PERCENT_TOTAL).abs() > WEIGHT_SUM_TOLERANCE {
			return reject(format!("weights sum to {sum}, expected 100"));
		}
		if self.final_name_count == 0 || self.max_name_length == 0 {
			return reject("name count and maximum length must be positive".to_owned());
		}
		if self.final_name_count > MAX_NAME_COUNT {
			return reject(format!("at most {MAX_NAME_COUNT} names per request, got {}", self.final_name_count));
		}
		if self.min_name_length > self.max_name_length {
			return reject(format!(
				"minimum length {} exceeds maximum length {}",
				self.min_name_length, self.max_name_length
			));
		}
		Ok(())
	}
}

/// The name-synthesis collaborator.
///
/// Calls are synchronous; the session does not move on until it returns.
pub trait GenerationBackend {
	fn generate(&self, request: &GenerationRequest) -> Result<Vec<String>, BackendError>;
}
