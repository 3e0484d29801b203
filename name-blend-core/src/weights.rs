use crate::corpus::CorpusId;
use crate::error::ValidationError;
use crate::selection::SelectionSet;

/// Total the backend expects the percentages to add up to.
pub const PERCENT_TOTAL: f64 = 100.0;

/// One backend weight slot. Unused slots carry no corpus and 0 %.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeightSlot {
	pub corpus: Option<CorpusId>,
	pub percentage: f64,
}

/// Selection weights rescaled to shares of 100.
///
/// Derived at call time from a [`SelectionSet`]; never stored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedWeights {
	slots: [WeightSlot; SelectionSet::MAX],
}

impl NormalizedWeights {
	pub fn slots(&self) -> &[WeightSlot] {
		&self.slots
	}

	/// Iterates over the slots that carry a corpus.
	pub fn active(&self) -> impl Iterator<Item = (&CorpusId, f64)> {
		self.slots
			.iter()
			.filter_map(|slot| slot.corpus.as_ref().map(|id| (id, slot.percentage)))
	}

	pub fn percentages(&self) -> Vec<f64> {
		self.active().map(|(_, percentage)| percentage).collect()
	}
}

/// Rescales raw sample parts so they sum to [`PERCENT_TOTAL`].
///
/// `(20, 20, 60)`, `(0.2, 0.2, 0.6)` and `(1, 1, 3)` all give
/// `(20 %, 20 %, 60 %)`. No rounding is applied.
///
/// # Errors
/// `DegenerateWeights` if the weights do not sum to a positive finite total.
pub fn normalize(selections: &SelectionSet) -> Result<NormalizedWeights, ValidationError> {
	let total = selections.total_weight();
	if !total.is_finite() || total <= 0.0 {
		return Err(ValidationError::DegenerateWeights(total));
	}

	let mut weights = NormalizedWeights::default();
	for (slot, selection) in weights.slots.iter_mut().zip(selections.iter()) {
		slot.corpus = Some(selection.corpus.id.clone());
		slot.percentage = selection.weight / total * PERCENT_TOTAL;
	}
	Ok(weights)
}
