use crate::corpus::{Corpus, CorpusCatalog};
use crate::error::{InputError, ValidationError};

/// Sentinel the operator types to stop adding corpora.
pub const FINISH_SENTINEL: &str = "-1";

/// A corpus chosen for the blend together with its raw sample parts.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
	pub corpus: Corpus,
	pub weight: f64,
}

impl Selection {
	pub fn new(corpus: Corpus, weight: f64) -> Self {
		Self { corpus, weight }
	}
}

/// Ordered blend of 2 or 3 distinct corpora with positive weights.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSet {
	selections: Vec<Selection>,
}

impl SelectionSet {
	pub const MIN: usize = 2;
	pub const MAX: usize = 3;

	/// # Errors
	/// - `InsufficientSelections` / `TooManySelections` on a bad size
	/// - `DuplicateSelection` when a corpus id repeats
	/// - `InvalidWeight` when a weight is not a positive finite number
	pub fn new(selections: Vec<Selection>) -> Result<Self, ValidationError> {
		if selections.len() < Self::MIN {
			return Err(ValidationError::InsufficientSelections { have: selections.len() });
		}
		if selections.len() > Self::MAX {
			return Err(ValidationError::TooManySelections);
		}
		for (index, selection) in selections.iter().enumerate() {
			check_weight(selection.weight)?;
			if selections[..index].iter().any(|s| s.corpus.id == selection.corpus.id) {
				return Err(ValidationError::DuplicateSelection(selection.corpus.display_name.clone()));
			}
		}
		Ok(Self { selections })
	}

	pub fn as_slice(&self) -> &[Selection] {
		&self.selections
	}

	pub fn iter(&self) -> impl Iterator<Item = &Selection> {
		self.selections.iter()
	}

	pub fn len(&self) -> usize {
		self.selections.len()
	}

	pub fn total_weight(&self) -> f64 {
		self.selections.iter().map(|s| s.weight).sum()
	}
}

/// One line of operator input at the corpus prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
	/// The finish sentinel.
	Finish,
	/// A 1-based catalog position.
	Position(usize),
	/// A display name, matched case-insensitively.
	Name(String),
}

impl Candidate {
	pub fn parse(raw: &str) -> Result<Self, InputError> {
		let raw = raw.trim();
		if raw.is_empty() {
			return Err(InputError::Empty);
		}
		if raw == FINISH_SENTINEL {
			return Ok(Candidate::Finish);
		}
		match raw.parse::<i64>() {
			Ok(n) if n >= 0 => Ok(Candidate::Position(n as usize)),
			Ok(_) => Err(InputError::UnknownChoice(raw.to_owned())),
			Err(_) => Ok(Candidate::Name(raw.to_owned())),
		}
	}
}

/// Outcome of a successful validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
	Finished,
	Accepted(Corpus),
}

/// Accept/reject rules for the corpus prompt.
pub struct SelectionValidator<'a> {
	catalog: &'a CorpusCatalog,
}

impl<'a> SelectionValidator<'a> {
	pub fn new(catalog: &'a CorpusCatalog) -> Self {
		Self { catalog }
	}

	/// Applies the selection rules in order: finish gate, catalog lookup,
	/// duplicate check, capacity.
	pub fn validate(&self, candidate: &Candidate, existing: &[Selection]) -> Result<Verdict, ValidationError> {
		let corpus = match candidate {
			Candidate::Finish if existing.len() >= SelectionSet::MIN => return Ok(Verdict::Finished),
			Candidate::Finish => {
				return Err(ValidationError::InsufficientSelections { have: existing.len() });
			}
			Candidate::Position(position) => self
				.catalog
				.at_position(*position)
				.ok_or_else(|| ValidationError::UnknownCorpus(position.to_string()))?,
			Candidate::Name(name) => self.find_unique(name)?,
		};

		if existing.iter().any(|s| s.corpus.id == corpus.id) {
			return Err(ValidationError::DuplicateSelection(corpus.display_name.clone()));
		}
		if existing.len() >= SelectionSet::MAX {
			return Err(ValidationError::TooManySelections);
		}
		Ok(Verdict::Accepted(corpus.clone()))
	}

	fn find_unique(&self, name: &str) -> Result<&'a Corpus, ValidationError> {
		let mut matches = self
			.catalog
			.list()
			.iter()
			.filter(|corpus| corpus.display_name.eq_ignore_ascii_case(name));
		match (matches.next(), matches.next()) {
			(Some(corpus), None) => Ok(corpus),
			_ => Err(ValidationError::UnknownCorpus(name.to_owned())),
		}
	}
}

/// Parses the sample parts typed for a corpus.
///
/// Any positive finite number is accepted; the scale does not matter.
pub fn validate_weight(raw: &str) -> Result<f64, ValidationError> {
	let weight: f64 = raw
		.trim()
		.parse()
		.map_err(|_| ValidationError::InvalidWeight(raw.trim().to_owned()))?;
	check_weight(weight).map_err(|_| ValidationError::InvalidWeight(raw.trim().to_owned()))?;
	Ok(weight)
}

fn check_weight(weight: f64) -> Result<(), ValidationError> {
	if weight.is_finite() && weight > 0.0 {
		Ok(())
	} else {
		Err(ValidationError::InvalidWeight(weight.to_string()))
	}
}

/// Accumulates selections until the blend is complete.
#[derive(Debug, Default)]
pub struct SelectionBuilder {
	selections: Vec<Selection>,
}

impl SelectionBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn selections(&self) -> &[Selection] {
		&self.selections
	}

	/// True once the maximum blend size is reached.
	pub fn is_complete(&self) -> bool {
		self.selections.len() >= SelectionSet::MAX
	}

	pub fn push(&mut self, selection: Selection) -> Result<(), ValidationError> {
		if self.is_complete() {
			return Err(ValidationError::TooManySelections);
		}
		check_weight(selection.weight)?;
		if self.selections.iter().any(|s| s.corpus.id == selection.corpus.id) {
			return Err(ValidationError::DuplicateSelection(selection.corpus.display_name));
		}
		self.selections.push(selection);
		Ok(())
	}

	pub fn finish(self) -> Result<SelectionSet, ValidationError> {
		SelectionSet::new(self.selections)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::corpus::{CorpusId, Origin};

	fn catalog() -> CorpusCatalog {
		CorpusCatalog::from_corpora(vec![
			Corpus::new(CorpusId::real("elvish"), "Elvish", Origin::RealWorld),
			Corpus::new(CorpusId::real("gaelic"), "Gaelic", Origin::RealWorld),
			Corpus::new(CorpusId::real("norse"), "Norse", Origin::RealWorld),
			Corpus::new(CorpusId::generated("a"), "Dune", Origin::Generated),
			Corpus::new(CorpusId::generated("b"), "Dune", Origin::Generated),
		])
	}

	fn pick(catalog: &CorpusCatalog, position: usize) -> Selection {
		Selection::new(catalog.at_position(position).cloned().expect("position in catalog"), 1.0)
	}

	#[test]
	fn finish_needs_two_selections() {
		let catalog = catalog();
		let validator = SelectionValidator::new(&catalog);

		assert_eq!(
			validator.validate(&Candidate::Finish, &[]),
			Err(ValidationError::InsufficientSelections { have: 0 })
		);
		assert_eq!(
			validator.validate(&Candidate::Finish, &[pick(&catalog, 1)]),
			Err(ValidationError::InsufficientSelections { have: 1 })
		);
		assert_eq!(
			validator.validate(&Candidate::Finish, &[pick(&catalog, 1), pick(&catalog, 2)]),
			Ok(Verdict::Finished)
		);
	}

	#[test]
	fn unknown_positions_and_names_are_rejected() {
		let catalog = catalog();
		let validator = SelectionValidator::new(&catalog);

		assert_eq!(
			validator.validate(&Candidate::Position(0), &[]),
			Err(ValidationError::UnknownCorpus("0".to_owned()))
		);
		assert_eq!(
			validator.validate(&Candidate::Position(42), &[]),
			Err(ValidationError::UnknownCorpus("42".to_owned()))
		);
		assert_eq!(
			validator.validate(&Candidate::Name("Klingon".to_owned()), &[]),
			Err(ValidationError::UnknownCorpus("Klingon".to_owned()))
		);
	}

	#[test]
	fn ambiguous_names_do_not_match() {
		let catalog = catalog();
		let validator = SelectionValidator::new(&catalog);
		assert_eq!(
			validator.validate(&Candidate::Name("dune".to_owned()), &[]),
			Err(ValidationError::UnknownCorpus("dune".to_owned()))
		);
		assert!(matches!(
			validator.validate(&Candidate::Name("gaelic".to_owned()), &[]),
			Ok(Verdict::Accepted(corpus)) if corpus.display_name == "Gaelic"
		));
	}

	#[test]
	fn duplicates_are_rejected() {
		let catalog = catalog();
		let validator = SelectionValidator::new(&catalog);
		assert_eq!(
			validator.validate(&Candidate::Position(2), &[pick(&catalog, 2)]),
			Err(ValidationError::DuplicateSelection("Gaelic".to_owned()))
		);
	}

	#[test]
	fn candidate_parsing() {
		assert_eq!(Candidate::parse(" -1 "), Ok(Candidate::Finish));
		assert_eq!(Candidate::parse("3"), Ok(Candidate::Position(3)));
		assert_eq!(Candidate::parse("Norse"), Ok(Candidate::Name("Norse".to_owned())));
		assert_eq!(Candidate::parse(""), Err(InputError::Empty));
		assert_eq!(Candidate::parse("-7"), Err(InputError::UnknownChoice("-7".to_owned())));
	}

	#[test]
	fn weights_must_be_positive_numbers() {
		assert_eq!(validate_weight("20"), Ok(20.0));
		assert_eq!(validate_weight(" 0.25 "), Ok(0.25));
		for raw in ["0", "-3", "abc", "", "inf", "NaN"] {
			assert!(
				matches!(validate_weight(raw), Err(ValidationError::InvalidWeight(_))),
				"{raw} should be rejected"
			);
		}
	}

	#[test]
	fn builder_stops_at_three() {
		let catalog = catalog();
		let mut builder = SelectionBuilder::new();
		for position in 1..=3 {
			builder.push(pick(&catalog, position)).expect("room for selection");
		}
		assert!(builder.is_complete());
		assert_eq!(builder.push(pick(&catalog, 4)), Err(ValidationError::TooManySelections));
		assert_eq!(builder.finish().map(|set| set.len()), Ok(3));
	}

	#[test]
	fn selection_set_enforces_invariants() {
		let catalog = catalog();
		assert_eq!(
			SelectionSet::new(vec![pick(&catalog, 1)]),
			Err(ValidationError::InsufficientSelections { have: 1 })
		);
		assert_eq!(
			SelectionSet::new(vec![pick(&catalog, 1), pick(&catalog, 1)]),
			Err(ValidationError::DuplicateSelection("Elvish".to_owned()))
		);
		let mut zero = pick(&catalog, 2);
		zero.weight = 0.0;
		assert!(matches!(
			SelectionSet::new(vec![pick(&catalog, 1), zero]),
			Err(ValidationError::InvalidWeight(_))
		));
		assert_eq!(
			SelectionSet::new((1..=4).map(|p| pick(&catalog, p)).collect()),
			Err(ValidationError::TooManySelections)
		);
	}
}
