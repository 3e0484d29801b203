use std::collections::HashSet;
use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

const REAL_PREFIX: &str = "real:";
const GENERATED_PREFIX: &str = "generated:";

/// Opaque corpus identifier.
///
/// Identifiers are handed out by a [`CorpusSource`] and passed back verbatim
/// to the generation backend. The session never interprets them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CorpusId(String);

impl CorpusId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// Identifier of a real-world corpus backed by `<stem>.dat`.
	pub fn real(stem: &str) -> Self {
		Self(format!("{REAL_PREFIX}{stem}"))
	}

	/// Identifier of a culture previously persisted in the archive.
	pub fn generated(key: &str) -> Self {
		Self(format!("{GENERATED_PREFIX}{key}"))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns the file stem when this id names a real-world corpus.
	pub fn real_stem(&self) -> Option<&str> {
		self.0.strip_prefix(REAL_PREFIX)
	}

	/// Returns the archive key when this id names a generated culture.
	pub fn generated_key(&self) -> Option<&str> {
		self.0.strip_prefix(GENERATED_PREFIX)
	}
}

impl fmt::Display for CorpusId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Where a corpus comes from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
	RealWorld,
	Generated,
}

impl Origin {
	/// Sort rank: real-world languages are listed before synthetic cultures.
	pub fn rank(self) -> u8 {
		match self {
			Origin::RealWorld => 1,
			Origin::Generated => 2,
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			Origin::RealWorld => "Real World",
			Origin::Generated => "Generated",
		}
	}
}

/// A named source of name-forming patterns.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Corpus {
	pub id: CorpusId,
	pub display_name: String,
	pub origin: Origin,
}

impl Corpus {
	pub fn new(id: CorpusId, display_name: impl Into<String>, origin: Origin) -> Self {
		Self { id, display_name: display_name.into(), origin }
	}
}

/// Read side of the corpus collaborator.
pub trait CorpusSource {
	/// Lists every selectable corpus, in source order.
	fn list(&self) -> Result<Vec<Corpus>, BackendError>;

	/// Returns the names a corpus is made of (browse path).
	fn names_for(&self, id: &CorpusId) -> Result<Vec<String>, BackendError>;
}

/// Ordered snapshot of the selectable corpora.
///
/// # Invariants
/// - Real-world corpora come first, then generated ones, each group sorted
///   by display name; ties keep the order the source reported them in.
/// - Identifiers are unique.
#[derive(Debug, Clone, Default)]
pub struct CorpusCatalog {
	corpora: Vec<Corpus>,
}

impl CorpusCatalog {
	/// Fetches the corpora from `source` and orders them.
	///
	/// # Errors
	/// Propagates the source failure, typically `BackendError::Unavailable`.
	pub fn load(source: &dyn CorpusSource) -> Result<Self, BackendError> {
		Ok(Self::from_corpora(source.list()?))
	}

	/// Builds a catalog from raw source output.
	///
	/// Later entries reusing an already seen id are dropped.
	pub fn from_corpora(corpora: Vec<Corpus>) -> Self {
		let mut seen = HashSet::new();
		let mut corpora: Vec<Corpus> = corpora
			.into_iter()
			.filter(|corpus| {
				let fresh = seen.insert(corpus.id.clone());
				if !fresh {
					warn!("dropping duplicate corpus id {}", corpus.id);
				}
				fresh
			})
			.collect();

		// `sort_by` is stable, which keeps source order for equal keys
		corpora.sort_by(|a, b| {
			a.origin
				.rank()
				.cmp(&b.origin.rank())
				.then_with(|| a.display_name.cmp(&b.display_name))
		});

		Self { corpora }
	}

	pub fn list(&self) -> &[Corpus] {
		&self.corpora
	}

	pub fn len(&self) -> usize {
		self.corpora.len()
	}

	pub fn is_empty(&self) -> bool {
		self.corpora.is_empty()
	}

	/// Returns the corpus shown at 1-based `position` in the menu.
	pub fn at_position(&self, position: usize) -> Option<&Corpus> {
		position.checked_sub(1).and_then(|index| self.corpora.get(index))
	}

	/// Renders the numbered catalog in three columns.
	pub fn render(&self) -> String {
		const COLUMNS: usize = 3;

		let name_width = self
			.corpora
			.iter()
			.map(|corpus| corpus.display_name.chars().count())
			.max()
			.unwrap_or(0)
			+ 5;
		let number_width = self.corpora.len().to_string().len() + 3;

		let mut out = String::new();
		for (index, corpus) in self.corpora.iter().enumerate() {
			out.push_str(&format!(
				"{:>number_width$}: {:<name_width$}",
				index + 1,
				corpus.display_name
			));
			if (index + 1) % COLUMNS == 0 {
				out.push('\n');
			}
		}
		if self.corpora.len() % COLUMNS != 0 {
			out.push('\n');
		}
		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn corpus(id: &str, name: &str, origin: Origin) -> Corpus {
		Corpus::new(CorpusId::new(id), name, origin)
	}

	#[test]
	fn real_world_sorts_before_generated() {
		let catalog = CorpusCatalog::from_corpora(vec![
			corpus("g1", "Aldmeri", Origin::Generated),
			corpus("r1", "Welsh", Origin::RealWorld),
			corpus("r2", "Gaelic", Origin::RealWorld),
		]);

		let names: Vec<&str> = catalog.list().iter().map(|c| c.display_name.as_str()).collect();
		assert_eq!(names, ["Gaelic", "Welsh", "Aldmeri"]);
	}

	#[test]
	fn equal_names_keep_source_order() {
		let catalog = CorpusCatalog::from_corpora(vec![
			corpus("g2", "Nomads", Origin::Generated),
			corpus("g1", "Nomads", Origin::Generated),
		]);

		assert_eq!(catalog.list()[0].id.as_str(), "g2");
		assert_eq!(catalog.list()[1].id.as_str(), "g1");
	}

	#[test]
	fn duplicate_ids_are_dropped() {
		let catalog = CorpusCatalog::from_corpora(vec![
			corpus("r1", "Norse", Origin::RealWorld),
			corpus("r1", "Norse again", Origin::RealWorld),
		]);
		assert_eq!(catalog.len(), 1);
		assert_eq!(catalog.list()[0].display_name, "Norse");
	}

	#[test]
	fn positions_are_one_based() {
		let catalog = CorpusCatalog::from_corpora(vec![corpus("r1", "Norse", Origin::RealWorld)]);
		assert!(catalog.at_position(0).is_none());
		assert_eq!(catalog.at_position(1).map(|c| c.id.as_str()), Some("r1"));
		assert!(catalog.at_position(2).is_none());
	}

	#[test]
	fn render_wraps_every_three_entries() {
		let catalog = CorpusCatalog::from_corpora(vec![
			corpus("a", "A", Origin::RealWorld),
			corpus("b", "B", Origin::RealWorld),
			corpus("c", "C", Origin::RealWorld),
			corpus("d", "D", Origin::RealWorld),
		]);
		let rendered = catalog.render();
		assert_eq!(rendered.lines().count(), 2);
		assert!(rendered.lines().next().is_some_and(|line| line.contains("3: C")));
	}

	#[test]
	fn ids_expose_their_kind() {
		assert_eq!(CorpusId::real("norse").real_stem(), Some("norse"));
		assert_eq!(CorpusId::generated("abc").generated_key(), Some("abc"));
		assert_eq!(CorpusId::real("norse").generated_key(), None);
	}
}
