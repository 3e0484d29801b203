//! Interactive generation session.
//!
//! A session moves through these phases:
//!
//! ```text
//! SelectingCorpora -> CollectingMetadata -> Generating -> Reviewing
//! Reviewing -> Generating | SelectingCorpora | CollectingMetadata | ChangingConfig | Exiting
//! ChangingConfig -> Generating
//! ```
//!
//! Everything the session touches outside its own state goes through the
//! [`SessionContext`] it was started with.

use std::path::PathBuf;

use log::{debug, info, warn};

use crate::artifact::{self, ArtifactStore, ArtifactWriter, RunMetadata};
use crate::backend::{GenerationBackend, GenerationRequest};
use crate::config::{ConfigStore, GenerationConfig};
use crate::console::{Console, Prompt};
use crate::corpus::{CorpusCatalog, CorpusSource};
use crate::error::{InputError, SessionError};
use crate::selection::{
	Candidate, FINISH_SENTINEL, Selection, SelectionBuilder, SelectionSet, SelectionValidator, Verdict,
	validate_weight,
};
use crate::weights::{NormalizedWeights, normalize};

/// Collaborators of a session, passed by reference through every phase.
pub struct SessionContext<'a> {
	pub corpora: &'a dyn CorpusSource,
	pub backend: &'a dyn GenerationBackend,
	pub config_store: &'a dyn ConfigStore,
	/// Optional durable store; the session only warns when it is missing or failing.
	pub archive: Option<&'a dyn ArtifactStore>,
	pub writer: ArtifactWriter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	SelectingCorpora,
	CollectingMetadata,
	Generating,
	Reviewing,
	ChangingConfig,
	Exiting,
}

/// The five review menu entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewChoice {
	Regenerate,
	Reselect,
	EditMetadata,
	ChangeConfig,
	Exit,
}

impl ReviewChoice {
	pub const MENU: &'static str = "\
1) Regenerate with the same settings
2) Choose different corpora
3) Change culture, era and notes
4) Change generation parameters
5) Exit";

	pub fn parse(raw: &str) -> Result<Self, InputError> {
		match raw.trim() {
			"1" => Ok(ReviewChoice::Regenerate),
			"2" => Ok(ReviewChoice::Reselect),
			"3" => Ok(ReviewChoice::EditMetadata),
			"4" => Ok(ReviewChoice::ChangeConfig),
			"5" => Ok(ReviewChoice::Exit),
			"" => Err(InputError::Empty),
			other => Err(InputError::UnknownChoice(other.to_owned())),
		}
	}

	pub fn next_phase(self) -> Phase {
		match self {
			ReviewChoice::Regenerate => Phase::Generating,
			ReviewChoice::Reselect => Phase::SelectingCorpora,
			ReviewChoice::EditMetadata => Phase::CollectingMetadata,
			ReviewChoice::ChangeConfig => Phase::ChangingConfig,
			ReviewChoice::Exit => Phase::Exiting,
		}
	}
}

/// Mutable state of one session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
	pub selections: Option<SelectionSet>,
	pub metadata: RunMetadata,
	pub metadata_collected: bool,
	pub config: GenerationConfig,
	/// Set once the operator changed the config during this session.
	pub config_dirty: bool,
	/// Names of the latest successful run.
	pub names: Vec<String>,
	/// The latest successful run has no artifact yet.
	pub artifact_pending: bool,
}

/// What a finished session produced.
#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
	pub artifacts: Vec<PathBuf>,
	pub runs: usize,
	pub failed_runs: usize,
	pub archived: bool,
	pub config_saved: bool,
	pub state: SessionState,
}

/// Cuts every name to `max_name_length` characters and keeps at most
/// `final_name_count` of them, in backend order.
pub fn shape_names(raw: Vec<String>, config: &GenerationConfig) -> Vec<String> {
	raw.into_iter()
		.take(config.final_name_count)
		.map(|name| name.chars().take(config.max_name_length).collect())
		.collect()
}

/// Drives one operator through the generate / review / refine loop.
pub struct SessionController<'s, 'c, C: Console + ?Sized> {
	ctx: &'s SessionContext<'c>,
	console: &'s mut C,
	catalog: CorpusCatalog,
	state: SessionState,
	phase: Phase,
	summary: SessionSummary,
}

impl<'s, 'c, C: Console + ?Sized> SessionController<'s, 'c, C> {
	/// Loads the catalog once for the whole session.
	///
	/// # Errors
	/// `SessionError::Catalog` when the corpus source cannot be reached,
	/// `NotEnoughCorpora` when it offers fewer corpora than a blend needs.
	pub fn start(ctx: &'s SessionContext<'c>, console: &'s mut C, config: GenerationConfig) -> Result<Self, SessionError> {
		let catalog = CorpusCatalog::load(ctx.corpora).map_err(SessionError::Catalog)?;
		if catalog.len() < SelectionSet::MIN {
			return Err(SessionError::NotEnoughCorpora(catalog.len()));
		}
		info!("session started with {} corpora", catalog.len());

		Ok(Self {
			ctx,
			console,
			catalog,
			state: SessionState { config, ..SessionState::default() },
			phase: Phase::SelectingCorpora,
			summary: SessionSummary::default(),
		})
	}

	pub fn phase(&self) -> Phase {
		self.phase
	}

	pub fn state(&self) -> &SessionState {
		&self.state
	}

	pub fn catalog(&self) -> &CorpusCatalog {
		&self.catalog
	}

	/// Runs until the operator exits.
	pub fn run(mut self) -> Result<SessionSummary, SessionError> {
		while self.phase != Phase::Exiting {
			self.step()?;
		}
		self.finish()
	}

	/// Executes the current phase and moves to the next one.
	pub fn step(&mut self) -> Result<Phase, SessionError> {
		let next = match self.phase {
			Phase::SelectingCorpora => self.select_corpora()?,
			Phase::CollectingMetadata => self.collect_metadata()?,
			Phase::Generating => self.generate()?,
			Phase::Reviewing => self.review()?,
			Phase::ChangingConfig => self.change_config()?,
			Phase::Exiting => Phase::Exiting,
		};
		debug!("{:?} -> {:?}", self.phase, next);
		self.phase = next;
		Ok(next)
	}

	fn select_corpora(&mut self) -> Result<Phase, SessionError> {
		self.console.say("Available corpora:")?;
		self.console.say(self.catalog.render().trim_end())?;

		let selections = self.collect_selections()?;
		self.state.selections = Some(selections);

		if self.state.metadata_collected {
			Ok(Phase::Generating)
		} else {
			Ok(Phase::CollectingMetadata)
		}
	}

	/// Prompts until 3 corpora are chosen or the operator finishes with 2.
	fn collect_selections(&mut self) -> Result<SelectionSet, SessionError> {
		let validator = SelectionValidator::new(&self.catalog);
		let prompt = format!("Enter a corpus number or name ({FINISH_SENTINEL} to finish): ");

		loop {
			let mut builder = SelectionBuilder::new();
			while !builder.is_complete() {
				let raw = self.console.ask(&prompt)?;
				let candidate = match Candidate::parse(&raw) {
					Ok(candidate) => candidate,
					Err(err) => {
						self.console.say(&format!("Invalid input: {err}."))?;
						continue;
					}
				};

				match validator.validate(&candidate, builder.selections()) {
					Ok(Verdict::Finished) => break,
					Ok(Verdict::Accepted(corpus)) => {
						let weight = ask_weight(&mut *self.console, &corpus.display_name)?;
						if let Err(err) = builder.push(Selection::new(corpus, weight)) {
							self.console.say(&format!("{err}."))?;
						}
					}
					Err(err) => self.console.say(&format!("{err}."))?,
				}
			}

			match builder.finish() {
				Ok(selections) => return Ok(selections),
				// The loop above only exits with a valid blend; start over if not
				Err(err) => {
					warn!("discarding incomplete selection: {err}");
					self.console.say(&format!("{err}. Please choose again."))?;
				}
			}
		}
	}

	fn collect_metadata(&mut self) -> Result<Phase, SessionError> {
		let culture = self.console.ask("Culture: ")?;
		let era = self.console.ask("Era: ")?;
		let notes = self.console.ask("Notes: ")?;
		self.state.metadata = RunMetadata::new(culture.trim(), era.trim(), notes.trim());
		self.state.metadata_collected = true;
		Ok(Phase::Generating)
	}

	fn generate(&mut self) -> Result<Phase, SessionError> {
		let Some(selections) = self.state.selections.clone() else {
			return Ok(Phase::SelectingCorpora);
		};
		let weights = match normalize(&selections) {
			Ok(weights) => weights,
			Err(err) => {
				self.console.say(&format!("{err}. Please choose again."))?;
				return Ok(Phase::SelectingCorpora);
			}
		};
		self.describe_blend(&selections, &weights)?;

		let request = GenerationRequest::new(&weights, &self.state.config);
		match self.ctx.backend.generate(&request) {
			Ok(raw) => {
				let names = shape_names(raw, &self.state.config);
				info!("run {} produced {} names", self.summary.runs + 1, names.len());
				self.summary.runs += 1;
				self.state.names = names;
				self.state.artifact_pending = true;
				self.write_artifact()?;
			}
			Err(err) => {
				warn!("generation failed: {err}");
				self.summary.failed_runs += 1;
				self.console.say(&format!(
					"Generation failed: {err}. Regenerate to retry or change the parameters."
				))?;
			}
		}
		Ok(Phase::Reviewing)
	}

	fn describe_blend(&mut self, selections: &SelectionSet, weights: &NormalizedWeights) -> Result<(), SessionError> {
		let parts: Vec<String> = selections
			.iter()
			.zip(weights.percentages())
			.map(|(selection, percentage)| format!("{} {:.2}%", selection.corpus.display_name, percentage))
			.collect();
		self.console.say(&format!("Blending {}", parts.join(", ")))
	}

	/// Writes the latest run. On failure the names are echoed to the operator
	/// and the run stays pending for another attempt on exit.
	fn write_artifact(&mut self) -> Result<(), SessionError> {
		let Some(selections) = &self.state.selections else {
			return Ok(());
		};
		match self.ctx.writer.write(&self.state.names, &self.state.metadata, selections) {
			Ok(path) => {
				self.console.say(&format!("Names written to {}", path.display()))?;
				self.summary.artifacts.push(path);
				self.state.artifact_pending = false;
			}
			Err(err) => {
				warn!("artifact write failed: {err}");
				let content = artifact::render(&self.state.names, &self.state.metadata, selections);
				self.console.say(&format!(
					"Could not save the names: {err}\nThey are shown below so nothing is lost:\n{content}"
				))?;
			}
		}
		Ok(())
	}

	fn review(&mut self) -> Result<Phase, SessionError> {
		if self.state.names.is_empty() {
			self.console.say("No names generated yet.")?;
		} else {
			self.console.say("Generated names:")?;
			for (index, name) in self.state.names.iter().enumerate() {
				self.console.say(&format!("{:>4}. {name}", index + 1))?;
			}
		}

		self.console.say(ReviewChoice::MENU)?;
		loop {
			match ReviewChoice::parse(&self.console.ask("Choose an option: ")?) {
				Ok(choice) => return Ok(choice.next_phase()),
				Err(err) => self.console.say(&format!("Invalid input: {err}."))?,
			}
		}
	}

	fn change_config(&mut self) -> Result<Phase, SessionError> {
		loop {
			let current = self.state.config;
			let count = self.ask_number("Number of names", current.final_name_count)?;
			let max = self.ask_number("Maximum name length", current.max_name_length)?;
			let min = self.ask_number("Minimum name length", current.min_name_length)?;

			match GenerationConfig::new(count, max, min) {
				Ok(config) => {
					self.state.config_dirty |= config != current;
					self.state.config = config;
					return Ok(Phase::Generating);
				}
				Err(err) => self.console.say(&format!("{err}."))?,
			}
		}
	}

	/// Asks for a non-negative integer; an empty answer keeps `current`.
	fn ask_number(&mut self, label: &str, current: usize) -> Result<usize, SessionError> {
		let prompt = format!("{label} [{current}]: ");
		loop {
			let raw = self.console.ask(&prompt)?;
			let raw = raw.trim();
			if raw.is_empty() {
				return Ok(current);
			}
			match raw.parse::<usize>() {
				Ok(value) => return Ok(value),
				Err(_) => {
					let err = InputError::NotANumber(raw.to_owned());
					self.console.say(&format!("Invalid input: {err}."))?;
				}
			}
		}
	}

	/// Terminal phase: artifact, optional archive, optional config write-back.
	fn finish(mut self) -> Result<SessionSummary, SessionError> {
		if self.state.artifact_pending {
			self.console.say("Retrying the artifact of the latest run.")?;
			self.write_artifact()?;
		}

		if self.summary.runs > 0 {
			self.offer_archive()?;
		}

		if self.state.config_dirty && self.console.confirm("Save the updated generation parameters? (y/n): ")? {
			match self.ctx.config_store.save(&self.state.config) {
				Ok(()) => {
					self.summary.config_saved = true;
					self.console.say("Generation parameters saved.")?;
				}
				Err(err) => {
					warn!("config save failed: {err}");
					self.console.say(&format!("Could not save the generation parameters: {err}"))?;
				}
			}
		}

		info!(
			"session finished: {} runs, {} failed, {} artifacts",
			self.summary.runs,
			self.summary.failed_runs,
			self.summary.artifacts.len()
		);
		self.summary.state = self.state;
		Ok(self.summary)
	}

	fn offer_archive(&mut self) -> Result<(), SessionError> {
		let (Some(archive), Some(selections)) = (self.ctx.archive, &self.state.selections) else {
			self.console.say("No database configured; the names are kept in the text file only.")?;
			return Ok(());
		};
		if !self.console.confirm("Do you want to save these names to the database? (y/n): ")? {
			return Ok(());
		}
		match archive.persist(&self.state.metadata, selections, &self.state.names) {
			Ok(()) => {
				self.summary.archived = true;
				self.console.say("Names saved to the database.")?;
			}
			Err(err) => {
				warn!("archive failed: {err}");
				self.console.say(&format!("Could not save the names to the database: {err}"))?;
			}
		}
		Ok(())
	}
}

fn ask_weight<C: Console + ?Sized>(console: &mut C, display_name: &str) -> Result<f64, SessionError> {
	let prompt = format!("Sample parts for {display_name} (any positive number): ");
	loop {
		match validate_weight(&console.ask(&prompt)?) {
			Ok(weight) => return Ok(weight),
			Err(err) => console.say(&format!("{err}."))?,
		}
	}
}
