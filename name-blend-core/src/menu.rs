use log::warn;

use crate::config::GenerationConfig;
use crate::console::{Console, Prompt};
use crate::corpus::{Corpus, CorpusCatalog};
use crate::error::{InputError, SessionError};
use crate::selection::{Candidate, SelectionValidator, Verdict};
use crate::session::{SessionContext, SessionController, SessionSummary};

const MENU: &str = "\
1) Generate names
2) Browse a corpus
3) Quit";

/// How the top-level menu was left.
#[derive(Debug)]
pub enum MenuOutcome {
	Generated(SessionSummary),
	Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuChoice {
	Generate,
	Browse,
	Quit,
}

impl MenuChoice {
	fn parse(raw: &str) -> Result<Self, InputError> {
		match raw.trim() {
			"1" => Ok(MenuChoice::Generate),
			"2" => Ok(MenuChoice::Browse),
			"3" => Ok(MenuChoice::Quit),
			"" => Err(InputError::Empty),
			other => Err(InputError::UnknownChoice(other.to_owned())),
		}
	}
}

/// Entry screen: browse corpora as often as wanted, then run one generation
/// session or quit.
///
/// Browse failures are reported to the operator and the menu is shown again.
pub fn run_main_menu<C: Console + ?Sized>(
	ctx: &SessionContext<'_>,
	console: &mut C,
	config: GenerationConfig,
) -> Result<MenuOutcome, SessionError> {
	loop {
		console.say(MENU)?;
		let choice = match MenuChoice::parse(&console.ask("Choose an option: ")?) {
			Ok(choice) => choice,
			Err(err) => {
				console.say(&format!("Invalid input: {err}."))?;
				continue;
			}
		};

		match choice {
			MenuChoice::Generate => {
				let summary = SessionController::start(ctx, console, config)?.run()?;
				return Ok(MenuOutcome::Generated(summary));
			}
			MenuChoice::Browse => browse(ctx, console)?,
			MenuChoice::Quit => return Ok(MenuOutcome::Quit),
		}
	}
}

fn browse<C: Console + ?Sized>(ctx: &SessionContext<'_>, console: &mut C) -> Result<(), SessionError> {
	let catalog = match CorpusCatalog::load(ctx.corpora) {
		Ok(catalog) if catalog.is_empty() => {
			console.say("No corpora available.")?;
			return Ok(());
		}
		Ok(catalog) => catalog,
		Err(err) => {
			warn!("browse failed: {err}");
			console.say(&format!("Cannot list corpora: {err}"))?;
			return Ok(());
		}
	};
	console.say(catalog.render().trim_end())?;

	let Some(corpus) = pick_corpus(&catalog, console)? else {
		return Ok(());
	};
	match ctx.corpora.names_for(&corpus.id) {
		Ok(names) => {
			console.say(&format!("{} ({}, {} names):", corpus.display_name, corpus.origin.label(), names.len()))?;
			for name in &names {
				console.say(&format!("  {name}"))?;
			}
		}
		Err(err) => {
			warn!("cannot read {}: {err}", corpus.id);
			console.say(&format!("Cannot read {}: {err}", corpus.display_name))?;
		}
	}
	Ok(())
}

/// `None` when the operator backs out with the finish sentinel.
fn pick_corpus<C: Console + ?Sized>(catalog: &CorpusCatalog, console: &mut C) -> Result<Option<Corpus>, SessionError> {
	let validator = SelectionValidator::new(catalog);
	loop {
		let raw = console.ask("Corpus number or name (-1 to go back): ")?;
		match Candidate::parse(&raw) {
			Ok(Candidate::Finish) => return Ok(None),
			Ok(candidate) => match validator.validate(&candidate, &[]) {
				Ok(Verdict::Accepted(corpus)) => return Ok(Some(corpus)),
				Ok(Verdict::Finished) => return Ok(None),
				Err(err) => console.say(&format!("{err}."))?,
			},
			Err(err) => console.say(&format!("Invalid input: {err}."))?,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn menu_choices() {
		assert_eq!(MenuChoice::parse("1"), Ok(MenuChoice::Generate));
		assert_eq!(MenuChoice::parse(" 2\t"), Ok(MenuChoice::Browse));
		assert_eq!(MenuChoice::parse("3"), Ok(MenuChoice::Quit));
		assert_eq!(MenuChoice::parse("4"), Err(InputError::UnknownChoice("4".to_owned())));
	}
}
