use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};

use name_blend_core::archive::ArchiveStore;
use name_blend_core::artifact::{ArtifactStore, ArtifactWriter};
use name_blend_core::backend::GenerationBackend;
use name_blend_core::config::{JsonConfigStore, Settings};
use name_blend_core::console::Terminal;
use name_blend_core::corpus::CorpusSource;
use name_blend_core::library::CorpusLibrary;
use name_blend_core::menu::{MenuOutcome, run_main_menu};
use name_blend_core::session::SessionContext;

mod remote;

use remote::RemoteBackend;

/// Blend 2 or 3 name corpora into new names, interactively.
#[derive(Parser, Debug)]
#[command(name = "name-blend", version, about)]
struct Cli {
	/// Settings file (JSON); the generation section is saved back here
	#[arg(short, long, default_value = "name-blend.json")]
	config: PathBuf,

	/// Log debug output
	#[arg(short, long)]
	verbose: bool,

	/// Use a name-blend server instead of the local corpora
	#[arg(long)]
	backend_url: Option<String>,

	/// Directory receiving the generated name files
	#[arg(short, long)]
	output_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
	let cli = Cli::parse();
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "warn" }))
		.init();

	match run(cli) {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!("{e}");
			eprintln!("name-blend: {e}");
			ExitCode::FAILURE
		}
	}
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
	let (mut settings, problem) = Settings::load_or_recover(&cli.config);
	if let Some(e) = problem {
		eprintln!("name-blend: {e}; continuing with default settings");
	}
	if let Some(url) = cli.backend_url {
		settings.backend_url = Some(url);
	}
	if let Some(dir) = cli.output_dir {
		settings.output_dir = dir;
	}

	let config_store = JsonConfigStore::new(&cli.config);
	let config = settings.generation;

	let archive = match &settings.database {
		Some(path) => match ArchiveStore::open(path) {
			Ok(archive) => Some(Arc::new(archive)),
			Err(e) => {
				warn!("archive {} unavailable: {e}", path.display());
				None
			}
		},
		None => None,
	};

	// Corpus listing and synthesis come from the same place
	let local;
	let remote;
	let (corpora, backend) = match &settings.backend_url {
		Some(url) => {
			info!("using remote backend {url}");
			remote = RemoteBackend::new(url)?;
			(&remote as &dyn CorpusSource, &remote as &dyn GenerationBackend)
		}
		None => {
			info!("using local corpora in {}", settings.data_dir.display());
			let library = CorpusLibrary::new(&settings.data_dir, settings.synthesis);
			local = match &archive {
				Some(archive) => library.with_archive(Arc::clone(archive)),
				None => library,
			};
			(&local as &dyn CorpusSource, &local as &dyn GenerationBackend)
		}
	};

	let ctx = SessionContext {
		corpora,
		backend,
		config_store: &config_store,
		archive: archive.as_deref().map(|a| a as &dyn ArtifactStore),
		writer: ArtifactWriter::new(&settings.output_dir),
	};

	let mut console = Terminal::stdio();
	match run_main_menu(&ctx, &mut console, config)? {
		MenuOutcome::Generated(summary) => info!(
			"{} runs, {} artifacts, archived: {}, config saved: {}",
			summary.runs,
			summary.artifacts.len(),
			summary.archived,
			summary.config_saved
		),
		MenuOutcome::Quit => info!("quit without generating"),
	}
	Ok(())
}
