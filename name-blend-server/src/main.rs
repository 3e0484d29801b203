use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, middleware, web};
use clap::Parser;
use log::{error, info, warn};
use serde::Deserialize;

use name_blend_core::archive::ArchiveStore;
use name_blend_core::backend::{GenerationBackend, GenerationRequest};
use name_blend_core::config::{GenerationConfig, Settings};
use name_blend_core::corpus::{CorpusId, CorpusSource};
use name_blend_core::error::BackendError;
use name_blend_core::library::CorpusLibrary;

/// Name synthesis server over the local corpus library.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
	/// Settings file (JSON)
	#[arg(short, long, default_value = "name-blend.json")]
	config: PathBuf,

	/// Log debug output
	#[arg(short, long)]
	verbose: bool,

	/// Address to bind, overrides the settings file
	#[arg(long)]
	bind: Option<String>,

	/// Port to listen on, overrides the settings file
	#[arg(long)]
	port: Option<u16>,
}

/// Query parameters of `/v1/generate`.
///
/// `corpora` and `weights` are comma separated and parallel.
#[derive(Deserialize)]
struct GenerateParams {
	corpora: Option<String>,
	weights: Option<String>,
	count: Option<usize>,
	max_len: Option<usize>,
	min_len: Option<usize>,
}

#[derive(Deserialize)]
struct NamesQuery {
	corpus: Option<String>,
}

struct SharedData {
	library: CorpusLibrary,
	defaults: GenerationConfig,
}

impl GenerateParams {
	/// Builds the request, falling back to the server defaults for the counts.
	fn request(&self, defaults: &GenerationConfig) -> Result<GenerationRequest, String> {
		let corpus_ids: Vec<CorpusId> = split(self.corpora.as_deref()).map(CorpusId::new).collect();
		if corpus_ids.is_empty() {
			return Err("Missing or empty corpora".into());
		}
		let weights = split(self.weights.as_deref())
			.map(|w| w.parse::<f64>().map_err(|_| format!("Weight '{w}' is not a number")))
			.collect::<Result<Vec<_>, _>>()?;

		Ok(GenerationRequest {
			corpus_ids,
			weights,
			final_name_count: self.count.unwrap_or(defaults.final_name_count),
			max_name_length: self.max_len.unwrap_or(defaults.max_name_length),
			min_name_length: self.min_len.unwrap_or(defaults.min_name_length),
		})
	}
}

fn split(raw: Option<&str>) -> impl Iterator<Item = &str> {
	raw.unwrap_or_default().split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn backend_failure(err: BackendError) -> HttpResponse {
	match err {
		BackendError::Rejected(reason) => HttpResponse::BadRequest().body(reason),
		BackendError::Unavailable(reason) => {
			warn!("backend unavailable: {reason}");
			HttpResponse::ServiceUnavailable().body(reason)
		}
	}
}

/// HTTP GET endpoint `/v1/corpora`
///
/// Lists every corpus as JSON, real-world ones from the data directory and
/// archived runs when a database is configured.
#[get("/v1/corpora")]
async fn get_corpora(data: web::Data<SharedData>) -> impl Responder {
	match data.library.list() {
		Ok(corpora) => HttpResponse::Ok().json(corpora),
		Err(e) => backend_failure(e),
	}
}

/// HTTP GET endpoint `/v1/names`
///
/// Returns the names of one corpus as a JSON array.
#[get("/v1/names")]
async fn get_names(data: web::Data<SharedData>, query: web::Query<NamesQuery>) -> impl Responder {
	let corpus = match &query.corpus {
		Some(s) if !s.trim().is_empty() => CorpusId::new(s.trim()),
		_ => return HttpResponse::BadRequest().body("Missing or empty corpus"),
	};
	match data.library.names_for(&corpus) {
		Ok(names) => HttpResponse::Ok().json(names),
		Err(e) => backend_failure(e),
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Blends the requested corpora and returns the names as a JSON array.
/// Training and synthesis run on the blocking pool.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<SharedData>, query: web::Query<GenerateParams>) -> impl Responder {
	let request = match query.request(&data.defaults) {
		Ok(r) => r,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};

	let shared = data.clone();
	match web::block(move || shared.library.generate(&request)).await {
		Ok(Ok(names)) => HttpResponse::Ok().json(names),
		Ok(Err(e)) => backend_failure(e),
		Err(e) => {
			error!("generation worker failed: {e}");
			HttpResponse::InternalServerError().body("Generation worker failed")
		}
	}
}

fn library(settings: &Settings) -> CorpusLibrary {
	let library = CorpusLibrary::new(&settings.data_dir, settings.synthesis);
	let Some(path) = &settings.database else {
		return library;
	};
	match ArchiveStore::open(path) {
		Ok(archive) => library.with_archive(Arc::new(archive)),
		Err(e) => {
			warn!("archive {} unavailable, serving real-world corpora only: {e}", path.display());
			library
		}
	}
}

/// Main entry point for the server.
///
/// Reads the settings file, builds the corpus library and starts an
/// Actix-web HTTP server with the `/v1` endpoints.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	let args = Args::parse();
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }))
		.init();

	let (settings, _) = Settings::load_or_recover(&args.config);
	let bind = args.bind.unwrap_or_else(|| settings.server.bind.clone());
	let port = args.port.unwrap_or(settings.server.port);

	let shared_data = web::Data::new(SharedData { library: library(&settings), defaults: settings.generation });
	info!("serving corpora from {} on {bind}:{port}", settings.data_dir.display());

	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.wrap(middleware::Logger::default())
			.app_data(shared_data.clone())
			.service(get_corpora)
			.service(get_names)
			.service(get_generated)
	})
	.bind((bind.as_str(), port))?
	.run()
	.await
}
