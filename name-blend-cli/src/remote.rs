use std::time::Duration;

use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;

use name_blend_core::backend::{GenerationBackend, GenerationRequest};
use name_blend_core::corpus::{Corpus, CorpusId, CorpusSource};
use name_blend_core::error::BackendError;

/// Client of a `name-blend-server`.
pub struct RemoteBackend {
	client: Client,
	base_url: String,
}

impl RemoteBackend {
	/// Creates a client with a 5 second connect timeout.
	///
	/// Synthesis of large corpora can take a while on first use, so only the
	/// connection is bounded.
	pub fn new(base_url: &str) -> Result<Self, BackendError> {
		let client = Client::builder()
			.connect_timeout(Duration::new(5, 0))
			.build()
			.map_err(|e| BackendError::Unavailable(e.to_string()))?;
		Ok(Self { client, base_url: base_url.trim_end_matches('/').to_owned() })
	}

	/// Sends a GET request to `path` and decodes the JSON answer.
	fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T, BackendError> {
		let url = format!("{}{path}", self.base_url);
		debug!("GET {url} {params:?}");
		let response = self.client.get(&url).query(params).send().map_err(unavailable)?;
		checked(response)?.json::<T>().map_err(unavailable)
	}

	/// Builds the query parameters of `/v1/generate`.
	fn build_query(request: &GenerationRequest) -> Vec<(&'static str, String)> {
		let corpora: Vec<&str> = request.corpus_ids.iter().map(CorpusId::as_str).collect();
		let weights: Vec<String> = request.weights.iter().map(f64::to_string).collect();
		vec![
			("corpora", corpora.join(",")),
			("weights", weights.join(",")),
			("count", request.final_name_count.to_string()),
			("max_len", request.max_name_length.to_string()),
			("min_len", request.min_name_length.to_string()),
		]
	}
}

fn unavailable(err: reqwest::Error) -> BackendError {
	BackendError::Unavailable(err.to_string())
}

/// 503 and server errors mean the backend is unavailable; any other failure
/// status is a rejection carrying the response body.
fn checked(response: Response) -> Result<Response, BackendError> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}
	let body = response.text().unwrap_or_default();
	let reason = if body.trim().is_empty() { status.to_string() } else { body };
	if status == StatusCode::SERVICE_UNAVAILABLE || status.is_server_error() {
		Err(BackendError::Unavailable(reason))
	} else {
		Err(BackendError::Rejected(reason))
	}
}

impl CorpusSource for RemoteBackend {
	fn list(&self) -> Result<Vec<Corpus>, BackendError> {
		self.get("/v1/corpora", &[])
	}

	fn names_for(&self, id: &CorpusId) -> Result<Vec<String>, BackendError> {
		self.get("/v1/names", &[("corpus", id.as_str().to_owned())])
	}
}

impl GenerationBackend for RemoteBackend {
	fn generate(&self, request: &GenerationRequest) -> Result<Vec<String>, BackendError> {
		request.check()?;
		self.get("/v1/generate", &Self::build_query(request))
	}
}
