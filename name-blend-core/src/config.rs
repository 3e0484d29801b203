use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, ValidationError};

/// Length and count bounds for one generation run.
///
/// # Invariants
/// - `final_name_count > 0`
/// - `max_name_length > 0`
/// - `min_name_length <= max_name_length`
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationConfig {
	#[serde(alias = "number_of_names")]
	pub final_name_count: usize,
	pub max_name_length: usize,
	#[serde(default)]
	pub min_name_length: usize,
}

impl Default for GenerationConfig {
	fn default() -> Self {
		Self { final_name_count: 20, max_name_length: 12, min_name_length: 3 }
	}
}

impl GenerationConfig {
	/// Builds a checked configuration.
	pub fn new(final_name_count: usize, max_name_length: usize, min_name_length: usize) -> Result<Self, ValidationError> {
		let config = Self { final_name_count, max_name_length, min_name_length };
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<(), ValidationError> {
		if self.final_name_count == 0 {
			return Err(ValidationError::InvalidConfig("the name count must be at least 1".to_owned()));
		}
		if self.max_name_length == 0 {
			return Err(ValidationError::InvalidConfig("the maximum length must be at least 1".to_owned()));
		}
		if self.min_name_length > self.max_name_length {
			return Err(ValidationError::InvalidConfig(format!(
				"the minimum length {} exceeds the maximum length {}",
				self.min_name_length, self.max_name_length
			)));
		}
		Ok(())
	}
}

/// Tuning knobs of the local n-gram synthesizer.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SynthesisOptions {
	/// Largest n-gram order consulted; 0 means unbounded.
	pub max_order: usize,
	/// Chance in `[0, 1]` of falling back to a random shorter order at a step.
	pub randomness: f32,
	/// Attempts allowed per requested name before giving up.
	pub attempts_per_name: usize,
}

impl Default for SynthesisOptions {
	fn default() -> Self {
		Self { max_order: 0, randomness: 0.1, attempts_per_name: 50 }
	}
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerSettings {
	pub bind: String,
	pub port: u16,
}

impl Default for ServerSettings {
	fn default() -> Self {
		Self { bind: "127.0.0.1".to_owned(), port: 5000 }
	}
}

/// Everything read from the settings file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
	pub generation: GenerationConfig,
	/// Directory holding the real-world `*.dat` corpora.
	pub data_dir: PathBuf,
	/// SQLite archive of persisted runs. No archive when unset.
	pub database: Option<PathBuf>,
	/// Where artifacts are written.
	pub output_dir: PathBuf,
	/// Remote synthesis server. Local synthesis when unset.
	pub backend_url: Option<String>,
	pub synthesis: SynthesisOptions,
	pub server: ServerSettings,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			generation: GenerationConfig::default(),
			data_dir: PathBuf::from("./data"),
			database: None,
			output_dir: PathBuf::from("."),
			backend_url: None,
			synthesis: SynthesisOptions::default(),
			server: ServerSettings::default(),
		}
	}
}

impl Settings {
	/// Reads the settings file.
	///
	/// # Errors
	/// `ConfigError::Io` when the file cannot be read (including when it is
	/// missing), `Parse` when it is not valid JSON, `Invalid` when the
	/// generation section breaks its invariants.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_owned(), source })?;
		let settings: Settings =
			serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path: path.to_owned(), source })?;
		settings.generation.validate()?;
		debug!("loaded settings from {}", path.display());
		Ok(settings)
	}

	/// Like [`Settings::load`], but a missing file yields the defaults.
	pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
		match Self::load(&path) {
			Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
				warn!("settings file {} not found, using defaults", path.as_ref().display());
				Ok(Self::default())
			}
			other => other,
		}
	}

	/// Like [`Settings::load_or_default`], but an unreadable, malformed or
	/// invalid file is handed back next to the defaults instead of failing.
	pub fn load_or_recover<P: AsRef<Path>>(path: P) -> (Self, Option<ConfigError>) {
		match Self::load_or_default(&path) {
			Ok(settings) => (settings, None),
			Err(err) => {
				warn!("ignoring settings file {}: {err}", path.as_ref().display());
				(Self::default(), Some(err))
			}
		}
	}
}

/// Durable home of the [`GenerationConfig`].
pub trait ConfigStore {
	fn load(&self) -> Result<GenerationConfig, ConfigError>;
	fn save(&self, config: &GenerationConfig) -> Result<(), ConfigError>;
}

/// Stores the generation section inside the JSON settings file.
///
/// Saving rewrites the `generation` key only; every other key of the file
/// is preserved as found.
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
	path: PathBuf,
}

impl JsonConfigStore {
	pub fn new<P: Into<PathBuf>>(path: P) -> Self {
		Self { path: path.into() }
	}

	fn read_document(&self) -> Result<Value, ConfigError> {
		match fs::read_to_string(&self.path) {
			Ok(content) => serde_json::from_str(&content)
				.map_err(|source| ConfigError::Parse { path: self.path.clone(), source }),
			Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(Value::Object(Default::default())),
			Err(source) => Err(ConfigError::Io { path: self.path.clone(), source }),
		}
	}
}

impl ConfigStore for JsonConfigStore {
	fn load(&self) -> Result<GenerationConfig, ConfigError> {
		Settings::load_or_default(&self.path).map(|settings| settings.generation)
	}

	fn save(&self, config: &GenerationConfig) -> Result<(), ConfigError> {
		config.validate()?;

		let mut document = self.read_document()?;
		let section = serde_json::to_value(config).map_err(|source| ConfigError::Parse { path: self.path.clone(), source })?;
		match document.as_object_mut() {
			Some(object) => {
				object.insert("generation".to_owned(), section);
			}
			None => {
				return Err(ConfigError::Io {
					path: self.path.clone(),
					source: io::Error::new(io::ErrorKind::InvalidData, "settings root is not a JSON object"),
				});
			}
		}

		let content = serde_json::to_string_pretty(&document)
			.map_err(|source| ConfigError::Parse { path: self.path.clone(), source })?;
		fs::write(&self.path, content).map_err(|source| ConfigError::Io { path: self.path.clone(), source })?;
		debug!("saved generation parameters to {}", self.path.display());
		Ok(())
	}
}
