//! Application configuration loaded from environment variables.

use std::{env, time::Duration};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{name} must be {expected}, got {value:?}")]
	Invalid {
		name: &'static str,
		expected: &'static str,
		value: String,
	},
}

/// Settings for the text generation provider.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
	pub api_key: Option<String>,
	pub base_url: String,
	pub model: String,
	pub timeout: Duration,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
	/// When absent, blogs and accounts are kept in memory.
	pub database_url: Option<String>,
	pub host: String,
	pub port: u16,
	pub gemini: GeminiConfig,
	pub rate_limit: bool,
	pub otlp_endpoint: Option<String>,
}

/// Reads variables through `lookup`, so tests need not touch the process environment.
struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
	fn parse<T: std::str::FromStr>(
		&self,
		name: &'static str,
		expected: &'static str,
		default: T,
	) -> Result<T, Error> {
		match self.non_empty(name) {
			Some(value) => value.trim().parse().map_err(|_| Error::Invalid {
				name,
				expected,
				value,
			}),
			None => Ok(default),
		}
	}

	fn non_empty(&self, name: &str) -> Option<String> {
		(self.0)(name).filter(|value| !value.trim().is_empty())
	}
}

impl Config {
	/// Loads configuration from the environment. Call [`dotenvy::dotenv`] first
	/// to pick up a `.env` file.
	pub fn from_env() -> Result<Self, Error> {
		Self::from_lookup(|name| env::var(name).ok())
	}

	fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
		let vars = Vars(lookup);

		Ok(Self {
			database_url: vars.non_empty("DATABASE_URL"),
			host: vars.non_empty("HOST").unwrap_or_else(|| "127.0.0.1".into()),
			port: vars.parse("PORT", "a port number", 3000)?,
			gemini: GeminiConfig {
				api_key: vars.non_empty("GEMINI_API_KEY"),
				base_url: vars
					.non_empty("GEMINI_BASE_URL")
					.unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.into()),
				model: vars
					.non_empty("GEMINI_MODEL")
					.unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
				timeout: Duration::from_secs(vars.parse(
					"GENERATION_TIMEOUT_SECS",
					"a number of seconds",
					60,
				)?),
			},
			rate_limit: vars.parse("RATE_LIMIT", "true or false", true)?,
			otlp_endpoint: vars.non_empty("OTEL_EXPORTER_OTLP_ENDPOINT"),
		})
	}
}

#[cfg(test)]
mod test {
	use std::{collections::HashMap, time::Duration};

	use super::*;

	fn load(vars: &[(&str, &str)]) -> Result<Config, Error> {
		let vars = vars
			.iter()
			.map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
			.collect::<HashMap<_, _>>();

		Config::from_lookup(|name| vars.get(name).cloned())
	}

	#[test]
	fn test_defaults() {
		let config = load(&[]).unwrap();

		assert!(config.database_url.is_none());
		assert_eq!(config.port, 3000);
		assert_eq!(config.gemini.model, DEFAULT_GEMINI_MODEL);
		assert_eq!(config.gemini.timeout, Duration::from_secs(60));
		assert!(config.rate_limit);
	}

	#[test]
	fn test_blank_values_count_as_unset() {
		let config = load(&[("DATABASE_URL", "  "), ("PORT", "")]).unwrap();

		assert!(config.database_url.is_none());
		assert_eq!(config.port, 3000);
	}

	#[test]
	fn test_overrides() {
		let config = load(&[
			("PORT", "8080"),
			("GENERATION_TIMEOUT_SECS", "5"),
			("RATE_LIMIT", "false"),
			("GEMINI_API_KEY", "key"),
		])
		.unwrap();

		assert_eq!(config.port, 8080);
		assert_eq!(config.gemini.timeout, Duration::from_secs(5));
		assert!(!config.rate_limit);
		assert_eq!(config.gemini.api_key.as_deref(), Some("key"));
	}

	#[test]
	fn test_invalid_value() {
		let error = load(&[("PORT", "eighty")]).unwrap_err();

		assert!(matches!(error, Error::Invalid { name: "PORT", .. }));
	}
}
