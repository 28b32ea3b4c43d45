use std::{sync::Arc, time::Duration};

use axum::{
	body::Body,
	response::{IntoResponse, Response},
};
use governor::middleware::StateInformationMiddleware;
use tower_governor::{
	governor::{GovernorConfig, GovernorConfigBuilder},
	key_extractor::PeerIpKeyExtractor,
	GovernorError, GovernorLayer,
};

use crate::error::AppError;

pub type Config = GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Per-client limits for the different kinds of routes.
///
/// Keys are peer addresses, so the server must be run with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
#[derive(Clone)]
pub struct Limits {
	/// For ordinary reads and writes.
	pub default: Arc<Config>,
	/// For logins, registrations and draft generation.
	pub secure: Arc<Config>,
}

impl Limits {
	pub fn new() -> Self {
		Self {
			default: default(),
			secure: secure(),
		}
	}

	pub fn default_layer(&self) -> GovernorLayer<PeerIpKeyExtractor, StateInformationMiddleware> {
		GovernorLayer {
			config: self.default.clone(),
		}
	}

	pub fn secure_layer(&self) -> GovernorLayer<PeerIpKeyExtractor, StateInformationMiddleware> {
		GovernorLayer {
			config: self.secure.clone(),
		}
	}

	/// Periodically drops limiter state for clients that have gone quiet.
	pub fn cleanup_old_limits(&self) {
		let limiters = [self.default.limiter().clone(), self.secure.limiter().clone()];
		let interval = Duration::from_secs(60);

		std::thread::spawn(move || loop {
			std::thread::sleep(interval);

			for limiter in &limiters {
				tracing::debug!(size = limiter.len(), "rate limiting storage");

				limiter.retain_recent();
			}
		});
	}
}

fn default() -> Arc<Config> {
	Arc::new(
		GovernorConfigBuilder::default()
			.per_second(10)
			.burst_size(50)
			.use_headers()
			.error_handler(error_handler)
			.finish()
			.expect("rate limit period and burst size are non-zero"),
	)
}

fn secure() -> Arc<Config> {
	Arc::new(
		GovernorConfigBuilder::default()
			.per_second(2)
			.burst_size(5)
			.use_headers()
			.error_handler(error_handler)
			.finish()
			.expect("rate limit period and burst size are non-zero"),
	)
}

fn error_handler(error: GovernorError) -> Response<Body> {
	AppError::from(error).into_response()
}
