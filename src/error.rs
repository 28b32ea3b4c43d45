use std::borrow::Cow;

use aide::OperationOutput;
use axum::{
	body::Body,
	extract::rejection,
	http::{HeaderMap, Response, StatusCode},
	response::IntoResponse,
};
use axum_jsonschema::JsonSchemaRejection;
use schemars::JsonSchema;
use serde::Serialize;
use tower_governor::GovernorError;

use crate::{generate, route, store};

pub type Map = serde_json::Map<String, serde_json::Value>;

/// A single error message presented to the client.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Message {
	/// A short machine-readable code, or a human-readable explanation.
	pub content: Cow<'static, str>,
	/// The input field the message is about, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub field: Option<Cow<'static, str>>,
	/// Extra context about the error.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<Map>,
}

impl Message {
	pub fn new(content: impl Into<Cow<'static, str>>) -> Self {
		Self {
			content: content.into(),
			field: None,
			details: None,
		}
	}

	#[must_use]
	pub fn field(mut self, field: impl Into<Cow<'static, str>>) -> Self {
		self.field = Some(field.into());
		self
	}

	#[must_use]
	pub fn detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
		self.details
			.get_or_insert_with(Map::new)
			.insert(key.into(), value.into());
		self
	}

	pub fn into_vec(self) -> Vec<Self> {
		vec![self]
	}
}

/// The body of every error response.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ErrorResponse {
	pub success: bool,
	pub errors: Vec<Message>,
}

/// Describes how a module-level error is presented to the client.
///
/// The [`std::fmt::Display`] output of the error is only logged, so it may
/// contain information that [`ErrorShape::errors`] must not.
pub trait ErrorShape: std::error::Error {
	fn status(&self) -> StatusCode;

	fn errors(&self) -> Vec<Message>;
}

/// Error type for the application.
///
/// The Display trait is not sent to the client, so it can show
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("json body rejected")]
	Json(JsonSchemaRejection),
	#[error("query error: {0}")]
	Query(#[from] rejection::QueryRejection),
	#[error("path error: {0}")]
	Path(#[from] rejection::PathRejection),
	#[error("rate limiter rejected the request")]
	RateLimit(GovernorError),
	#[error("auth error: {0}")]
	Auth(#[from] route::auth::Error),
	#[error("store error: {0}")]
	Store(#[from] store::Error),
	#[error("generation error: {0}")]
	Generate(#[from] generate::Error),
}

impl From<JsonSchemaRejection> for AppError {
	fn from(rejection: JsonSchemaRejection) -> Self {
		Self::Json(rejection)
	}
}

impl From<GovernorError> for AppError {
	fn from(error: GovernorError) -> Self {
		Self::RateLimit(error)
	}
}

fn respond(status: StatusCode, headers: HeaderMap, errors: Vec<Message>) -> Response<Body> {
	(
		status,
		headers,
		axum::Json(ErrorResponse {
			success: false,
			errors,
		}),
	)
		.into_response()
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response<Body> {
		let (status, headers, errors) = match self {
			Self::Validation(errors) => (
				StatusCode::BAD_REQUEST,
				HeaderMap::new(),
				errors
					.field_errors()
					.into_iter()
					.flat_map(|(field, errors)| {
						errors.iter().map(move |error| {
							Message::new(error.code.clone()).field(field.to_string())
						})
					})
					.collect(),
			),
			// schema rejections carry their own instance paths
			Self::Json(rejection) => return rejection.into_response(),
			Self::Query(error) => (
				error.status(),
				HeaderMap::new(),
				Message::new(error.body_text()).into_vec(),
			),
			Self::Path(error) => (
				error.status(),
				HeaderMap::new(),
				Message::new(error.body_text()).into_vec(),
			),
			Self::RateLimit(error) => match error {
				GovernorError::TooManyRequests { wait_time, headers } => (
					StatusCode::TOO_MANY_REQUESTS,
					headers.unwrap_or_default(),
					Message::new("too_many_requests")
						.detail("retry_after", wait_time)
						.into_vec(),
				),
				GovernorError::UnableToExtractKey => {
					tracing::error!("rate limiter could not identify the client");

					(
						StatusCode::INTERNAL_SERVER_ERROR,
						HeaderMap::new(),
						Vec::new(),
					)
				}
				GovernorError::Other { code, msg, headers } => (
					code,
					headers.unwrap_or_default(),
					msg.map(|msg| Message::new(msg).into_vec())
						.unwrap_or_default(),
				),
			},
			Self::Auth(error) => shape(&error),
			Self::Store(error) => shape(&error),
			Self::Generate(error) => shape(&error),
		};

		respond(status, headers, errors)
	}
}

/// Renders a module error, logging the ones that are our fault.
fn shape<E: ErrorShape>(error: &E) -> (StatusCode, HeaderMap, Vec<Message>) {
	let status = error.status();

	if status.is_server_error() {
		tracing::error!(%error, "request failed");
	} else {
		tracing::debug!(%error, "request rejected");
	}

	(status, HeaderMap::new(), error.errors())
}

impl OperationOutput for AppError {
	type Inner = ErrorResponse;
}
