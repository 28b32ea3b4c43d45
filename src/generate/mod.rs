//! The content generation gateway.
//!
//! A [`Generator`] turns a [`GenerationRequest`] into draft text by calling an external
//! provider. Nothing here is persisted, and failed calls are never retried; the caller
//! decides whether to try again.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{self, ErrorShape};

pub mod gemini;
mod prompt;

pub use gemini::Gemini;

pub const DEFAULT_LENGTH: u32 = 1000;

#[inline]
fn default_length() -> u32 {
	DEFAULT_LENGTH
}

/// The voice a draft is written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
	#[default]
	Professional,
	Conversational,
	Casual,
	Academic,
	Persuasive,
}

impl Tone {
	fn instruction(self) -> &'static str {
		match self {
			Self::Professional => "professional yet conversational, easy to follow",
			Self::Conversational => "friendly and conversational, as if talking to the reader",
			Self::Casual => "casual and light-hearted",
			Self::Academic => "precise and academic, introducing concepts carefully",
			Self::Persuasive => "persuasive, building a clear argument towards a call to action",
		}
	}
}

/// A request for a draft blog post.
#[derive(Debug, Clone, Deserialize, Validate, JsonSchema)]
pub struct GenerationRequest {
	/// What the post should be about. Must not be blank.
	#[validate(length(max = 2000))]
	pub topic: String,
	/// The voice of the post.
	#[serde(default)]
	pub tone: Tone,
	/// The target length of the post, in words.
	#[validate(range(min = 100, max = 3000))]
	#[serde(default = "default_length")]
	pub length: u32,
}

impl GenerationRequest {
	pub fn new(topic: impl Into<String>) -> Self {
		Self {
			topic: topic.into(),
			tone: Tone::default(),
			length: DEFAULT_LENGTH,
		}
	}
}

/// Text returned by a provider, with code fences already removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedText {
	pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("the prompt is empty")]
	InvalidInput,
	#[error("the provider did not respond within {0:?}")]
	Timeout(Duration),
	#[error("the provider rejected the request (status {status:?}): {reason}")]
	ProviderRejected { status: Option<u16>, reason: String },
}

impl ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::InvalidInput => StatusCode::BAD_REQUEST,
			Self::Timeout(..) => StatusCode::GATEWAY_TIMEOUT,
			Self::ProviderRejected { .. } => StatusCode::BAD_GATEWAY,
		}
	}

	fn errors(&self) -> Vec<error::Message> {
		match self {
			Self::InvalidInput => error::Message::new("empty_topic")
				.field("topic")
				.detail("hint", "Provide a topic and try again.")
				.into_vec(),
			Self::Timeout(timeout) => error::Message::new("generation_timeout")
				.detail("timeout_secs", timeout.as_secs())
				.detail("hint", "The writer took too long. Please try again.")
				.into_vec(),
			Self::ProviderRejected { .. } => error::Message::new("generation_failed")
				.detail("hint", "The draft could not be generated. Please try again later.")
				.into_vec(),
		}
	}
}

/// Produces draft text from a topic.
#[async_trait]
pub trait Generator: Send + Sync {
	async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedText, Error>;
}
