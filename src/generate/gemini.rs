use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{prompt, Error, GeneratedText, GenerationRequest, Generator};
use crate::config::GeminiConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Provider error bodies can be large; only this much is kept for logging.
const MAX_REASON_LENGTH: usize = 512;

const SAFETY_CATEGORIES: &[&str] = &[
	"HARM_CATEGORY_HARASSMENT",
	"HARM_CATEGORY_HATE_SPEECH",
	"HARM_CATEGORY_SEXUALLY_EXPLICIT",
	"HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
	#[serde(default)]
	candidates: Vec<Candidate>,
	prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
	content: Option<Content>,
	finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
	#[serde(default)]
	parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
	text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
	block_reason: Option<String>,
}

/// A [`Generator`] backed by the Google Gemini `generateContent` API.
#[derive(Debug, Clone)]
pub struct Gemini {
	client: Client,
	config: GeminiConfig,
}

impl Gemini {
	/// Creates a client whose requests give up after `config.timeout`.
	pub fn new(config: GeminiConfig) -> Result<Self, reqwest::Error> {
		let client = Client::builder().timeout(config.timeout).build()?;

		if config.api_key.is_none() {
			tracing::warn!("GEMINI_API_KEY is not set, generation requests will be rejected");
		}

		Ok(Self { client, config })
	}

	fn endpoint(&self) -> String {
		format!(
			"{}/v1beta/models/{}:generateContent",
			self.config.base_url.trim_end_matches('/'),
			self.config.model
		)
	}

	fn transport_error(&self, error: &reqwest::Error) -> Error {
		if error.is_timeout() {
			Error::Timeout(self.config.timeout)
		} else {
			Error::ProviderRejected {
				status: error.status().map(|status| status.as_u16()),
				reason: error.to_string(),
			}
		}
	}
}

fn truncate(mut reason: String) -> String {
	if reason.len() > MAX_REASON_LENGTH {
		let mut end = MAX_REASON_LENGTH;

		while !reason.is_char_boundary(end) {
			end -= 1;
		}

		reason.truncate(end);
	}

	reason
}

#[async_trait]
impl Generator for Gemini {
	#[tracing::instrument(skip_all, fields(model = %self.config.model, tone = ?request.tone, length = request.length))]
	async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedText, Error> {
		let topic = request.topic.trim();

		if topic.is_empty() {
			return Err(Error::InvalidInput);
		}

		let body = json!({
			"contents": [{
				"parts": [{ "text": prompt::build(topic, request.tone, request.length) }],
			}],
			"safetySettings": SAFETY_CATEGORIES
				.iter()
				.map(|category| json!({ "category": category, "threshold": "BLOCK_ONLY_HIGH" }))
				.collect::<Vec<_>>(),
		});

		let mut builder = self.client.post(self.endpoint()).json(&body);

		if let Some(ref api_key) = self.config.api_key {
			builder = builder.header(API_KEY_HEADER, api_key);
		}

		let started = Instant::now();
		let response = builder
			.send()
			.await
			.map_err(|error| self.transport_error(&error))?;

		let status = response.status();

		if !status.is_success() {
			let reason = response
				.text()
				.await
				.map_err(|error| self.transport_error(&error))?;

			return Err(Error::ProviderRejected {
				status: Some(status.as_u16()),
				reason: truncate(reason),
			});
		}

		let reply = response
			.json::<GenerateContentResponse>()
			.await
			.map_err(|error| self.transport_error(&error))?;

		if let Some(reason) = reply.prompt_feedback.and_then(|feedback| feedback.block_reason) {
			return Err(Error::ProviderRejected {
				status: None,
				reason: format!("prompt blocked: {reason}"),
			});
		}

		let Some(candidate) = reply.candidates.into_iter().next() else {
			return Err(Error::ProviderRejected {
				status: None,
				reason: "no candidates returned".into(),
			});
		};

		let text = candidate
			.content
			.map(|content| {
				content
					.parts
					.into_iter()
					.filter_map(|part| part.text)
					.collect::<String>()
			})
			.unwrap_or_default();

		let text = prompt::strip_fences(&text);

		if text.is_empty() {
			return Err(Error::ProviderRejected {
				status: None,
				reason: format!(
					"empty candidate (finish reason {:?})",
					candidate.finish_reason
				),
			});
		}

		tracing::info!(
			histogram.generation_seconds = started.elapsed().as_secs_f64(),
			chars = text.len(),
			"generated draft"
		);

		Ok(GeneratedText {
			text: text.to_owned(),
		})
	}
}

#[cfg(test)]
mod test {
	use std::{
		io::{Read, Write},
		sync::{
			atomic::{AtomicUsize, Ordering},
			Arc,
		},
		time::Duration,
	};

	use axum::{
		extract::State,
		http::{HeaderMap, StatusCode},
		response::IntoResponse,
		Router,
	};
	use serde_json::{json, Value};

	use super::*;

	/// Serves `router` on a random local port, returning its base url.
	async fn provider(router: Router) -> String {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let address = listener.local_addr().unwrap();

		tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

		format!("http://{address}")
	}

	fn gemini(base_url: String, timeout: Duration) -> Gemini {
		Gemini::new(GeminiConfig {
			api_key: Some("test-key".into()),
			base_url,
			model: "test-model".into(),
			timeout,
		})
		.unwrap()
	}

	fn reply(text: &str) -> Value {
		json!({
			"candidates": [{
				"content": { "parts": [{ "text": text }] },
				"finishReason": "STOP",
			}],
		})
	}

	#[tokio::test]
	async fn test_empty_prompt_makes_no_call() {
		let calls = Arc::new(AtomicUsize::new(0));
		let router = Router::new()
			.fallback(|State(calls): State<Arc<AtomicUsize>>| async move {
				calls.fetch_add(1, Ordering::SeqCst);
				axum::Json(reply("<p>unexpected</p>"))
			})
			.with_state(calls.clone());

		let gemini = gemini(provider(router).await, Duration::from_secs(5));
		let result = gemini.generate(&GenerationRequest::new("   ")).await;

		assert!(matches!(result, Err(Error::InvalidInput)));
		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_generates_and_strips_fences() {
		let router = Router::new().fallback(
			|headers: HeaderMap, axum::Json(body): axum::Json<Value>| async move {
				let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or("");

				if headers.get(API_KEY_HEADER).map(|v| v.as_bytes()) != Some(b"test-key".as_slice())
					|| !prompt.contains("sourdough")
				{
					return StatusCode::BAD_REQUEST.into_response();
				}

				axum::Json(reply("```html\n<h2>Sourdough</h2><p>Bake it.</p>\n```")).into_response()
			},
		);

		let gemini = gemini(provider(router).await, Duration::from_secs(5));
		let generated = gemini
			.generate(&GenerationRequest::new("sourdough"))
			.await
			.unwrap();

		assert_eq!(generated.text, "<h2>Sourdough</h2><p>Bake it.</p>");
	}

	#[tokio::test]
	async fn test_error_status_is_rejected() {
		let router = Router::new()
			.fallback(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "quota exceeded") });

		let gemini = gemini(provider(router).await, Duration::from_secs(5));
		let result = gemini.generate(&GenerationRequest::new("anything")).await;

		match result {
			Err(Error::ProviderRejected { status, reason }) => {
				assert_eq!(status, Some(500));
				assert_eq!(reason, "quota exceeded");
			}
			other => panic!("expected a rejection, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_stalled_error_body_times_out() {
		let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
		let address = listener.local_addr().unwrap();

		// answers with an error status, then never finishes the body
		std::thread::spawn(move || {
			let (mut stream, _) = listener.accept().unwrap();
			let mut request = [0; 8192];

			let _ = stream.read(&mut request);
			let _ = stream.write_all(
				b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 64\r\n\r\nquota",
			);

			std::thread::sleep(Duration::from_secs(3));
		});

		let gemini = gemini(format!("http://{address}"), Duration::from_millis(300));
		let result = gemini.generate(&GenerationRequest::new("anything")).await;

		assert!(matches!(result, Err(Error::Timeout(..))), "got {result:?}");
	}

	#[tokio::test]
	async fn test_blocked_prompt_is_rejected() {
		let router = Router::new().fallback(|| async {
			axum::Json(json!({ "promptFeedback": { "blockReason": "SAFETY" } }))
		});

		let gemini = gemini(provider(router).await, Duration::from_secs(5));
		let result = gemini.generate(&GenerationRequest::new("anything")).await;

		assert!(matches!(
			result,
			Err(Error::ProviderRejected { status: None, .. })
		));
	}

	#[tokio::test]
	async fn test_slow_provider_times_out() {
		let router = Router::new().fallback(|| async {
			tokio::time::sleep(Duration::from_secs(5)).await;
			axum::Json(reply("<p>too late</p>"))
		});

		let gemini = gemini(provider(router).await, Duration::from_millis(200));
		let result = gemini.generate(&GenerationRequest::new("anything")).await;

		assert!(matches!(result, Err(Error::Timeout(..))));
	}
}
