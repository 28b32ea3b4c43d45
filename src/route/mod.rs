use std::sync::Arc;

use aide::{axum::ApiRouter, openapi::OpenApi};
use axum::{body::Body, extract::Request, Extension, Router};
use tower::ServiceBuilder;
use tower_http::{
	compression::CompressionLayer,
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	trace::TraceLayer,
};

use crate::{openapi, ratelimit::Limits, AppState};

pub mod auth;
pub mod blog;
pub mod docs;
pub mod model;
pub mod profile;

/// Builds the full application: API routes, documentation and middleware.
///
/// When `limits` is given, every route is rate limited per client, with the
/// stricter limit on authentication and draft generation.
pub fn router(state: AppState, limits: Option<&Limits>) -> Router {
	aide::gen::extract_schemas(true);

	let mut api = OpenApi::default();

	let (mut auth, mut drafts, mut blogs) = (auth::routes(), blog::draft_routes(), blog::routes());
	let mut profiles = profile::routes();

	if let Some(limits) = limits {
		auth = auth.layer(limits.secure_layer());
		drafts = drafts.layer(limits.secure_layer());
		blogs = blogs.layer(limits.default_layer());
		profiles = profiles.layer(limits.default_layer());
	}

	ApiRouter::new()
		.nest("/auth", auth)
		.nest("/blogs", drafts.merge(blogs))
		.nest("/profile", profiles)
		.nest("/docs", docs::routes())
		.finish_api_with(&mut api, openapi::docs)
		.layer(Extension(Arc::new(api)))
		.layer(
			ServiceBuilder::new()
				.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
				.layer(
					TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
						let request_id = request
							.headers()
							.get("x-request-id")
							.and_then(|value| value.to_str().ok())
							.unwrap_or_default();

						tracing::info_span!(
							"request",
							method = %request.method(),
							uri = %request.uri(),
							request_id,
						)
					}),
				)
				.layer(PropagateRequestIdLayer::x_request_id())
				.layer(CompressionLayer::new()),
		)
		.with_state(state)
}
