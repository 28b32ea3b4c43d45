use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};

use crate::AppState;

pub mod model;
pub mod route;

/// The draft generation route, kept apart so it can be rate limited on its own.
pub fn draft_routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new().api_route("/generate", post_with(generate_draft, generate_draft_docs))
}

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route("/", post_with(create_blog, create_blog_docs))
		.api_route("/me", get_with(get_user_blogs, get_user_blogs_docs))
		.api_route(
			"/:id",
			get_with(get_blog, get_blog_docs)
				.put_with(update_blog, update_blog_docs)
				.delete_with(delete_blog, delete_blog_docs),
		)
}
