use aide::axum::IntoApiResponse;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use macros::route;

use crate::{
	error::AppError,
	extract::{Json, MaybeSession, Path, Query, Session, Unchecked},
	generate::GenerationRequest,
	openapi::tag,
	sanitize,
	store::MAX_TITLE_CHARS,
	Blogs, Writer,
};

use super::model;

/// Generate draft
/// Writes a draft blog about a topic. The draft is cleaned of unsafe markup but
/// is not saved; review and edit it, then save it with `POST /blogs`.
#[route(
	tag = tag::BLOG,
	response(status = 200, description = "The generated draft.", shape = "Json<model::Draft>"),
	response(status = 504, description = "The writer did not respond in time."),
	response(status = 502, description = "The writer could not produce a draft.")
)]
pub async fn generate_draft(
	State(writer): State<Writer>,
	session: Session,
	Json(request): Json<GenerationRequest>,
) -> Result<Json<model::Draft>, AppError> {
	let generated = writer.generate(&request).await?;
	let body = sanitize::clean(&generated.text);
	let word_count = sanitize::word_count(&body);

	tracing::info!(
		user = %session.user.id,
		word_count,
		monotonic_counter.drafts_generated = 1_u64,
		"generated draft"
	);

	Ok(Json(model::Draft {
		title: request.topic.trim().chars().take(MAX_TITLE_CHARS).collect(),
		body,
		word_count,
		read_time_minutes: sanitize::read_time_minutes(word_count),
	}))
}

/// Save blog
/// Saves a new blog owned by the authenticated user. Unsafe markup is removed from
/// the body before it is stored.
#[route(tag = tag::BLOG)]
pub async fn create_blog(
	State(blogs): State<Blogs>,
	session: Session,
	Json(input): Json<model::BlogInput>,
) -> Result<Json<model::Blog>, AppError> {
	let blog = blogs.create(session.user.id, input).await?;

	tracing::info!(
		blog = %blog.id,
		owner = %blog.owner_id,
		monotonic_counter.blogs_created = 1_u64,
		"saved blog"
	);

	Ok(Json(blog))
}

/// Get user blogs
/// Returns a page of the authenticated user's blogs, newest first.
#[route(tag = tag::BLOG)]
pub async fn get_user_blogs(
	State(blogs): State<Blogs>,
	session: Session,
	Query(paginate): Query<model::Paginate>,
) -> Result<Json<model::Page<model::Blog>>, AppError> {
	let page = blogs.list(session.user.id, &paginate).await?;

	Ok(Json(page))
}

/// Get blog
/// Returns a single blog. Blogs are public, so no session is needed.
#[route(tag = tag::BLOG)]
pub async fn get_blog(
	State(blogs): State<Blogs>,
	Path(path): Path<model::IdInput>,
) -> Result<Json<model::Blog>, AppError> {
	let blog = blogs.get(path.id).await?;

	Ok(Json(blog))
}

/// Update blog
/// Replaces the title and body of a blog. Only the owner may do this; the new
/// content is checked after ownership, so a non-owner always gets a 403.
#[route(
	tag = tag::BLOG,
	response(status = 200, description = "The updated blog.", shape = "Json<model::Blog>"),
	response(status = 403, description = "The blog belongs to someone else.")
)]
pub async fn update_blog(
	State(blogs): State<Blogs>,
	session: MaybeSession,
	Path(path): Path<model::IdInput>,
	Unchecked(input): Unchecked<model::BlogInput>,
) -> Result<Json<model::Blog>, AppError> {
	let blog = blogs.update(path.id, session.user_id(), input).await?;

	tracing::info!(blog = %blog.id, "updated blog");

	Ok(Json(blog))
}

/// Delete blog
/// Deletes a blog. Only the owner may do this.
#[route(
	tag = tag::BLOG,
	response(status = 204, description = "The blog was deleted."),
	response(status = 403, description = "The blog belongs to someone else.")
)]
pub async fn delete_blog(
	State(blogs): State<Blogs>,
	session: MaybeSession,
	Path(path): Path<model::IdInput>,
) -> Result<impl IntoApiResponse, AppError> {
	blogs.delete(path.id, session.user_id()).await?;

	tracing::info!(blog = %path.id, "deleted blog");

	Ok(StatusCode::NO_CONTENT.into_response())
}
