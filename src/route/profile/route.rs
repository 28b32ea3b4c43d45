use axum::extract::State;
use macros::route;

use crate::{
	error::AppError,
	extract::{Json, Path, Session},
	openapi::tag,
	route::{auth::model::User, model::Paginate},
	Accounts, AppState, Blogs,
};

use super::model;

/// Puts a profile together with the user's blog count and latest blogs.
async fn page(
	blogs: &Blogs,
	user: User,
	profile: model::Profile,
	own: bool,
) -> Result<model::ProfilePage, AppError> {
	let latest = blogs
		.list(
			user.id,
			&Paginate {
				page: 1,
				size: model::LATEST_BLOGS,
			},
		)
		.await?;

	Ok(model::ProfilePage {
		email: own.then(|| user.email.clone()),
		user,
		profile,
		total_blogs: latest.total,
		latest_blogs: latest.items,
	})
}

/// Get own profile
/// Returns the authenticated user's profile, including their email address.
#[route(tag = tag::PROFILE)]
pub async fn get_my_profile(
	State(state): State<AppState>,
	session: Session,
) -> Result<Json<model::ProfilePage>, AppError> {
	let (user, profile) = state.accounts.profile(session.user.id).await?;

	Ok(Json(page(&state.blogs, user, profile, true).await?))
}

/// Get profile
/// Returns a user's public profile with their latest blogs.
#[route(
	tag = tag::PROFILE,
	response(status = 200, description = "The profile.", shape = "Json<model::ProfilePage>"),
	response(status = 404, description = "There is no such user.")
)]
pub async fn get_profile(
	State(state): State<AppState>,
	Path(path): Path<model::UserIdInput>,
) -> Result<Json<model::ProfilePage>, AppError> {
	let (user, profile) = state.accounts.profile(path.user_id).await?;

	Ok(Json(page(&state.blogs, user, profile, false).await?))
}

/// Update profile
/// Replaces the authenticated user's profile. Changing the email to one that
/// another account uses is rejected.
#[route(
	tag = tag::PROFILE,
	response(status = 200, description = "The updated profile.", shape = "Json<model::ProfilePage>"),
	response(status = 409, description = "The email belongs to another account.")
)]
pub async fn update_my_profile(
	State(accounts): State<Accounts>,
	State(blogs): State<Blogs>,
	session: Session,
	Json(input): Json<model::ProfileInput>,
) -> Result<Json<model::ProfilePage>, AppError> {
	let id = session.user.id;
	let (user, profile) = accounts.update_profile(id, Some(id), input).await?;

	tracing::info!(user = %id, "updated profile");

	Ok(Json(page(&blogs, user, profile, true).await?))
}
