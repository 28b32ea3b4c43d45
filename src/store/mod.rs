//! Persistence for blogs and accounts.
//!
//! Both backends enforce the same rules: bodies are cleaned before they are written,
//! and every update or delete is checked against the blog's owner inside the same
//! critical section as the write.

use async_trait::async_trait;
use axum::http::StatusCode;
use uuid::Uuid;

use crate::{
	error::{self, ErrorShape},
	route::{
		auth::model::{Session, User},
		blog::model::{Blog, BlogInput, Page, Paginate},
		profile::model::{Profile, ProfileInput},
	},
	sanitize,
};

pub mod memory;
pub mod postgres;

pub use memory::Memory;
pub use postgres::Postgres;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown blog {0}")]
	NotFound(Uuid),
	#[error("unknown user {0}")]
	UnknownUser(Uuid),
	#[error("requester may not modify {0}")]
	Ownership(Uuid),
	#[error("{field} is empty after cleaning")]
	Validation { field: &'static str },
	#[error("{field} is longer than {max} characters")]
	TooLong { field: &'static str, max: usize },
	#[error("{field} already taken")]
	Taken { field: &'static str },
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
}

impl ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::NotFound(..) | Self::UnknownUser(..) => StatusCode::NOT_FOUND,
			Self::Ownership(..) => StatusCode::FORBIDDEN,
			Self::Validation { .. } | Self::TooLong { .. } => StatusCode::BAD_REQUEST,
			Self::Taken { .. } => StatusCode::CONFLICT,
			Self::Database(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn errors(&self) -> Vec<error::Message> {
		match self {
			Self::NotFound(blog) => error::Message::new("unknown_blog")
				.detail("blog", blog.to_string())
				.into_vec(),
			Self::UnknownUser(user) => error::Message::new("unknown_user")
				.detail("user", user.to_string())
				.into_vec(),
			// the blog id is not echoed back to callers who cannot touch it
			Self::Ownership(..) => error::Message::new("not_permitted").into_vec(),
			Self::Validation { field } => error::Message::new("empty").field(*field).into_vec(),
			Self::TooLong { field, max } => error::Message::new("too_long")
				.field(*field)
				.detail("max", *max)
				.into_vec(),
			Self::Taken { field } => error::Message::new("already_taken").field(*field).into_vec(),
			Self::Database(..) => Vec::new(),
		}
	}
}

/// Storage for blogs.
#[async_trait]
pub trait BlogStore: Send + Sync {
	/// Cleans and saves a new blog owned by `owner`.
	async fn create(&self, owner: Uuid, input: BlogInput) -> Result<Blog, Error>;

	/// Fetches a single blog. Anyone may read any blog.
	async fn get(&self, id: Uuid) -> Result<Blog, Error>;

	/// Lists the blogs owned by `owner`, newest first.
	async fn list(&self, owner: Uuid, paginate: &Paginate) -> Result<Page<Blog>, Error>;

	/// Replaces the title and body of a blog, if `requester` owns it.
	async fn update(
		&self,
		id: Uuid,
		requester: Option<Uuid>,
		input: BlogInput,
	) -> Result<Blog, Error>;

	/// Deletes a blog, if `requester` owns it.
	async fn delete(&self, id: Uuid, requester: Option<Uuid>) -> Result<(), Error>;
}

/// Storage for users and their sessions.
#[async_trait]
pub trait AccountStore: Send + Sync {
	/// Saves a new user and opens their first session.
	///
	/// Returns [`Error::Taken`] if the email or username is in use.
	async fn register(&self, user: User) -> Result<Session, Error>;

	async fn user_by_email(&self, email: &str) -> Result<Option<User>, Error>;

	async fn user_by_username(&self, username: &str) -> Result<Option<User>, Error>;

	async fn create_session(&self, user_id: Uuid) -> Result<Session, Error>;

	/// Resolves a session to its user, or `None` if the session does not exist.
	async fn user_by_session(&self, session_id: Uuid) -> Result<Option<User>, Error>;

	async fn delete_session(&self, session_id: Uuid) -> Result<(), Error>;

	/// Fetches a user with their profile. A user who never filled in a profile
	/// gets an empty one.
	async fn profile(&self, user_id: Uuid) -> Result<(User, Profile), Error>;

	/// Replaces the profile of `user_id` and, if given, their email, if
	/// `requester` is that user.
	///
	/// Returns [`Error::Taken`] if another account already uses the email.
	async fn update_profile(
		&self,
		user_id: Uuid,
		requester: Option<Uuid>,
		input: ProfileInput,
	) -> Result<(User, Profile), Error>;
}

pub const MAX_TITLE_CHARS: usize = 255;
pub const MAX_BODY_CHARS: usize = 200_000;

/// Cleans a blog before it is written, rejecting it if nothing is left or it is
/// too long.
///
/// A body that was only a `<script>` is empty after cleaning, so the check has to
/// happen here rather than on the raw input. Updates call this only after the
/// ownership check.
pub(crate) fn prepare(input: BlogInput) -> Result<BlogInput, Error> {
	let title = input.title.trim().to_owned();
	let body = sanitize::clean(&input.body);

	if title.is_empty() {
		return Err(Error::Validation { field: "title" });
	}

	if title.chars().count() > MAX_TITLE_CHARS {
		return Err(Error::TooLong {
			field: "title",
			max: MAX_TITLE_CHARS,
		});
	}

	if sanitize::plain_text(&body).trim().is_empty() {
		return Err(Error::Validation { field: "body" });
	}

	if body.chars().count() > MAX_BODY_CHARS {
		return Err(Error::TooLong {
			field: "body",
			max: MAX_BODY_CHARS,
		});
	}

	Ok(BlogInput { title, body })
}
