pub use crate::route::model::{IdInput, Page, Paginate};

use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn not_blank(value: &str) -> Result<(), ValidationError> {
	if value.trim().is_empty() {
		return Err(ValidationError::new("empty"));
	}

	Ok(())
}

/// A single blog post, owned by the user who saved it.
#[model]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, Validate, sqlx::FromRow)]
pub struct Blog {
	/// The unique identifier of the blog.
	#[serde(skip_deserializing)]
	pub id: Uuid,
	/// The user that owns the blog. Only they may edit or delete it.
	#[serde(skip_deserializing)]
	pub owner_id: Uuid,
	/// The title of the blog.
	#[validate(length(max = 255), custom(function = "not_blank"))]
	pub title: String,
	/// The body of the blog as HTML. Unsafe markup is removed before it is stored.
	#[validate(length(max = 200_000), custom(function = "not_blank"))]
	pub body: String,
	/// The creation time of the blog.
	#[serde(skip_deserializing)]
	pub created_at: chrono::DateTime<chrono::Utc>,
	/// The time of the last edit, or the creation time if it was never edited.
	#[serde(skip_deserializing)]
	pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A generated draft. It is not saved until it is sent back through `POST /blogs`.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Draft {
	/// A suggested title, taken from the topic.
	pub title: String,
	/// The cleaned HTML body of the draft.
	pub body: String,
	pub word_count: usize,
	/// The estimated reading time, at 200 words per minute.
	pub read_time_minutes: usize,
}
