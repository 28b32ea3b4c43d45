use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::route::{auth::model::User, blog::model::Blog};

/// How many of a user's blogs a profile shows.
pub const LATEST_BLOGS: i64 = 6;

/// Trims a text field, treating a blank one as absent.
fn trimmed<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Option::<String>::deserialize(deserializer)?;

	Ok(value
		.map(|value| value.trim().to_owned())
		.filter(|value| !value.is_empty()))
}

/// What a user tells others about themselves. Every field is plain text.
#[derive(Debug, Clone, Serialize, JsonSchema, sqlx::FromRow)]
pub struct Profile {
	#[serde(skip)]
	pub user_id: Uuid,
	pub bio: Option<String>,
	pub profession: Option<String>,
	/// A personal website.
	pub website: Option<String>,
	/// A link to the user's X account.
	pub social_x: Option<String>,
	/// A link to the user's GitHub account.
	pub social_github: Option<String>,
	/// The time of the last edit.
	pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Profile {
	/// The profile of someone who has not filled theirs in yet.
	pub fn empty(user: &User) -> Self {
		Self {
			user_id: user.id,
			bio: None,
			profession: None,
			website: None,
			social_x: None,
			social_github: None,
			updated_at: user.created_at,
		}
	}
}

/// Replaces a profile. Omitted or blank fields are cleared, except `email`.
#[derive(Debug, Clone, Default, Deserialize, Validate, JsonSchema)]
pub struct ProfileInput {
	/// A new email address to log in with. Left unchanged when omitted.
	#[validate(email)]
	#[serde(default, deserialize_with = "trimmed")]
	pub email: Option<String>,
	#[validate(length(max = 2000))]
	#[serde(default, deserialize_with = "trimmed")]
	pub bio: Option<String>,
	#[validate(length(max = 100))]
	#[serde(default, deserialize_with = "trimmed")]
	pub profession: Option<String>,
	#[validate(url)]
	#[serde(default, deserialize_with = "trimmed")]
	pub website: Option<String>,
	#[validate(url)]
	#[serde(default, deserialize_with = "trimmed")]
	pub social_x: Option<String>,
	#[validate(url)]
	#[serde(default, deserialize_with = "trimmed")]
	pub social_github: Option<String>,
}

/// A user's profile page: who they are and what they wrote last.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ProfilePage {
	pub user: User,
	/// The email address, only shown to the user themselves.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	pub profile: Profile,
	/// The number of blogs the user has saved.
	pub total_blogs: i64,
	/// The user's most recent blogs, newest first.
	pub latest_blogs: Vec<Blog>,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct UserIdInput {
	pub user_id: Uuid,
}
