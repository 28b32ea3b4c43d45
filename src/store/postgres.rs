use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::{prepare, AccountStore, BlogStore, Error};
use crate::{
	guard::{self, Access},
	route::{
		auth::model::{Session, User},
		blog::model::{Blog, BlogInput, Page, Paginate},
		profile::model::{Profile, ProfileInput},
	},
	Database,
};

/// A store backed by a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct Postgres {
	pool: Database,
}

impl Postgres {
	pub fn new(pool: Database) -> Self {
		Self { pool }
	}

	pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
		let pool = PgPoolOptions::new().connect(url).await?;

		Ok(Self::new(pool))
	}

	/// Applies the migrations under `migrations/` that have not run yet.
	pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
		sqlx::migrate!().run(&self.pool).await
	}

	/// Locks the blog row for the rest of the transaction and checks its owner.
	async fn lock_owned(
		tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
		id: Uuid,
		requester: Option<Uuid>,
	) -> Result<(), Error> {
		let owner =
			sqlx::query_scalar::<_, Uuid>("SELECT owner_id FROM blog WHERE id = $1 FOR UPDATE")
				.bind(id)
				.fetch_optional(&mut **tx)
				.await?
				.ok_or(Error::NotFound(id))?;

		match guard::authorize(requester, owner) {
			Access::Allowed => Ok(()),
			Access::Denied => Err(Error::Ownership(id)),
		}
	}
}

/// Maps unique violations on the user table to [`Error::Taken`].
fn taken(error: sqlx::Error) -> Error {
	if let sqlx::Error::Database(ref database) = error {
		match database.constraint() {
			Some("user_email_key") => return Error::Taken { field: "email" },
			Some("user_username_key") => return Error::Taken { field: "username" },
			_ => {}
		}
	}

	Error::Database(error)
}

#[async_trait]
impl BlogStore for Postgres {
	async fn create(&self, owner: Uuid, input: BlogInput) -> Result<Blog, Error> {
		let input = prepare(input)?;

		let blog = sqlx::query_as::<_, Blog>(
			"INSERT INTO blog (owner_id, title, body) VALUES ($1, $2, $3) RETURNING *",
		)
		.bind(owner)
		.bind(input.title)
		.bind(input.body)
		.fetch_one(&self.pool)
		.await?;

		Ok(blog)
	}

	async fn get(&self, id: Uuid) -> Result<Blog, Error> {
		sqlx::query_as::<_, Blog>("SELECT * FROM blog WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.pool)
			.await?
			.ok_or(Error::NotFound(id))
	}

	async fn list(&self, owner: Uuid, paginate: &Paginate) -> Result<Page<Blog>, Error> {
		let items = sqlx::query_as::<_, Blog>(
			r"
				SELECT * FROM blog
				WHERE owner_id = $1
				ORDER BY created_at DESC, id DESC
				LIMIT $2 OFFSET $3
			",
		)
		.bind(owner)
		.bind(paginate.limit())
		.bind(paginate.offset())
		.fetch_all(&self.pool)
		.await?;

		let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blog WHERE owner_id = $1")
			.bind(owner)
			.fetch_one(&self.pool)
			.await?;

		Ok(Page::new(items, paginate, total))
	}

	async fn update(
		&self,
		id: Uuid,
		requester: Option<Uuid>,
		input: BlogInput,
	) -> Result<Blog, Error> {
		let mut tx = self.pool.begin().await?;

		Self::lock_owned(&mut tx, id, requester).await?;

		let input = prepare(input)?;
		let blog = sqlx::query_as::<_, Blog>(
			r"
				UPDATE blog SET title = $1, body = $2, updated_at = clock_timestamp()
				WHERE id = $3
				RETURNING *
			",
		)
		.bind(input.title)
		.bind(input.body)
		.bind(id)
		.fetch_one(&mut *tx)
		.await?;

		tx.commit().await?;

		Ok(blog)
	}

	async fn delete(&self, id: Uuid, requester: Option<Uuid>) -> Result<(), Error> {
		let mut tx = self.pool.begin().await?;

		Self::lock_owned(&mut tx, id, requester).await?;

		sqlx::query("DELETE FROM blog WHERE id = $1")
			.bind(id)
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;

		Ok(())
	}
}

#[async_trait]
impl AccountStore for Postgres {
	async fn register(&self, user: User) -> Result<Session, Error> {
		let mut tx = self.pool.begin().await?;

		sqlx::query(r#"INSERT INTO "user" (id, email, username, password) VALUES ($1, $2, $3, $4)"#)
			.bind(user.id)
			.bind(&user.email)
			.bind(&user.username)
			.bind(&user.password)
			.execute(&mut *tx)
			.await
			.map_err(taken)?;

		let session = sqlx::query_as::<_, Session>(
			"INSERT INTO session (user_id) VALUES ($1) RETURNING *",
		)
		.bind(user.id)
		.fetch_one(&mut *tx)
		.await?;

		tx.commit().await?;

		Ok(session)
	}

	async fn user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
		let user = sqlx::query_as::<_, User>(r#"SELECT * FROM "user" WHERE email = $1"#)
			.bind(email)
			.fetch_optional(&self.pool)
			.await?;

		Ok(user)
	}

	async fn user_by_username(&self, username: &str) -> Result<Option<User>, Error> {
		let user = sqlx::query_as::<_, User>(r#"SELECT * FROM "user" WHERE username = $1"#)
			.bind(username)
			.fetch_optional(&self.pool)
			.await?;

		Ok(user)
	}

	async fn create_session(&self, user_id: Uuid) -> Result<Session, Error> {
		let session = sqlx::query_as::<_, Session>(
			"INSERT INTO session (user_id) VALUES ($1) RETURNING *",
		)
		.bind(user_id)
		.fetch_one(&self.pool)
		.await?;

		Ok(session)
	}

	async fn user_by_session(&self, session_id: Uuid) -> Result<Option<User>, Error> {
		let user = sqlx::query_as::<_, User>(
			r#"
				SELECT * FROM "user" WHERE id = (
					SELECT user_id FROM session WHERE id = $1
				)
			"#,
		)
		.bind(session_id)
		.fetch_optional(&self.pool)
		.await?;

		Ok(user)
	}

	async fn delete_session(&self, session_id: Uuid) -> Result<(), Error> {
		sqlx::query("DELETE FROM session WHERE id = $1")
			.bind(session_id)
			.execute(&self.pool)
			.await?;

		Ok(())
	}

	async fn profile(&self, user_id: Uuid) -> Result<(User, Profile), Error> {
		let user = sqlx::query_as::<_, User>(r#"SELECT * FROM "user" WHERE id = $1"#)
			.bind(user_id)
			.fetch_optional(&self.pool)
			.await?
			.ok_or(Error::UnknownUser(user_id))?;

		let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profile WHERE user_id = $1")
			.bind(user_id)
			.fetch_optional(&self.pool)
			.await?
			.unwrap_or_else(|| Profile::empty(&user));

		Ok((user, profile))
	}

	async fn update_profile(
		&self,
		user_id: Uuid,
		requester: Option<Uuid>,
		input: ProfileInput,
	) -> Result<(User, Profile), Error> {
		let mut tx = self.pool.begin().await?;

		let mut user =
			sqlx::query_as::<_, User>(r#"SELECT * FROM "user" WHERE id = $1 FOR UPDATE"#)
				.bind(user_id)
				.fetch_optional(&mut *tx)
				.await?
				.ok_or(Error::UnknownUser(user_id))?;

		if guard::authorize(requester, user.id) == Access::Denied {
			return Err(Error::Ownership(user_id));
		}

		if let Some(email) = input.email {
			sqlx::query(r#"UPDATE "user" SET email = $1 WHERE id = $2"#)
				.bind(&email)
				.bind(user_id)
				.execute(&mut *tx)
				.await
				.map_err(taken)?;

			user.email = email;
		}

		let profile = sqlx::query_as::<_, Profile>(
			r"
				INSERT INTO profile (user_id, bio, profession, website, social_x, social_github)
				VALUES ($1, $2, $3, $4, $5, $6)
				ON CONFLICT (user_id) DO UPDATE SET
					bio = EXCLUDED.bio,
					profession = EXCLUDED.profession,
					website = EXCLUDED.website,
					social_x = EXCLUDED.social_x,
					social_github = EXCLUDED.social_github,
					updated_at = clock_timestamp()
				RETURNING *
			",
		)
		.bind(user_id)
		.bind(input.bio)
		.bind(input.profession)
		.bind(input.website)
		.bind(input.social_x)
		.bind(input.social_github)
		.fetch_one(&mut *tx)
		.await?;

		tx.commit().await?;

		Ok((user, profile))
	}
}
