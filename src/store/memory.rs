use std::{cmp::Reverse, collections::HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{prepare, AccountStore, BlogStore, Error};
use crate::{
	guard::{self, Access},
	route::{
		auth::model::{Session, User},
		blog::model::{Blog, BlogInput, Page, Paginate},
		profile::model::{Profile, ProfileInput},
	},
};

struct Entry {
	blog: Blog,
	/// Insertion order, used to break ties between equal creation times.
	seq: u64,
}

#[derive(Default)]
struct Blogs {
	entries: HashMap<Uuid, Entry>,
	next_seq: u64,
}

#[derive(Default)]
struct Accounts {
	users: HashMap<Uuid, User>,
	sessions: HashMap<Uuid, Session>,
	profiles: HashMap<Uuid, Profile>,
}

/// A store that keeps everything in process memory.
///
/// Used when no database is configured, and by the tests. Each write holds the
/// write lock for the whole check-then-write.
#[derive(Default)]
pub struct Memory {
	blogs: RwLock<Blogs>,
	accounts: RwLock<Accounts>,
}

impl Memory {
	pub fn new() -> Self {
		Self::default()
	}
}

fn to_usize(value: i64) -> usize {
	usize::try_from(value).unwrap_or(usize::MAX)
}

#[async_trait]
impl BlogStore for Memory {
	async fn create(&self, owner: Uuid, input: BlogInput) -> Result<Blog, Error> {
		let input = prepare(input)?;
		let now = Utc::now();
		let blog = Blog {
			id: Uuid::new_v4(),
			owner_id: owner,
			title: input.title,
			body: input.body,
			created_at: now,
			updated_at: now,
		};

		let mut blogs = self.blogs.write().await;
		let seq = blogs.next_seq;

		blogs.next_seq += 1;
		blogs.entries.insert(
			blog.id,
			Entry {
				blog: blog.clone(),
				seq,
			},
		);

		Ok(blog)
	}

	async fn get(&self, id: Uuid) -> Result<Blog, Error> {
		self.blogs
			.read()
			.await
			.entries
			.get(&id)
			.map(|entry| entry.blog.clone())
			.ok_or(Error::NotFound(id))
	}

	async fn list(&self, owner: Uuid, paginate: &Paginate) -> Result<Page<Blog>, Error> {
		let blogs = self.blogs.read().await;
		let mut owned = blogs
			.entries
			.values()
			.filter(|entry| entry.blog.owner_id == owner)
			.collect::<Vec<_>>();

		owned.sort_by_key(|entry| Reverse((entry.blog.created_at, entry.seq)));

		let total = i64::try_from(owned.len()).unwrap_or(i64::MAX);
		let items = owned
			.into_iter()
			.skip(to_usize(paginate.offset()))
			.take(to_usize(paginate.limit()))
			.map(|entry| entry.blog.clone())
			.collect();

		Ok(Page::new(items, paginate, total))
	}

	async fn update(
		&self,
		id: Uuid,
		requester: Option<Uuid>,
		input: BlogInput,
	) -> Result<Blog, Error> {
		let mut blogs = self.blogs.write().await;
		let entry = blogs.entries.get_mut(&id).ok_or(Error::NotFound(id))?;

		if guard::authorize(requester, entry.blog.owner_id) == Access::Denied {
			return Err(Error::Ownership(id));
		}

		let input = prepare(input)?;

		entry.blog.title = input.title;
		entry.blog.body = input.body;
		entry.blog.updated_at = Utc::now();

		Ok(entry.blog.clone())
	}

	async fn delete(&self, id: Uuid, requester: Option<Uuid>) -> Result<(), Error> {
		let mut blogs = self.blogs.write().await;
		let owner = blogs
			.entries
			.get(&id)
			.map(|entry| entry.blog.owner_id)
			.ok_or(Error::NotFound(id))?;

		if guard::authorize(requester, owner) == Access::Denied {
			return Err(Error::Ownership(id));
		}

		blogs.entries.remove(&id);

		Ok(())
	}
}

#[async_trait]
impl AccountStore for Memory {
	async fn register(&self, user: User) -> Result<Session, Error> {
		let mut accounts = self.accounts.write().await;

		if accounts.users.values().any(|u| u.email == user.email) {
			return Err(Error::Taken { field: "email" });
		}

		if accounts.users.values().any(|u| u.username == user.username) {
			return Err(Error::Taken { field: "username" });
		}

		let session = Session {
			id: Uuid::new_v4(),
			user_id: user.id,
			created_at: Utc::now(),
		};

		accounts.users.insert(user.id, user);
		accounts.sessions.insert(session.id, session.clone());

		Ok(session)
	}

	async fn user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
		Ok(self
			.accounts
			.read()
			.await
			.users
			.values()
			.find(|user| user.email == email)
			.cloned())
	}

	async fn user_by_username(&self, username: &str) -> Result<Option<User>, Error> {
		Ok(self
			.accounts
			.read()
			.await
			.users
			.values()
			.find(|user| user.username == username)
			.cloned())
	}

	async fn create_session(&self, user_id: Uuid) -> Result<Session, Error> {
		let session = Session {
			id: Uuid::new_v4(),
			user_id,
			created_at: Utc::now(),
		};

		self.accounts
			.write()
			.await
			.sessions
			.insert(session.id, session.clone());

		Ok(session)
	}

	async fn user_by_session(&self, session_id: Uuid) -> Result<Option<User>, Error> {
		let accounts = self.accounts.read().await;

		Ok(accounts
			.sessions
			.get(&session_id)
			.and_then(|session| accounts.users.get(&session.user_id))
			.cloned())
	}

	async fn delete_session(&self, session_id: Uuid) -> Result<(), Error> {
		self.accounts.write().await.sessions.remove(&session_id);

		Ok(())
	}

	async fn profile(&self, user_id: Uuid) -> Result<(User, Profile), Error> {
		let accounts = self.accounts.read().await;
		let user = accounts
			.users
			.get(&user_id)
			.cloned()
			.ok_or(Error::UnknownUser(user_id))?;
		let profile = accounts
			.profiles
			.get(&user_id)
			.cloned()
			.unwrap_or_else(|| Profile::empty(&user));

		Ok((user, profile))
	}

	async fn update_profile(
		&self,
		user_id: Uuid,
		requester: Option<Uuid>,
		input: ProfileInput,
	) -> Result<(User, Profile), Error> {
		let mut accounts = self.accounts.write().await;

		if !accounts.users.contains_key(&user_id) {
			return Err(Error::UnknownUser(user_id));
		}

		if guard::authorize(requester, user_id) == Access::Denied {
			return Err(Error::Ownership(user_id));
		}

		if let Some(ref email) = input.email {
			if accounts
				.users
				.values()
				.any(|user| user.id != user_id && user.email == *email)
			{
				return Err(Error::Taken { field: "email" });
			}
		}

		let profile = Profile {
			user_id,
			bio: input.bio,
			profession: input.profession,
			website: input.website,
			social_x: input.social_x,
			social_github: input.social_github,
			updated_at: Utc::now(),
		};

		accounts.profiles.insert(user_id, profile.clone());

		let user = accounts
			.users
			.get_mut(&user_id)
			.ok_or(Error::UnknownUser(user_id))?;

		if let Some(email) = input.email {
			user.email = email;
		}

		Ok((user.clone(), profile))
	}
}

#[cfg(test)]
mod test {
	use std::sync::Arc;

	use super::*;

	fn input(title: &str, body: &str) -> BlogInput {
		BlogInput {
			title: title.into(),
			body: body.into(),
		}
	}

	fn user(email: &str, username: &str) -> User {
		User {
			id: Uuid::new_v4(),
			email: email.into(),
			password: Vec::new(),
			username: username.into(),
			created_at: Utc::now(),
		}
	}

	#[tokio::test]
	async fn test_create_then_get() {
		let store = Memory::new();
		let owner = Uuid::new_v4();

		let blog = store
			.create(owner, input("First", "<p>Hello</p>"))
			.await
			.unwrap();

		assert_eq!(blog.owner_id, owner);
		assert_eq!(blog.created_at, blog.updated_at);

		let fetched = store.get(blog.id).await.unwrap();

		assert_eq!(fetched.title, "First");
		assert_eq!(fetched.body, "<p>Hello</p>");
	}

	#[tokio::test]
	async fn test_create_stores_clean_body() {
		let store = Memory::new();

		let blog = store
			.create(
				Uuid::new_v4(),
				input("T", "<script>x</script><p>hello</p>"),
			)
			.await
			.unwrap();

		assert_eq!(store.get(blog.id).await.unwrap().body, "<p>hello</p>");
	}

	#[tokio::test]
	async fn test_unknown_blog_is_not_found() {
		let store = Memory::new();
		let id = Uuid::new_v4();

		assert!(matches!(store.get(id).await, Err(Error::NotFound(missing)) if missing == id));
		assert!(matches!(
			store.update(id, Some(Uuid::new_v4()), input("T", "b")).await,
			Err(Error::NotFound(..))
		));
		assert!(matches!(
			store.delete(id, Some(Uuid::new_v4())).await,
			Err(Error::NotFound(..))
		));
	}

	#[tokio::test]
	async fn test_list_is_newest_first_and_owner_scoped() {
		let store = Memory::new();
		let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

		for i in 0..3 {
			store
				.create(a, input(&format!("a{i}"), "<p>body</p>"))
				.await
				.unwrap();
		}

		store.create(b, input("b0", "<p>body</p>")).await.unwrap();

		let page = store.list(a, &Paginate::default()).await.unwrap();
		let titles = page
			.items
			.iter()
			.map(|blog| blog.title.as_str())
			.collect::<Vec<_>>();

		assert_eq!(titles, ["a2", "a1", "a0"]);
		assert_eq!(page.total, 3);
	}

	#[tokio::test]
	async fn test_list_pages() {
		let store = Memory::new();
		let owner = Uuid::new_v4();

		for i in 0..5 {
			store
				.create(owner, input(&format!("{i}"), "<p>body</p>"))
				.await
				.unwrap();
		}

		let page = store
			.list(owner, &Paginate { page: 2, size: 2 })
			.await
			.unwrap();

		assert_eq!(page.total, 5);
		assert_eq!(page.items.len(), 2);
		assert_eq!(page.items[0].title, "2");

		let past_end = store
			.list(owner, &Paginate { page: 9, size: 2 })
			.await
			.unwrap();

		assert!(past_end.items.is_empty());
		assert_eq!(past_end.total, 5);
	}

	#[tokio::test]
	async fn test_update_by_owner() {
		let store = Memory::new();
		let owner = Uuid::new_v4();
		let blog = store
			.create(owner, input("Old", "<p>old</p>"))
			.await
			.unwrap();

		let updated = store
			.update(blog.id, Some(owner), input("New", "<p>new</p>"))
			.await
			.unwrap();

		assert_eq!(updated.title, "New");
		assert_eq!(updated.created_at, blog.created_at);
		assert!(updated.updated_at >= blog.updated_at);
	}

	#[tokio::test]
	async fn test_non_owner_cannot_modify() {
		let store = Memory::new();
		let owner = Uuid::new_v4();
		let blog = store
			.create(owner, input("Mine", "<p>mine</p>"))
			.await
			.unwrap();

		for requester in [Some(Uuid::new_v4()), None] {
			assert!(matches!(
				store.update(blog.id, requester, input("Theirs", "<p>x</p>")).await,
				Err(Error::Ownership(..))
			));
			assert!(matches!(
				store.delete(blog.id, requester).await,
				Err(Error::Ownership(..))
			));
		}

		let unchanged = store.get(blog.id).await.unwrap();

		assert_eq!(unchanged.title, "Mine");
		assert_eq!(unchanged.updated_at, blog.updated_at);
	}

	#[tokio::test]
	async fn test_non_owner_with_empty_input_is_still_forbidden() {
		let store = Memory::new();
		let blog = store
			.create(Uuid::new_v4(), input("Mine", "<p>mine</p>"))
			.await
			.unwrap();

		assert!(matches!(
			store.update(blog.id, Some(Uuid::new_v4()), input("", "")).await,
			Err(Error::Ownership(..))
		));
	}

	#[tokio::test]
	async fn test_delete_then_get_is_not_found() {
		let store = Memory::new();
		let owner = Uuid::new_v4();
		let blog = store
			.create(owner, input("Gone", "<p>soon</p>"))
			.await
			.unwrap();

		store.delete(blog.id, Some(owner)).await.unwrap();

		assert!(matches!(store.get(blog.id).await, Err(Error::NotFound(..))));
		assert!(matches!(
			store.delete(blog.id, Some(owner)).await,
			Err(Error::NotFound(..))
		));
	}

	#[tokio::test]
	async fn test_concurrent_updates_keep_a_whole_write() {
		let store = Arc::new(Memory::new());
		let owner = Uuid::new_v4();
		let blog = store
			.create(owner, input("Start", "<p>start</p>"))
			.await
			.unwrap();

		let id = blog.id;
		let tasks = (0..8).map(|i| {
			let store = store.clone();

			tokio::spawn(async move {
				store
					.update(id, Some(owner), input(&format!("t{i}"), &format!("<p>b{i}</p>")))
					.await
			})
		});

		for task in tasks.collect::<Vec<_>>() {
			task.await.unwrap().unwrap();
		}

		let last = store.get(id).await.unwrap();
		let n = last.title.trim_start_matches('t');

		assert_eq!(last.body, format!("<p>b{n}</p>"));
	}

	#[tokio::test]
	async fn test_register_rejects_taken_fields() {
		let store = Memory::new();

		store.register(user("a@example.com", "alice")).await.unwrap();

		assert!(matches!(
			store.register(user("a@example.com", "other")).await,
			Err(Error::Taken { field: "email" })
		));
		assert!(matches!(
			store.register(user("b@example.com", "alice")).await,
			Err(Error::Taken { field: "username" })
		));
	}

	#[tokio::test]
	async fn test_lookup_by_username() {
		let store = Memory::new();
		let alice = user("a@example.com", "alice");
		let id = alice.id;

		store.register(alice).await.unwrap();

		assert_eq!(store.user_by_username("alice").await.unwrap().unwrap().id, id);
		assert!(store.user_by_username("a@example.com").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_profile_defaults_to_empty() {
		let store = Memory::new();
		let alice = user("a@example.com", "alice");
		let id = alice.id;

		store.register(alice).await.unwrap();

		let (user, profile) = store.profile(id).await.unwrap();

		assert_eq!(user.username, "alice");
		assert_eq!(profile.user_id, id);
		assert!(profile.bio.is_none());

		let unknown = Uuid::new_v4();

		assert!(matches!(
			store.profile(unknown).await,
			Err(Error::UnknownUser(missing)) if missing == unknown
		));
	}

	#[tokio::test]
	async fn test_only_the_user_edits_their_profile() {
		let store = Memory::new();
		let alice = user("a@example.com", "alice");
		let id = alice.id;

		store.register(alice).await.unwrap();

		let input = ProfileInput {
			bio: Some("Baker".into()),
			..ProfileInput::default()
		};

		for requester in [Some(Uuid::new_v4()), None] {
			assert!(matches!(
				store.update_profile(id, requester, input.clone()).await,
				Err(Error::Ownership(..))
			));
		}

		assert!(store.profile(id).await.unwrap().1.bio.is_none());

		let (_, profile) = store.update_profile(id, Some(id), input).await.unwrap();

		assert_eq!(profile.bio.as_deref(), Some("Baker"));
		assert!(matches!(
			store
				.update_profile(Uuid::new_v4(), Some(id), ProfileInput::default())
				.await,
			Err(Error::UnknownUser(..))
		));
	}

	#[tokio::test]
	async fn test_profile_email_must_be_free() {
		let store = Memory::new();
		let alice = user("a@example.com", "alice");
		let bob = user("b@example.com", "bob");
		let id = bob.id;

		store.register(alice).await.unwrap();
		store.register(bob).await.unwrap();

		let taken = ProfileInput {
			email: Some("a@example.com".into()),
			bio: Some("Hi".into()),
			..ProfileInput::default()
		};

		assert!(matches!(
			store.update_profile(id, Some(id), taken).await,
			Err(Error::Taken { field: "email" })
		));
		assert!(store.profile(id).await.unwrap().1.bio.is_none());

		// keeping your own email is fine
		let same = ProfileInput {
			email: Some("b@example.com".into()),
			..ProfileInput::default()
		};

		assert!(store.update_profile(id, Some(id), same).await.is_ok());

		let moved = ProfileInput {
			email: Some("bob@example.com".into()),
			..ProfileInput::default()
		};
		let (user, _) = store.update_profile(id, Some(id), moved).await.unwrap();

		assert_eq!(user.email, "bob@example.com");
		assert!(store.user_by_email("b@example.com").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_sessions_resolve_until_deleted() {
		let store = Memory::new();
		let alice = user("a@example.com", "alice");
		let id = alice.id;

		let session = store.register(alice).await.unwrap();

		assert_eq!(store.user_by_session(session.id).await.unwrap().unwrap().id, id);

		let second = store.create_session(id).await.unwrap();

		store.delete_session(session.id).await.unwrap();

		assert!(store.user_by_session(session.id).await.unwrap().is_none());
		assert!(store.user_by_session(second.id).await.unwrap().is_some());
		assert_eq!(
			store.user_by_email("a@example.com").await.unwrap().unwrap().id,
			id
		);
	}
}
