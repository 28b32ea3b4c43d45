use aide::OperationInput;
use axum::{
	extract::{FromRef, FromRequestParts},
	http::{header, request},
};
use uuid::Uuid;

use crate::{error::AppError, openapi::SECURITY_SCHEME_SESSION, route::auth, session, Accounts};

/// Extracts the session and related user from the request.
///
/// If there is no session cookie, a [`auth::Error::NoSessionCookie`] is returned.
/// If the session is unknown, a [`auth::Error::InvalidSessionCookie`] is returned.
///
/// ```rust
/// async fn route(session: Session) {
///   println!("{:?}", session.user);
/// }
/// ```
#[derive(Debug)]
pub struct Session {
	pub id: Uuid,
	pub user: auth::model::User,
}

/// Like [`Session`], but a missing or unknown session is `None` instead of a rejection.
///
/// Used where the decision belongs to someone else, such as the ownership check
/// on blog writes. Database failures are still rejected.
#[derive(Debug)]
pub struct MaybeSession(pub Option<Session>);

impl MaybeSession {
	pub fn user_id(&self) -> Option<Uuid> {
		self.0.as_ref().map(|session| session.user.id)
	}
}

fn session_id(parts: &request::Parts) -> Result<Uuid, auth::Error> {
	let cookie = parts
		.headers
		.get_all(header::COOKIE)
		.into_iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(cookie::Cookie::split_parse)
		.filter_map(Result::ok)
		.find(|cookie| cookie.name() == session::COOKIE_NAME)
		.ok_or(auth::Error::NoSessionCookie)?;

	Uuid::parse_str(cookie.value()).map_err(|_| auth::Error::InvalidSessionCookie)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
	Accounts: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let id = session_id(parts)?;
		let user = Accounts::from_ref(state)
			.user_by_session(id)
			.await?
			.ok_or(auth::Error::InvalidSessionCookie)?;

		Ok(Self { id, user })
	}
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeSession
where
	Accounts: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let Ok(id) = session_id(parts) else {
			return Ok(Self(None));
		};

		let user = Accounts::from_ref(state).user_by_session(id).await?;

		Ok(Self(user.map(|user| Session { id, user })))
	}
}

fn require_session(operation: &mut aide::openapi::Operation) {
	operation.security.push(
		[(SECURITY_SCHEME_SESSION.to_string(), Vec::new())]
			.into_iter()
			.collect(),
	);
}

impl OperationInput for Session {
	/// Adds a session cookie requirement to the `OpenAPI` operation.
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		require_session(operation);
	}
}

impl OperationInput for MaybeSession {
	/// Writes are still checked against the owner, so the operation is documented
	/// as needing a session even though the extractor itself never rejects.
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		require_session(operation);
	}
}
