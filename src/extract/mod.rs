//! Extractors that reject with [`AppError`], so every bad request gets the same body.

mod session;

pub use session::{MaybeSession, Session};

use aide::OperationIo;
use axum::{
	extract::{FromRequest, FromRequestParts, Request},
	http::request,
	response::{IntoResponse, Response},
};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;

fn validated<T: Validate>(value: T) -> Result<T, AppError> {
	value.validate()?;

	Ok(value)
}

/// A JSON body that matches the schema of `T` and passes its validation rules.
///
/// Also used as the response type of handlers that return JSON.
#[derive(OperationIo)]
#[aide(
	input_with = "axum_jsonschema::Json<T>",
	output_with = "axum_jsonschema::Json<T>",
	json_schema
)]
pub struct Json<T>(pub T);

impl<T> IntoResponse for Json<T>
where
	T: serde::Serialize,
{
	fn into_response(self) -> Response {
		axum::Json(self.0).into_response()
	}
}

#[axum::async_trait]
impl<T, S> FromRequest<S> for Json<T>
where
	T: DeserializeOwned + Validate + JsonSchema + 'static,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let Unchecked(value) = Unchecked::<T>::from_request(req, state).await?;

		Ok(Self(validated(value)?))
	}
}

/// A JSON body that only has to match the schema of `T`.
///
/// For writes where the caller's access is decided first: the content rules run
/// later, once the caller is known to be allowed to write at all.
#[derive(OperationIo)]
#[aide(input_with = "axum_jsonschema::Json<T>", json_schema)]
pub struct Unchecked<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for Unchecked<T>
where
	T: DeserializeOwned + JsonSchema + 'static,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let body = axum_jsonschema::Json::<T>::from_request(req, state).await?;

		Ok(Self(body.0))
	}
}

/// Query parameters that pass their validation rules, such as [`Paginate`](crate::route::model::Paginate).
#[derive(OperationIo)]
#[aide(input_with = "axum::extract::Query<T>", json_schema)]
pub struct Query<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Query<T>
where
	T: DeserializeOwned + Validate,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let axum::extract::Query(value) =
			axum::extract::Query::<T>::from_request_parts(parts, state).await?;

		Ok(Self(validated(value)?))
	}
}

/// Path parameters, such as the [`IdInput`](crate::route::model::IdInput) of `/blogs/:id`.
#[derive(OperationIo)]
#[aide(input_with = "axum::extract::Path<T>", json_schema)]
pub struct Path<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Path<T>
where
	T: DeserializeOwned + Validate + Send,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let axum::extract::Path(value) =
			axum::extract::Path::<T>::from_request_parts(parts, state).await?;

		Ok(Self(validated(value)?))
	}
}
