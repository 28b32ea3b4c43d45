#![warn(clippy::pedantic)]

mod config;
mod error;
mod extract;
mod generate;
mod guard;
mod openapi;
mod ratelimit;
mod route;
mod sanitize;
mod session;
mod store;
mod trace;

use std::{net::SocketAddr, sync::Arc};

use argon2::Argon2;

pub type Database = sqlx::Pool<sqlx::Postgres>;
pub type AppState = State;

pub type Blogs = Arc<dyn store::BlogStore>;
pub type Accounts = Arc<dyn store::AccountStore>;
pub type Writer = Arc<dyn generate::Generator>;

/// The shared application state.
///
/// Stores and the writer sit behind trait objects, so the same handlers run
/// against Postgres in production and the in-memory store in tests.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub blogs: Blogs,
	pub accounts: Accounts,
	pub writer: Writer,
	pub hasher: Argon2<'static>,
}

#[tokio::main]
async fn main() {
	dotenvy::dotenv().ok();

	let config = config::Config::from_env().expect("invalid configuration");
	let _guard = trace::init_tracing_subscriber(config.otlp_endpoint.as_deref())
		.expect("failed to initialize tracing");

	let (blogs, accounts): (Blogs, Accounts) = if let Some(ref url) = config.database_url {
		let postgres = store::Postgres::connect(url)
			.await
			.expect("failed to connect to database");

		postgres.migrate().await.expect("failed to run migrations");

		let postgres = Arc::new(postgres);
		let blogs: Blogs = postgres.clone();
		let accounts: Accounts = postgres;

		(blogs, accounts)
	} else {
		tracing::warn!("DATABASE_URL is not set, blogs and accounts are kept in memory");

		let memory = Arc::new(store::Memory::new());
		let blogs: Blogs = memory.clone();
		let accounts: Accounts = memory;

		(blogs, accounts)
	};

	let writer = generate::Gemini::new(config.gemini.clone()).expect("failed to build http client");

	let state = State {
		blogs,
		accounts,
		writer: Arc::new(writer),
		hasher: Argon2::default(),
	};

	let limits = config.rate_limit.then(ratelimit::Limits::new);

	if let Some(ref limits) = limits {
		limits.cleanup_old_limits();
	}

	let app = route::router(state, limits.as_ref());

	let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
		.await
		.expect("failed to bind to port");

	tracing::info!(host = %config.host, port = config.port, "listening");

	axum::serve(
		listener,
		app.into_make_service_with_connect_info::<SocketAddr>(),
	)
	.await
	.expect("server error");
}
