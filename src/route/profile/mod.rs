use aide::axum::{routing::get_with, ApiRouter};

use crate::AppState;

pub mod model;
pub mod route;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/",
			get_with(get_my_profile, get_my_profile_docs)
				.put_with(update_my_profile, update_my_profile_docs),
		)
		.api_route("/:user_id", get_with(get_profile, get_profile_docs))
}

#[cfg(test)]
mod test {
	use crate::test::*;

	async fn user_id(app: &TestServer) -> String {
		app.get("/auth/me").await.json::<Value>()["id"]
			.as_str()
			.unwrap()
			.to_owned()
	}

	#[tokio::test]
	async fn test_new_user_has_empty_profile() {
		let app = app();

		register(&app, "writer").await;

		let response = app.get("/profile").await;

		assert_eq!(response.status_code(), 200);

		let page = response.json::<Value>();

		assert_eq!(page["user"]["username"], "writer");
		assert_eq!(page["email"], "writer@example.com");
		assert_eq!(page["profile"]["bio"], Value::Null);
		assert_eq!(page["total_blogs"], 0);
		assert_eq!(page["latest_blogs"], json!([]));
	}

	#[tokio::test]
	async fn test_profile_shows_latest_six_blogs() {
		let (alice, visitor) = two_clients();

		register(&alice, "alice").await;

		for i in 0..8 {
			alice
				.post("/blogs")
				.json(&json!({ "title": format!("post {i}"), "body": "<p>body</p>" }))
				.await;
		}

		let id = user_id(&alice).await;
		let response = visitor.get(&format!("/profile/{id}")).await;

		assert_eq!(response.status_code(), 200);

		let page = response.json::<Value>();

		assert_eq!(page["total_blogs"], 8);
		assert_eq!(page["latest_blogs"].as_array().unwrap().len(), 6);
		assert_eq!(page["latest_blogs"][0]["title"], "post 7");
		assert!(page.get("email").is_none());
	}

	#[tokio::test]
	async fn test_unknown_profile() {
		let response = app()
			.get("/profile/00000000-0000-0000-0000-000000000000")
			.await;

		assert_eq!(response.status_code(), 404);
		assert_eq!(response.json::<Value>()["errors"][0]["content"], "unknown_user");
	}

	#[tokio::test]
	async fn test_edit_profile() {
		let (alice, visitor) = two_clients();

		register(&alice, "alice").await;

		let response = alice
			.put("/profile")
			.json(&json!({
				"bio": "I bake bread.",
				"profession": "Baker",
				"social_github": "https://github.com/alice",
				"email": "alice@bakery.com",
			}))
			.await;

		assert_eq!(response.status_code(), 200);

		let page = response.json::<Value>();

		assert_eq!(page["profile"]["bio"], "I bake bread.");
		assert_eq!(page["email"], "alice@bakery.com");

		let id = user_id(&alice).await;
		let public = visitor.get(&format!("/profile/{id}")).await.json::<Value>();

		assert_eq!(public["profile"]["profession"], "Baker");
		assert_eq!(public["profile"]["social_github"], "https://github.com/alice");

		// the new email is the one that logs in
		let response = visitor
			.post("/auth/login")
			.json(&json!({ "login": "alice@bakery.com", "password": "hunter2hunter" }))
			.await;

		assert_eq!(response.status_code(), 200);
	}

	#[tokio::test]
	async fn test_edit_profile_rejects_taken_email() {
		let (alice, bob) = two_clients();

		register(&alice, "alice").await;
		register(&bob, "bob").await;

		let response = bob
			.put("/profile")
			.json(&json!({ "email": "alice@example.com", "bio": "Hi" }))
			.await;

		assert_eq!(response.status_code(), 409);
		assert_eq!(response.json::<Value>()["errors"][0]["field"], "email");

		// nothing was written
		let page = bob.get("/profile").await.json::<Value>();

		assert_eq!(page["email"], "bob@example.com");
		assert_eq!(page["profile"]["bio"], Value::Null);
	}

	#[tokio::test]
	async fn test_edit_profile_validates_links() {
		let app = app();

		register(&app, "writer").await;

		let response = app
			.put("/profile")
			.json(&json!({ "website": "not a url" }))
			.await;

		assert_eq!(response.status_code(), 400);
		assert_eq!(response.json::<Value>()["errors"][0]["field"], "website");
	}

	#[tokio::test]
	async fn test_profile_requires_session() {
		let app = app();

		assert_eq!(app.get("/profile").await.status_code(), 401);
		assert_eq!(
			app.put("/profile")
				.json(&json!({ "bio": "Hi" }))
				.await
				.status_code(),
			401
		);
	}
}
