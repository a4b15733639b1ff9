use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;

use cinelog_api::api::{create_router, AppState};
use cinelog_api::auth::{IdentityProvider, MemoryIdentityProvider};
use cinelog_api::db::{CollectionStore, MemoryStore};
use cinelog_api::error::AppResult;
use cinelog_api::models::{CatalogMovieDetails, CatalogSearchResult};
use cinelog_api::services::providers::CatalogProvider;

/// Canned catalog so tests never touch the network
struct StaticCatalog;

#[async_trait::async_trait]
impl CatalogProvider for StaticCatalog {
    async fn search(&self, query: &str) -> AppResult<Vec<CatalogSearchResult>> {
        if query.trim().is_empty() {
            return Ok(vec![]);
        }
        Ok(vec![CatalogSearchResult {
            id: "27205".to_string(),
            title: "Inception".to_string(),
            year: Some(2010),
            poster_url: None,
        }])
    }

    async fn details(&self, catalog_id: &str) -> AppResult<CatalogMovieDetails> {
        Ok(CatalogMovieDetails {
            id: catalog_id.to_string(),
            title: "Inception".to_string(),
            year: Some(2010),
            director: Some("Christopher Nolan".to_string()),
            genres: vec!["Sci-Fi".to_string(), "Action".to_string()],
            plot: None,
            poster_url: None,
            community_rating: Some(8.4),
        })
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

fn create_test_server() -> TestServer {
    let store: Arc<dyn CollectionStore> = Arc::new(MemoryStore::new());
    let identity: Arc<dyn IdentityProvider> = Arc::new(MemoryIdentityProvider::new());
    let catalog: Arc<dyn CatalogProvider> = Arc::new(StaticCatalog);
    let state = AppState::new(store, identity, catalog);
    TestServer::new(create_router(state)).unwrap()
}

async fn sign_up(server: &TestServer, email: &str) -> String {
    let response = server
        .post("/auth/signup")
        .json(&json!({
            "email": email,
            "password": "hunter2",
            "username": email.split('@').next().unwrap(),
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: serde_json::Value = response.json();
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_movie_routes_require_authentication() {
    let server = create_test_server();

    let response = server.get("/movies").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = server
        .post("/movies")
        .json(&json!({ "title": "Dune" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_and_list_is_scoped_to_owner() {
    let server = create_test_server();
    let alice = sign_up(&server, "alice@example.com").await;
    let bob = sign_up(&server, "bob@example.com").await;

    let response = server
        .post("/movies")
        .authorization_bearer(&alice)
        .json(&json!({
            "title": "Dune",
            "year": 2021,
            "genres": ["Sci-Fi", "Drama"],
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: serde_json::Value = response.json();
    assert_eq!(created["title"], "Dune");
    assert_eq!(created["genres"], json!(["Sci-Fi", "Drama"]));

    let response = server.get("/movies").authorization_bearer(&alice).await;
    response.assert_status_ok();
    let movies: Vec<serde_json::Value> = response.json();
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0]["title"], "Dune");

    // Bob's collection stays empty.
    let response = server.get("/movies").authorization_bearer(&bob).await;
    response.assert_status_ok();
    let movies: Vec<serde_json::Value> = response.json();
    assert!(movies.is_empty());
}

#[tokio::test]
async fn test_genre_entries_are_normalized() {
    let server = create_test_server();
    let token = sign_up(&server, "alice@example.com").await;

    let response = server
        .post("/movies")
        .authorization_bearer(&token)
        .json(&json!({
            "title": "Dune",
            "genres": [" Sci-Fi , Drama", "", "Sci-Fi"],
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: serde_json::Value = response.json();
    assert_eq!(created["genres"], json!(["Sci-Fi", "Drama"]));
}

#[tokio::test]
async fn test_create_rejects_blank_title() {
    let server = create_test_server();
    let token = sign_up(&server, "alice@example.com").await;

    let response = server
        .post("/movies")
        .authorization_bearer(&token)
        .json(&json!({ "title": "   " }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_and_delete_own_movie() {
    let server = create_test_server();
    let alice = sign_up(&server, "alice@example.com").await;
    let bob = sign_up(&server, "bob@example.com").await;

    let response = server
        .post("/movies")
        .authorization_bearer(&alice)
        .json(&json!({ "title": "Heat", "year": 1995 }))
        .await;
    let created: serde_json::Value = response.json();
    let id = created["id"].as_str().unwrap().to_string();

    // A stranger's update cannot tell "not yours" from "missing".
    let response = server
        .put(&format!("/movies/{id}"))
        .authorization_bearer(&bob)
        .json(&json!({ "userRating": 10.0 }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = server
        .put(&format!("/movies/{id}"))
        .authorization_bearer(&alice)
        .json(&json!({ "userRating": 9.5, "notes": "rewatch" }))
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    let response = server.get("/movies").authorization_bearer(&alice).await;
    let movies: Vec<serde_json::Value> = response.json();
    assert_eq!(movies[0]["userRating"], 9.5);
    assert_eq!(movies[0]["notes"], "rewatch");
    assert_eq!(movies[0]["title"], "Heat");

    let response = server
        .delete(&format!("/movies/{id}"))
        .authorization_bearer(&alice)
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    let response = server.get("/movies").authorization_bearer(&alice).await;
    let movies: Vec<serde_json::Value> = response.json();
    assert!(movies.is_empty());

    let response = server
        .delete(&format!("/movies/{id}"))
        .authorization_bearer(&alice)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_share_duplicate_then_revoke_then_reshare() {
    let server = create_test_server();
    let alice = sign_up(&server, "alice@example.com").await;
    let _bob = sign_up(&server, "bob@example.com").await;

    let response = server
        .post("/shares")
        .authorization_bearer(&alice)
        .json(&json!({ "email": "bob@example.com", "permissionLevel": "read" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let grant: serde_json::Value = response.json();
    assert_eq!(grant["counterpartEmail"], "bob@example.com");
    assert_eq!(grant["permissionLevel"], "read");
    let grantee_id = grant["sharedWithId"].as_str().unwrap().to_string();

    // Second share with the same pair is rejected distinctly.
    let response = server
        .post("/shares")
        .authorization_bearer(&alice)
        .json(&json!({ "email": "bob@example.com", "permissionLevel": "edit" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    let response = server
        .delete(&format!("/shares/{grantee_id}"))
        .authorization_bearer(&alice)
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    // Revoking again is a no-op, not an error.
    let response = server
        .delete(&format!("/shares/{grantee_id}"))
        .authorization_bearer(&alice)
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    let response = server
        .post("/shares")
        .authorization_bearer(&alice)
        .json(&json!({ "email": "bob@example.com", "permissionLevel": "edit" }))
        .await;
    response.assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_share_with_unknown_email() {
    let server = create_test_server();
    let alice = sign_up(&server, "alice@example.com").await;

    let response = server
        .post("/shares")
        .authorization_bearer(&alice)
        .json(&json!({ "email": "ghost@example.com", "permissionLevel": "read" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_shares_listing_resolves_grantee_emails() {
    let server = create_test_server();
    let alice = sign_up(&server, "alice@example.com").await;
    sign_up(&server, "bob@example.com").await;
    sign_up(&server, "carol@example.com").await;

    for (email, level) in [("bob@example.com", "read"), ("carol@example.com", "edit")] {
        let response = server
            .post("/shares")
            .authorization_bearer(&alice)
            .json(&json!({ "email": email, "permissionLevel": level }))
            .await;
        response.assert_status(StatusCode::CREATED);
    }

    let response = server.get("/shares").authorization_bearer(&alice).await;
    response.assert_status_ok();
    let grants: Vec<serde_json::Value> = response.json();
    assert_eq!(grants.len(), 2);
    assert_eq!(grants[0]["counterpartEmail"], "bob@example.com");
    assert_eq!(grants[1]["counterpartEmail"], "carol@example.com");
}

#[tokio::test]
async fn test_shared_collection_read_and_edit_flow() {
    let server = create_test_server();
    let alice = sign_up(&server, "alice@example.com").await;
    let bob = sign_up(&server, "bob@example.com").await;
    let carol = sign_up(&server, "carol@example.com").await;

    let response = server
        .post("/movies")
        .authorization_bearer(&alice)
        .json(&json!({
            "title": "Dune",
            "year": 2021,
            "genres": ["Sci-Fi", "Drama"],
        }))
        .await;
    let movie: serde_json::Value = response.json();
    let movie_id = movie["id"].as_str().unwrap().to_string();

    // Before any grant, Bob sees nothing and no movie query is needed.
    let response = server.get("/shared-with-me").authorization_bearer(&bob).await;
    response.assert_status_ok();
    let shared: serde_json::Value = response.json();
    assert_eq!(shared["grants"], json!([]));
    assert_eq!(shared["movies"], json!([]));

    // Alice shares read with Bob and edit with Carol.
    server
        .post("/shares")
        .authorization_bearer(&alice)
        .json(&json!({ "email": "bob@example.com", "permissionLevel": "read" }))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/shares")
        .authorization_bearer(&alice)
        .json(&json!({ "email": "carol@example.com", "permissionLevel": "edit" }))
        .await
        .assert_status(StatusCode::CREATED);

    // Bob sees one grant and Alice's movie, tagged with her email.
    let response = server.get("/shared-with-me").authorization_bearer(&bob).await;
    let shared: serde_json::Value = response.json();
    assert_eq!(shared["grants"].as_array().unwrap().len(), 1);
    assert_eq!(shared["grants"][0]["counterpartEmail"], "alice@example.com");
    assert_eq!(shared["movies"].as_array().unwrap().len(), 1);
    assert_eq!(shared["movies"][0]["title"], "Dune");
    assert_eq!(shared["movies"][0]["genres"], json!(["Sci-Fi", "Drama"]));
    assert_eq!(shared["movies"][0]["ownerEmail"], "alice@example.com");

    // Bob's grant is read-only: writes are refused.
    let response = server
        .put(&format!("/shared/movies/{movie_id}"))
        .authorization_bearer(&bob)
        .json(&json!({ "notes": "vandalism" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    // A stranger with no grant is also refused.
    let dave = sign_up(&server, "dave@example.com").await;
    let response = server
        .put(&format!("/shared/movies/{movie_id}"))
        .authorization_bearer(&dave)
        .json(&json!({ "notes": "vandalism" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    // Carol's edit grant lands, and Bob sees the mutation.
    let response = server
        .put(&format!("/shared/movies/{movie_id}"))
        .authorization_bearer(&carol)
        .json(&json!({ "notes": "loved the sandworms" }))
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    let response = server.get("/shared-with-me").authorization_bearer(&bob).await;
    let shared: serde_json::Value = response.json();
    assert_eq!(shared["movies"][0]["notes"], "loved the sandworms");
}

#[tokio::test]
async fn test_csv_import_reports_row_errors() {
    let server = create_test_server();
    let token = sign_up(&server, "alice@example.com").await;

    let csv = "title,year,director,genre,rating,posterUrl,watchedDate,notes\n\
               Inception,2010,,Sci-Fi|Action,9,,2020-10-15,\n\
               Broken,row,with,extra,columns,here,2020-01-01,oops,surplus";

    let response = server
        .post("/movies/import")
        .authorization_bearer(&token)
        .text(csv)
        .await;
    response.assert_status_ok();

    let outcome: serde_json::Value = response.json();
    assert_eq!(outcome["imported"].as_array().unwrap().len(), 1);
    assert_eq!(outcome["imported"][0]["title"], "Inception");
    assert_eq!(outcome["imported"][0]["genres"], json!(["Sci-Fi", "Action"]));
    assert_eq!(outcome["rowErrors"].as_array().unwrap().len(), 1);
    assert_eq!(outcome["rowErrors"][0]["row"], 3);

    let response = server.get("/movies").authorization_bearer(&token).await;
    let movies: Vec<serde_json::Value> = response.json();
    assert_eq!(movies.len(), 1);
}

#[tokio::test]
async fn test_csv_import_without_title_column() {
    let server = create_test_server();
    let token = sign_up(&server, "alice@example.com").await;

    let response = server
        .post("/movies/import")
        .authorization_bearer(&token)
        .text("year,director\n2010,Nolan")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wishlist_promotion_flow() {
    let server = create_test_server();
    let token = sign_up(&server, "alice@example.com").await;

    let response = server
        .post("/wishlist")
        .authorization_bearer(&token)
        .json(&json!({
            "title": "Enemy",
            "year": 2014,
            "genres": ["Thriller"],
            "imdbRating": 7.3,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let item: serde_json::Value = response.json();
    let item_id = item["id"].as_str().unwrap().to_string();

    let response = server.get("/wishlist").authorization_bearer(&token).await;
    let items: Vec<serde_json::Value> = response.json();
    assert_eq!(items.len(), 1);

    let response = server
        .post(&format!("/wishlist/{item_id}/watched"))
        .authorization_bearer(&token)
        .json(&json!({ "watchedDate": "2024-03-01" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let movie: serde_json::Value = response.json();
    assert_eq!(movie["title"], "Enemy");
    assert_eq!(movie["watchedDate"], "2024-03-01");
    assert_eq!(movie["genres"], json!(["Thriller"]));

    let response = server.get("/wishlist").authorization_bearer(&token).await;
    let items: Vec<serde_json::Value> = response.json();
    assert!(items.is_empty());

    let response = server.get("/movies").authorization_bearer(&token).await;
    let movies: Vec<serde_json::Value> = response.json();
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0]["title"], "Enemy");
}

#[tokio::test]
async fn test_catalog_search_and_details() {
    let server = create_test_server();

    let response = server.get("/catalog/search").add_query_param("q", "incep").await;
    response.assert_status_ok();
    let results: Vec<serde_json::Value> = response.json();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["title"], "Inception");

    let response = server.get("/catalog/search").add_query_param("q", "  ").await;
    response.assert_status_ok();
    let results: Vec<serde_json::Value> = response.json();
    assert!(results.is_empty());

    let response = server.get("/catalog/27205").await;
    response.assert_status_ok();
    let details: serde_json::Value = response.json();
    assert_eq!(details["director"], "Christopher Nolan");
    assert_eq!(details["communityRating"], 8.4);
}

#[tokio::test]
async fn test_sign_out_invalidates_session() {
    let server = create_test_server();
    let token = sign_up(&server, "alice@example.com").await;

    server
        .post("/auth/signout")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let response = server.get("/movies").authorization_bearer(&token).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sign_in_flow() {
    let server = create_test_server();
    sign_up(&server, "alice@example.com").await;

    let response = server
        .post("/auth/signin")
        .json(&json!({ "email": "alice@example.com", "password": "wrong" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = server
        .post("/auth/signin")
        .json(&json!({ "email": "alice@example.com", "password": "hunter2" }))
        .await;
    response.assert_status_ok();
    let tokens: serde_json::Value = response.json();
    let token = tokens["access_token"].as_str().unwrap();

    let response = server.get("/movies").authorization_bearer(token).await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_oauth_url_names_provider() {
    let server = create_test_server();
    let response = server.get("/auth/oauth/google").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["url"].as_str().unwrap().contains("provider=google"));
}
