use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::SessionTokens;
use crate::error::{AppError, AppResult};
use crate::models::{
    CatalogMovieDetails, CatalogSearchResult, CreateMovieInput, MovieWithGenres, PermissionLevel,
    SharedCollection, SharedWithMe, UpdateMovieInput, WishlistInput, WishlistItem,
};
use crate::services::import::{parse_import, RowError};

use super::extract::Bearer;
use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct OauthQuery {
    pub redirect_to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OauthUrlResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub email: String,
    pub permission_level: PermissionLevel,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub imported: Vec<MovieWithGenres>,
    pub row_errors: Vec<RowError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkWatchedRequest {
    pub watched_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogSearchQuery {
    pub q: String,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Register a new account and its profile row
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> AppResult<(StatusCode, Json<SessionTokens>)> {
    let username = request.username.trim();
    if username.is_empty() {
        return Err(AppError::InvalidInput(
            "Username must not be empty".to_string(),
        ));
    }

    let tokens = state
        .identity
        .sign_up(&request.email, &request.password, username)
        .await?;

    // The profile row feeds the email-resolution RPCs used by sharing.
    state
        .store
        .upsert_profile(tokens.user.id, username, &request.email)
        .await?;

    tracing::info!(user_id = %tokens.user.id, "Account created");

    Ok((StatusCode::CREATED, Json(tokens)))
}

/// Exchange credentials for a session
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> AppResult<Json<SessionTokens>> {
    let tokens = state
        .identity
        .sign_in(&request.email, &request.password)
        .await?;
    Ok(Json(tokens))
}

/// Third-party OAuth authorize URL for the named provider
pub async fn oauth_url(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<OauthQuery>,
) -> Json<OauthUrlResponse> {
    let url = state
        .identity
        .oauth_authorize_url(&provider, query.redirect_to.as_deref());
    Json(OauthUrlResponse { url })
}

/// Revoke the caller's session
pub async fn sign_out(State(state): State<AppState>, bearer: Bearer) -> AppResult<StatusCode> {
    let token = bearer.token().ok_or(AppError::Unauthenticated)?;
    state.identity.sign_out(token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the caller's own movies
pub async fn list_movies(
    State(state): State<AppState>,
    bearer: Bearer,
) -> AppResult<Json<Vec<MovieWithGenres>>> {
    let movies = state.collection.list_owned(bearer.token()).await?;
    Ok(Json(movies))
}

/// Create a movie in the caller's collection
pub async fn create_movie(
    State(state): State<AppState>,
    bearer: Bearer,
    Json(input): Json<CreateMovieInput>,
) -> AppResult<(StatusCode, Json<MovieWithGenres>)> {
    let movie = state.collection.create(bearer.token(), input).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

/// Update a movie the caller owns
pub async fn update_movie(
    State(state): State<AppState>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateMovieInput>,
) -> AppResult<StatusCode> {
    state.collection.update(bearer.token(), id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a movie the caller owns
pub async fn delete_movie(
    State(state): State<AppState>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.collection.delete(bearer.token(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Parse a delimited import file and create its movies
pub async fn import_movies(
    State(state): State<AppState>,
    bearer: Bearer,
    body: String,
) -> AppResult<Json<ImportResponse>> {
    let parsed = parse_import(&body)?;
    let imported = state
        .collection
        .bulk_import(bearer.token(), parsed.movies)
        .await?;

    Ok(Json(ImportResponse {
        imported,
        row_errors: parsed.errors,
    }))
}

/// List grants the caller has given out
pub async fn list_shares(
    State(state): State<AppState>,
    bearer: Bearer,
) -> AppResult<Json<Vec<SharedCollection>>> {
    let grants = state.sharing.list_grants_as_owner(bearer.token()).await?;
    Ok(Json(grants))
}

/// Share the caller's collection with another registered user
pub async fn share_collection(
    State(state): State<AppState>,
    bearer: Bearer,
    Json(request): Json<ShareRequest>,
) -> AppResult<(StatusCode, Json<SharedCollection>)> {
    let grant = state
        .sharing
        .share(bearer.token(), &request.email, request.permission_level)
        .await?;
    Ok((StatusCode::CREATED, Json(grant)))
}

/// Revoke the caller's grant to the given user
pub async fn revoke_share(
    State(state): State<AppState>,
    bearer: Bearer,
    Path(user_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.sharing.revoke(bearer.token(), user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Grants and movies shared with the caller
pub async fn shared_with_me(
    State(state): State<AppState>,
    bearer: Bearer,
) -> AppResult<Json<SharedWithMe>> {
    let shared = state.sharing.list_shared_with_me(bearer.token()).await?;
    Ok(Json(shared))
}

/// Update a movie in a collection shared with the caller
pub async fn update_shared_movie(
    State(state): State<AppState>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateMovieInput>,
) -> AppResult<StatusCode> {
    state.sharing.update_shared(bearer.token(), id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the caller's wishlist
pub async fn list_wishlist(
    State(state): State<AppState>,
    bearer: Bearer,
) -> AppResult<Json<Vec<WishlistItem>>> {
    let items = state.wishlist.list(bearer.token()).await?;
    Ok(Json(items))
}

/// Add a wishlist entry
pub async fn add_wishlist_item(
    State(state): State<AppState>,
    bearer: Bearer,
    Json(input): Json<WishlistInput>,
) -> AppResult<(StatusCode, Json<WishlistItem>)> {
    let item = state.wishlist.add(bearer.token(), input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Remove a wishlist entry
pub async fn remove_wishlist_item(
    State(state): State<AppState>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.wishlist.remove(bearer.token(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Promote a wishlist entry into a watched movie
pub async fn mark_wishlist_watched(
    State(state): State<AppState>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
    request: Option<Json<MarkWatchedRequest>>,
) -> AppResult<(StatusCode, Json<MovieWithGenres>)> {
    let watched_date = request.and_then(|Json(r)| r.watched_date);
    let movie = state
        .wishlist
        .mark_watched(bearer.token(), id, watched_date)
        .await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

/// Search the external movie catalog
pub async fn search_catalog(
    State(state): State<AppState>,
    Query(query): Query<CatalogSearchQuery>,
) -> AppResult<Json<Vec<CatalogSearchResult>>> {
    let results = state.catalog.search(&query.q).await?;
    Ok(Json(results))
}

/// Fetch full catalog details for one movie
pub async fn catalog_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<CatalogMovieDetails>> {
    let details = state.catalog.details(&id).await?;
    Ok(Json(details))
}
