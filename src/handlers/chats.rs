// src/handlers/chats.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, organization::OrgContext},
    models::chat::{Channel, StartChatPayload, StartChatResponse, Team},
};

// GET /api/{org_id}/channels
#[utoipa::path(
    get,
    path = "/api/{org_id}/channels",
    tag = "Chats",
    params(("org_id" = Uuid, Path, description = "ID da organização")),
    responses((status = 200, description = "Canais ativos", body = Vec<Channel>)),
    security(("api_jwt" = []))
)]
pub async fn list_channels(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
) -> Result<impl IntoResponse, ApiError> {
    let channels = app_state
        .chat_service
        .list_channels(org.organization_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(channels))
}

// GET /api/{org_id}/teams
#[utoipa::path(
    get,
    path = "/api/{org_id}/teams",
    tag = "Chats",
    params(("org_id" = Uuid, Path, description = "ID da organização")),
    responses((status = 200, description = "Equipes", body = Vec<Team>)),
    security(("api_jwt" = []))
)]
pub async fn list_teams(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
) -> Result<impl IntoResponse, ApiError> {
    let teams = app_state
        .chat_service
        .list_teams(org.organization_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(teams))
}

// POST /api/{org_id}/chats/start
#[utoipa::path(
    post,
    path = "/api/{org_id}/chats/start",
    tag = "Chats",
    request_body = StartChatPayload,
    params(("org_id" = Uuid, Path, description = "ID da organização")),
    responses(
        (status = 201, description = "Conversa criada", body = StartChatResponse),
        (status = 200, description = "Conversa aberta já existente", body = StartChatResponse),
        (status = 400, description = "Contato incompatível com o canal")
    ),
    security(("api_jwt" = []))
)]
pub async fn start_chat(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<StartChatPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let response = app_state
        .chat_service
        .start_chat(org.organization_id, user.id, &payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    let status = if response.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(response)))
}
