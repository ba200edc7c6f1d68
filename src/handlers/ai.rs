// src/handlers/ai.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        organization::OrgContext,
        role::{Admin, RequireRole},
    },
    models::ai::{AiMode, CreatePromptPayload, ImproveTextPayload, ImproveTextResponse, Prompt, ShortcutBinding},
};

// GET /api/{org_id}/prompts
#[utoipa::path(
    get,
    path = "/api/{org_id}/prompts",
    tag = "AI",
    params(("org_id" = Uuid, Path, description = "ID da organização")),
    responses((status = 200, description = "Prompts da organização", body = Vec<Prompt>)),
    security(("api_jwt" = []))
)]
pub async fn list_prompts(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
) -> Result<impl IntoResponse, ApiError> {
    let prompts = app_state
        .ai_service
        .list_prompts(org.organization_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(prompts))
}

// POST /api/{org_id}/prompts
#[utoipa::path(
    post,
    path = "/api/{org_id}/prompts",
    tag = "AI",
    request_body = CreatePromptPayload,
    params(("org_id" = Uuid, Path, description = "ID da organização")),
    responses(
        (status = 201, description = "Prompt criado", body = Prompt),
        (status = 403, description = "Requer cargo admin")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_prompt(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
    _role: RequireRole<Admin>,
    Json(payload): Json<CreatePromptPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let prompt = app_state
        .ai_service
        .create_prompt(org.organization_id, &payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(prompt)))
}

// POST /api/{org_id}/prompts/{prompt_id}/improve-text
#[utoipa::path(
    post,
    path = "/api/{org_id}/prompts/{prompt_id}/improve-text",
    tag = "AI",
    request_body = ImproveTextPayload,
    params(
        ("org_id" = Uuid, Path, description = "ID da organização"),
        ("prompt_id" = Uuid, Path, description = "ID do prompt")
    ),
    responses(
        (status = 200, description = "Texto que substitui o rascunho", body = ImproveTextResponse),
        (status = 400, description = "Requisição incompleta para o modo"),
        (status = 429, description = "Limite de requisições"),
        (status = 503, description = "IA não configurada")
    ),
    security(("api_jwt" = []))
)]
pub async fn improve_text(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(path_params): Path<(Uuid, Uuid)>,
    Json(payload): Json<ImproveTextPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, prompt_id) = path_params;
    let response = app_state
        .ai_service
        .improve_text(org.organization_id, user.id, prompt_id, &payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(response))
}

// GET /api/{org_id}/prompts/shortcuts
#[utoipa::path(
    get,
    path = "/api/{org_id}/prompts/shortcuts",
    tag = "AI",
    params(("org_id" = Uuid, Path, description = "ID da organização")),
    responses((status = 200, description = "Atalhos de teclado do painel de IA", body = Vec<ShortcutBinding>)),
    security(("api_jwt" = []))
)]
pub async fn list_shortcuts() -> Json<Vec<ShortcutBinding>> {
    Json(AiMode::shortcut_bindings())
}
