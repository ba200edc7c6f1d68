// src/handlers/organizations.rs

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
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::organization::{
        CreateOrganizationPayload, JoinOrganizationPayload, MyOrganization, Organization,
    },
};

// POST /api/organizations
#[utoipa::path(
    post,
    path = "/api/organizations",
    tag = "Organizations",
    request_body = CreateOrganizationPayload,
    responses(
        (status = 201, description = "Organização criada com funil padrão", body = Organization),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_organization(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateOrganizationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization = app_state
        .organization_service
        .create_with_owner(&payload.name, user.id, payload.partner_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(organization)))
}

// GET /api/organizations
#[utoipa::path(
    get,
    path = "/api/organizations",
    tag = "Organizations",
    responses(
        (status = 200, description = "Organizações do usuário", body = Vec<MyOrganization>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_my_organizations(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let organizations = app_state
        .organization_service
        .list_for_user(user.id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(organizations))
}

// POST /api/{org_id}/member/join
// Fica fora do guard de organização: quem entra ainda não é membro.
#[utoipa::path(
    post,
    path = "/api/{org_id}/member/join",
    tag = "Organizations",
    request_body = JoinOrganizationPayload,
    params(("org_id" = Uuid, Path, description = "ID da organização")),
    responses(
        (status = 201, description = "Entrou na organização como agente", body = Organization),
        (status = 400, description = "Código de convite inválido"),
        (status = 409, description = "Já é membro")
    ),
    security(("api_jwt" = []))
)]
pub async fn join_organization(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(org_id): Path<Uuid>,
    Json(payload): Json<JoinOrganizationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization = app_state
        .organization_service
        .join(org_id, user.id, &payload.join_code)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(organization)))
}
