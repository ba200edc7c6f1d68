// src/handlers/crm.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        dialing_codes::DIALING_CODES,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{
        i18n::Locale,
        organization::OrgContext,
        role::{Admin, RequireRole},
    },
    models::{
        crm::{
            CreateFieldPayload, CreateFunnelPayload, FieldDefinition, Funnel, FunnelWithStages, Stage,
            StagePayload,
        },
        customer::{CreateTagPayload, Tag},
    },
};

// =============================================================================
//  ÁREA 1: TAGS
// =============================================================================

// GET /api/{org_id}/tags
#[utoipa::path(
    get,
    path = "/api/{org_id}/tags",
    tag = "CRM",
    params(("org_id" = Uuid, Path, description = "ID da organização")),
    responses((status = 200, description = "Tags da organização", body = Vec<Tag>)),
    security(("api_jwt" = []))
)]
pub async fn list_tags(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
) -> Result<impl IntoResponse, ApiError> {
    let tags = app_state
        .tag_service
        .list(org.organization_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(tags))
}

// POST /api/{org_id}/tags
#[utoipa::path(
    post,
    path = "/api/{org_id}/tags",
    tag = "CRM",
    request_body = CreateTagPayload,
    params(("org_id" = Uuid, Path, description = "ID da organização")),
    responses(
        (status = 201, description = "Tag criada", body = Tag),
        (status = 409, description = "Nome já usado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_tag(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
    Json(payload): Json<CreateTagPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let tag = app_state
        .tag_service
        .create(org.organization_id, &payload.name, payload.color.as_deref())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(tag)))
}

// DELETE /api/{org_id}/tags/{id}
#[utoipa::path(
    delete,
    path = "/api/{org_id}/tags/{id}",
    tag = "CRM",
    params(
        ("org_id" = Uuid, Path, description = "ID da organização"),
        ("id" = Uuid, Path, description = "ID da tag")
    ),
    responses((status = 204, description = "Tag removida"), (status = 404, description = "Tag não encontrada")),
    security(("api_jwt" = []))
)]
pub async fn delete_tag(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
    Path(path_params): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, tag_id) = path_params;
    app_state
        .tag_service
        .delete(org.organization_id, tag_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  ÁREA 2: FUNIS E ETAPAS
// =============================================================================

// GET /api/{org_id}/funnels
#[utoipa::path(
    get,
    path = "/api/{org_id}/funnels",
    tag = "CRM",
    params(("org_id" = Uuid, Path, description = "ID da organização")),
    responses((status = 200, description = "Funis com etapas ordenadas por posição", body = Vec<FunnelWithStages>)),
    security(("api_jwt" = []))
)]
pub async fn list_funnels(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
) -> Result<impl IntoResponse, ApiError> {
    let funnels = app_state
        .funnel_service
        .list_with_stages(org.organization_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(funnels))
}

// POST /api/{org_id}/funnels
#[utoipa::path(
    post,
    path = "/api/{org_id}/funnels",
    tag = "CRM",
    request_body = CreateFunnelPayload,
    params(("org_id" = Uuid, Path, description = "ID da organização")),
    responses((status = 201, description = "Funil criado", body = Funnel)),
    security(("api_jwt" = []))
)]
pub async fn create_funnel(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
    _role: RequireRole<Admin>,
    Json(payload): Json<CreateFunnelPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let funnel = app_state
        .funnel_service
        .create_funnel(org.organization_id, &payload.name)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(funnel)))
}

// POST /api/{org_id}/funnels/{id}/stages
#[utoipa::path(
    post,
    path = "/api/{org_id}/funnels/{id}/stages",
    tag = "CRM",
    request_body = StagePayload,
    params(
        ("org_id" = Uuid, Path, description = "ID da organização"),
        ("id" = Uuid, Path, description = "ID do funil")
    ),
    responses(
        (status = 201, description = "Etapa criada", body = Stage),
        (status = 404, description = "Funil não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_stage(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
    _role: RequireRole<Admin>,
    Path(path_params): Path<(Uuid, Uuid)>,
    Json(payload): Json<StagePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, funnel_id) = path_params;
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let stage = app_state
        .funnel_service
        .create_stage(org.organization_id, funnel_id, &payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(stage)))
}

// PUT /api/{org_id}/stages/{id}
#[utoipa::path(
    put,
    path = "/api/{org_id}/stages/{id}",
    tag = "CRM",
    request_body = StagePayload,
    params(
        ("org_id" = Uuid, Path, description = "ID da organização"),
        ("id" = Uuid, Path, description = "ID da etapa")
    ),
    responses(
        (status = 200, description = "Etapa atualizada", body = Stage),
        (status = 404, description = "Etapa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_stage(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
    _role: RequireRole<Admin>,
    Path(path_params): Path<(Uuid, Uuid)>,
    Json(payload): Json<StagePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, stage_id) = path_params;
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let stage = app_state
        .funnel_service
        .update_stage(org.organization_id, stage_id, &payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(stage))
}

// DELETE /api/{org_id}/stages/{id}
#[utoipa::path(
    delete,
    path = "/api/{org_id}/stages/{id}",
    tag = "CRM",
    params(
        ("org_id" = Uuid, Path, description = "ID da organização"),
        ("id" = Uuid, Path, description = "ID da etapa")
    ),
    responses((status = 204, description = "Etapa removida"), (status = 404, description = "Etapa não encontrada")),
    security(("api_jwt" = []))
)]
pub async fn delete_stage(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
    _role: RequireRole<Admin>,
    Path(path_params): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, stage_id) = path_params;
    app_state
        .funnel_service
        .delete_stage(org.organization_id, stage_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  ÁREA 3: CAMPOS PERSONALIZADOS
// =============================================================================

// GET /api/{org_id}/fields
#[utoipa::path(
    get,
    path = "/api/{org_id}/fields",
    tag = "CRM",
    params(("org_id" = Uuid, Path, description = "ID da organização")),
    responses((status = 200, description = "Definições de campos", body = Vec<FieldDefinition>)),
    security(("api_jwt" = []))
)]
pub async fn list_fields(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
) -> Result<impl IntoResponse, ApiError> {
    let fields = app_state
        .field_service
        .list_definitions(&app_state.db_pool, org.organization_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(fields))
}

// POST /api/{org_id}/fields
#[utoipa::path(
    post,
    path = "/api/{org_id}/fields",
    tag = "CRM",
    request_body = CreateFieldPayload,
    params(("org_id" = Uuid, Path, description = "ID da organização")),
    responses(
        (status = 201, description = "Campo criado", body = FieldDefinition),
        (status = 403, description = "Requer cargo admin"),
        (status = 409, description = "Chave já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_field(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
    _role: RequireRole<Admin>,
    Json(payload): Json<CreateFieldPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let field = app_state
        .field_service
        .create_definition(org.organization_id, &payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(field)))
}

// =============================================================================
//  ÁREA 4: CÓDIGOS DE PAÍS
// =============================================================================

// GET /api/{org_id}/contacts/countries
#[utoipa::path(
    get,
    path = "/api/{org_id}/contacts/countries",
    tag = "CRM",
    params(("org_id" = Uuid, Path, description = "ID da organização")),
    responses((status = 200, description = "Tabela de países com código de discagem")),
    security(("api_jwt" = []))
)]
pub async fn list_countries() -> impl IntoResponse {
    Json(DIALING_CODES)
}
