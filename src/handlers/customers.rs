// src/handlers/customers.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::{
        error::{ApiError, AppError},
        sequence::SearchScope,
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, organization::OrgContext},
    models::{
        crm::{SetStagePayload, StageHistoryEntry},
        customer::{
            CreateCustomerPayload, CustomerPage, CustomerView, SortColumn, SortDirection,
            TagToggleResponse, UpdateCustomerPayload,
        },
    },
    services::{
        customer_service::CustomerQuery,
        export_service::{parse_columns, ExportFormat},
    },
};

// =============================================================================
//  QUERY STRING
// =============================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CustomerListQuery {
    /// Busca livre por nome ou valor de contato
    pub q: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub funnel_id: Option<Uuid>,
    pub stage_id: Option<Uuid>,
    /// IDs separados por vírgula
    pub tag_ids: Option<String>,
    /// name | created_at | stage
    pub sort: Option<String>,
    /// asc | desc
    pub direction: Option<String>,
    /// Sequência crescente da busca, por escopo
    pub seq: Option<u64>,
    /// customers | start-chat
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LookupQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
    /// Ex.: `name,stage,contacts,field:cpf`
    pub columns: Option<String>,
}

/// Coluna ou direção desconhecida cai no padrão (`created_at desc`).
/// Coluna conhecida sem direção usa a direção natural dela.
pub fn parse_sort(sort: Option<&str>, direction: Option<&str>) -> (SortColumn, SortDirection) {
    let (column, natural) = match sort.map(|s| s.trim().to_lowercase()).as_deref() {
        Some("name") => (SortColumn::Name, SortDirection::Asc),
        Some("stage") => (SortColumn::Stage, SortDirection::Asc),
        Some("created_at") => (SortColumn::CreatedAt, SortDirection::Desc),
        _ => return (SortColumn::default(), SortDirection::default()),
    };
    let direction = match direction.map(|d| d.trim().to_lowercase()).as_deref() {
        None | Some("") => natural,
        Some("asc") => SortDirection::Asc,
        Some("desc") => SortDirection::Desc,
        _ => return (SortColumn::default(), SortDirection::default()),
    };
    (column, direction)
}

pub fn parse_tag_ids(raw: Option<&str>) -> Result<Vec<Uuid>, AppError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id = Uuid::parse_str(part).map_err(|_| {
            let mut errors = validator::ValidationErrors::new();
            errors.add("tagIds", validator::ValidationError::new("invalid_uuid"));
            AppError::ValidationError(errors)
        })?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Ausente vale `customers`; qualquer outro valor além dos conhecidos é rejeitado.
pub fn parse_scope(raw: Option<&str>) -> Result<SearchScope, AppError> {
    match raw {
        None => Ok(SearchScope::default()),
        Some(raw) => SearchScope::parse(raw).ok_or_else(|| {
            let mut errors = validator::ValidationErrors::new();
            errors.add("scope", validator::ValidationError::new("unknown_scope"));
            AppError::ValidationError(errors)
        }),
    }
}

impl CustomerListQuery {
    pub fn to_query(&self) -> Result<CustomerQuery, AppError> {
        let (sort, direction) = parse_sort(self.sort.as_deref(), self.direction.as_deref());
        Ok(CustomerQuery {
            search: self.q.clone(),
            funnel_id: self.funnel_id,
            stage_id: self.stage_id,
            tag_ids: parse_tag_ids(self.tag_ids.as_deref())?,
            sort,
            direction,
            ..CustomerQuery::new(self.page, self.page_size)
        })
    }
}

// =============================================================================
//  LEITURA
// =============================================================================

// GET /api/{org_id}/customers
#[utoipa::path(
    get,
    path = "/api/{org_id}/customers",
    tag = "Customers",
    params(("org_id" = Uuid, Path, description = "ID da organização"), CustomerListQuery),
    responses(
        (status = 200, description = "Página de clientes (stale=true quando superada)", body = CustomerPage)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(params): Query<CustomerListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params
        .to_query()
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;
    let scope = parse_scope(params.scope.as_deref())
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    let page = app_state
        .customer_service
        .list(org.organization_id, user.id, scope, params.seq, &query)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(page))
}

// GET /api/{org_id}/customers/lookup
#[utoipa::path(
    get,
    path = "/api/{org_id}/customers/lookup",
    tag = "Customers",
    params(("org_id" = Uuid, Path, description = "ID da organização"), LookupQuery),
    responses(
        (status = 200, description = "Até 10 clientes; vazio com menos de 3 caracteres", body = Vec<CustomerView>)
    ),
    security(("api_jwt" = []))
)]
pub async fn lookup_customers(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
    Query(params): Query<LookupQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let customers = app_state
        .customer_service
        .lookup(org.organization_id, params.q.as_deref().unwrap_or_default())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(customers))
}

// GET /api/{org_id}/customers/{id}
#[utoipa::path(
    get,
    path = "/api/{org_id}/customers/{id}",
    tag = "Customers",
    params(
        ("org_id" = Uuid, Path, description = "ID da organização"),
        ("id" = Uuid, Path, description = "ID do cliente")
    ),
    responses(
        (status = 200, description = "Cliente com contatos, tags, campos e etapa", body = CustomerView),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
    Path(path_params): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, customer_id) = path_params;
    let customer = app_state
        .customer_service
        .get(org.organization_id, customer_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(customer))
}

// =============================================================================
//  ESCRITA
// =============================================================================

// POST /api/{org_id}/customers
#[utoipa::path(
    post,
    path = "/api/{org_id}/customers",
    tag = "Customers",
    request_body = CreateCustomerPayload,
    params(("org_id" = Uuid, Path, description = "ID da organização")),
    responses(
        (status = 201, description = "Cliente criado", body = CustomerView),
        (status = 400, description = "Nome, contato ou campos inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateCustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = app_state
        .customer_service
        .create(org.organization_id, user.id, &payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(customer)))
}

// PUT /api/{org_id}/customers/{id}
#[utoipa::path(
    put,
    path = "/api/{org_id}/customers/{id}",
    tag = "Customers",
    request_body = UpdateCustomerPayload,
    params(
        ("org_id" = Uuid, Path, description = "ID da organização"),
        ("id" = Uuid, Path, description = "ID do cliente")
    ),
    responses(
        (status = 200, description = "Cliente atualizado", body = CustomerView),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(path_params): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateCustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, customer_id) = path_params;
    let customer = app_state
        .customer_service
        .update(org.organization_id, user.id, customer_id, &payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(customer))
}

// DELETE /api/{org_id}/customers/{id}
#[utoipa::path(
    delete,
    path = "/api/{org_id}/customers/{id}",
    tag = "Customers",
    params(
        ("org_id" = Uuid, Path, description = "ID da organização"),
        ("id" = Uuid, Path, description = "ID do cliente")
    ),
    responses(
        (status = 204, description = "Cliente removido"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
    Path(path_params): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, customer_id) = path_params;
    app_state
        .customer_service
        .delete(org.organization_id, customer_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  ETAPA, HISTÓRICO E TAGS DO CLIENTE
// =============================================================================

// PUT /api/{org_id}/customers/{id}/stage
#[utoipa::path(
    put,
    path = "/api/{org_id}/customers/{id}/stage",
    tag = "Customers",
    request_body = SetStagePayload,
    params(
        ("org_id" = Uuid, Path, description = "ID da organização"),
        ("id" = Uuid, Path, description = "ID do cliente")
    ),
    responses(
        (status = 200, description = "Entrada de histórico criada", body = StageHistoryEntry),
        (status = 204, description = "Mesma etapa, nada alterado"),
        (status = 404, description = "Cliente ou etapa não encontrados")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_customer_stage(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(path_params): Path<(Uuid, Uuid)>,
    Json(payload): Json<SetStagePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, customer_id) = path_params;
    let entry = app_state
        .funnel_service
        .change_stage(org.organization_id, customer_id, payload.stage_id, user.id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(match entry {
        Some(entry) => Json(entry).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

// GET /api/{org_id}/customers/{id}/stage-history
#[utoipa::path(
    get,
    path = "/api/{org_id}/customers/{id}/stage-history",
    tag = "Customers",
    params(
        ("org_id" = Uuid, Path, description = "ID da organização"),
        ("id" = Uuid, Path, description = "ID do cliente")
    ),
    responses(
        (status = 200, description = "Histórico de etapas", body = Vec<StageHistoryEntry>)
    ),
    security(("api_jwt" = []))
)]
pub async fn stage_history(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
    Path(path_params): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, customer_id) = path_params;
    let history = app_state
        .funnel_service
        .history(org.organization_id, customer_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(history))
}

// POST /api/{org_id}/customers/{id}/tags/{tag_id}/toggle
#[utoipa::path(
    post,
    path = "/api/{org_id}/customers/{id}/tags/{tag_id}/toggle",
    tag = "Customers",
    params(
        ("org_id" = Uuid, Path, description = "ID da organização"),
        ("id" = Uuid, Path, description = "ID do cliente"),
        ("tag_id" = Uuid, Path, description = "ID da tag")
    ),
    responses(
        (status = 200, description = "Conjunto de tags resultante", body = TagToggleResponse),
        (status = 404, description = "Cliente ou tag não encontrados")
    ),
    security(("api_jwt" = []))
)]
pub async fn toggle_customer_tag(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
    Path(path_params): Path<(Uuid, Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, customer_id, tag_id) = path_params;
    let response = app_state
        .tag_service
        .toggle(org.organization_id, customer_id, tag_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(response))
}

// =============================================================================
//  EXPORTAÇÃO
// =============================================================================

// GET /api/{org_id}/customers/export
#[utoipa::path(
    get,
    path = "/api/{org_id}/customers/export",
    tag = "Customers",
    params(("org_id" = Uuid, Path, description = "ID da organização"), ExportQuery, CustomerListQuery),
    responses(
        (status = 200, description = "Arquivo com todos os clientes do filtro"),
        (status = 400, description = "Coluna desconhecida")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_customers(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrgContext,
    Query(params): Query<ExportQuery>,
    Query(filters): Query<CustomerListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |app_err: AppError| app_err.to_api_error(&locale, &app_state.i18n_store);

    let columns = parse_columns(params.columns.as_deref()).map_err(to_api)?;
    let filters = filters.to_query().map_err(to_api)?;

    let file = app_state
        .export_service
        .export(org.organization_id, &filters, params.format, &columns)
        .await
        .map_err(to_api)?;

    let disposition = format!("attachment; filename=\"{}\"", file.filename);
    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sort_values_fall_back_to_created_at_desc() {
        assert_eq!(parse_sort(Some("name"), Some("asc")), (SortColumn::Name, SortDirection::Asc));
        assert_eq!(parse_sort(Some("stage"), Some("DESC")), (SortColumn::Stage, SortDirection::Desc));
        assert_eq!(parse_sort(Some("email"), Some("asc")), (SortColumn::CreatedAt, SortDirection::Desc));
        assert_eq!(parse_sort(Some("name"), Some("sideways")), (SortColumn::CreatedAt, SortDirection::Desc));
        assert_eq!(parse_sort(None, None), (SortColumn::CreatedAt, SortDirection::Desc));
    }

    #[test]
    fn known_column_without_direction_keeps_the_column() {
        assert_eq!(parse_sort(Some("name"), None), (SortColumn::Name, SortDirection::Asc));
        assert_eq!(parse_sort(Some("stage"), Some(" ")), (SortColumn::Stage, SortDirection::Asc));
        assert_eq!(parse_sort(Some("created_at"), None), (SortColumn::CreatedAt, SortDirection::Desc));
    }

    #[test]
    fn scope_defaults_to_customers_and_rejects_unknown_values() {
        assert_eq!(parse_scope(None).unwrap(), SearchScope::Customers);
        assert_eq!(parse_scope(Some("start-chat")).unwrap(), SearchScope::StartChat);
        assert!(matches!(parse_scope(Some("x1")), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn tag_ids_are_comma_separated_and_deduplicated() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let raw = format!("{a}, {b},,{a}");
        assert_eq!(parse_tag_ids(Some(&raw)).unwrap(), vec![a, b]);
        assert!(parse_tag_ids(None).unwrap().is_empty());
        assert!(matches!(parse_tag_ids(Some("nope")), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn list_query_applies_page_defaults() {
        let params = CustomerListQuery {
            page_size: Some(500),
            q: Some("ana".into()),
            ..Default::default()
        };
        let query = params.to_query().unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 100);
        assert_eq!(query.search.as_deref(), Some("ana"));
    }
}
