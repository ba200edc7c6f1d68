// src/handlers/partner.rs

use axum::{extract::State, response::IntoResponse, Json};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::partner::{PartnerOrganization, PayoutLink},
};

// GET /api/profile/partner/organizations
#[utoipa::path(
    get,
    path = "/api/profile/partner/organizations",
    tag = "Partner",
    responses(
        (status = 200, description = "Organizações indicadas pelo parceiro", body = Vec<PartnerOrganization>),
        (status = 403, description = "Perfil de parceiro ativo obrigatório")
    ),
    security(("api_jwt" = []))
)]
pub async fn referred_organizations(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let organizations = app_state
        .partner_service
        .referred_organizations(&user)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(organizations))
}

// POST /api/profile/account-stripe/onboarding
#[utoipa::path(
    post,
    path = "/api/profile/account-stripe/onboarding",
    tag = "Partner",
    responses(
        (status = 200, description = "Link de cadastro da conta de recebimento", body = PayoutLink),
        (status = 503, description = "Pagamentos não configurados")
    ),
    security(("api_jwt" = []))
)]
pub async fn payout_onboarding(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let link = app_state
        .partner_service
        .onboarding_link(&user)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(link))
}

// POST /api/profile/account-stripe/manage
#[utoipa::path(
    post,
    path = "/api/profile/account-stripe/manage",
    tag = "Partner",
    responses(
        (status = 200, description = "Link do painel da conta", body = PayoutLink),
        (status = 409, description = "Conta de recebimento inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn payout_dashboard(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let link = app_state
        .partner_service
        .dashboard_link(&user)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(link))
}
