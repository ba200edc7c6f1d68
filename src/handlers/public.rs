// src/handlers/public.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::partner::{ContactFormPayload, ContactMessage, PublicConfig},
};

// GET /api/health
pub async fn health() -> &'static str {
    "OK"
}

// GET /api/config/public
#[utoipa::path(
    get,
    path = "/api/config/public",
    tag = "Public",
    responses((status = 200, description = "Configuração exposta ao cliente", body = PublicConfig))
)]
pub async fn public_config(State(app_state): State<AppState>) -> Json<PublicConfig> {
    Json(PublicConfig {
        stripe_publishable_key: app_state.settings.stripe_publishable_key.clone(),
    })
}

// POST /api/user/contact
#[utoipa::path(
    post,
    path = "/api/user/contact",
    tag = "Public",
    request_body = ContactFormPayload,
    responses(
        (status = 201, description = "Mensagem registrada", body = ContactMessage),
        (status = 400, description = "Dados inválidos"),
        (status = 429, description = "Muitas mensagens")
    )
)]
pub async fn submit_contact_form(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<ContactFormPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let message = app_state
        .contact_form_service
        .submit(&payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(message)))
}
