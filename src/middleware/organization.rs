// src/middleware/organization.rs

use axum::{
    extract::{FromRef, FromRequestParts, RawPathParams, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::{auth::User, organization::MemberRole},
};

const ORG_PATH_PARAM: &str = "org_id";

/// Organização da rota, já verificada contra o vínculo do usuário.
#[derive(Debug, Clone, Copy)]
pub struct OrgContext {
    pub organization_id: Uuid,
    pub role: MemberRole,
}

// Deve rodar depois do auth_guard (precisa do usuário nas extensions)
pub async fn org_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    params: RawPathParams,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let organization_id = params
        .iter()
        .find(|(name, _)| *name == ORG_PATH_PARAM)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
        .ok_or_else(|| to_api(AppError::NotFound("Organização")))?;

    let user_id = request
        .extensions()
        .get::<User>()
        .map(|u| u.id)
        .ok_or_else(|| to_api(AppError::InvalidToken))?;

    let membership = app_state
        .org_repo
        .find_active_membership(organization_id, user_id)
        .await
        .map_err(to_api)?
        .ok_or_else(|| to_api(AppError::NotAMember))?;

    request.extensions_mut().insert(OrgContext {
        organization_id,
        role: membership.role,
    });

    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for OrgContext
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<OrgContext>() {
            return Ok(*ctx);
        }

        let app_state = AppState::from_ref(state);
        let Ok(locale) = Locale::from_request_parts(parts, state).await;
        Err(AppError::NotAMember.to_api_error(&locale, &app_state.i18n_store))
    }
}
