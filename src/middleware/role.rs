// src/middleware/role.rs

use std::marker::PhantomData;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, organization::OrgContext},
    models::organization::MemberRole,
};

/// 1. O trait que define o cargo mínimo exigido
pub trait RoleDef: Send + Sync + 'static {
    const MIN: MemberRole;
}

/// 2. O extrator (guardião)
pub struct RequireRole<T>(pub PhantomData<T>);

pub fn has_role(actual: MemberRole, required: MemberRole) -> bool {
    actual >= required
}

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let Ok(locale) = Locale::from_request_parts(parts, state).await;

        let ctx = OrgContext::from_request_parts(parts, state).await?;

        if !has_role(ctx.role, T::MIN) {
            return Err(AppError::InsufficientRole.to_api_error(&locale, &app_state.i18n_store));
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// CARGOS (TIPOS)
// ---

pub struct Admin;
impl RoleDef for Admin {
    const MIN: MemberRole = MemberRole::Admin;
}

pub struct Owner;
impl RoleDef for Owner {
    const MIN: MemberRole = MemberRole::Owner;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_roles_satisfy_lower_requirements() {
        assert!(has_role(MemberRole::Owner, Admin::MIN));
        assert!(has_role(MemberRole::Admin, Admin::MIN));
        assert!(!has_role(MemberRole::Agent, Admin::MIN));
        assert!(!has_role(MemberRole::Admin, Owner::MIN));
    }
}
