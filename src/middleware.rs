pub mod auth;
pub mod i18n;
pub mod organization;
pub mod role;
