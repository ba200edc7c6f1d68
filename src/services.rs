pub mod ai_service;
pub mod auth;
pub mod chat_service;
pub mod contact_form_service;
pub mod customer_service;
pub mod export_service;
pub mod field_service;
pub mod funnel_service;
pub mod organization_service;
pub mod partner_service;
pub mod tag_service;
