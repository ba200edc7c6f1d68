pub mod ai;
pub mod auth;
pub mod chat;
pub mod crm;
pub mod customer;
pub mod organization;
pub mod partner;
