pub mod ai;
pub mod auth;
pub mod chats;
pub mod crm;
pub mod customers;
pub mod organizations;
pub mod partner;
pub mod public;
