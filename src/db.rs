pub mod user_repo;
pub use user_repo::UserRepository;
pub mod organization_repo;
pub use organization_repo::OrganizationRepository;
pub mod customer_repo;
pub use customer_repo::CustomerRepository;
pub mod tag_repo;
pub use tag_repo::TagRepository;
pub mod funnel_repo;
pub use funnel_repo::FunnelRepository;
pub mod field_repo;
pub use field_repo::FieldRepository;
pub mod chat_repo;
pub use chat_repo::ChatRepository;
pub mod prompt_repo;
pub use prompt_repo::PromptRepository;
pub mod partner_repo;
pub use partner_repo::{ContactRepository, PartnerRepository};
