// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Public ---
        handlers::public::public_config,
        handlers::public::submit_contact_form,

        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::profile,

        // --- Organizations ---
        handlers::organizations::create_organization,
        handlers::organizations::list_my_organizations,
        handlers::organizations::join_organization,

        // --- Customers ---
        handlers::customers::list_customers,
        handlers::customers::lookup_customers,
        handlers::customers::get_customer,
        handlers::customers::create_customer,
        handlers::customers::update_customer,
        handlers::customers::delete_customer,
        handlers::customers::set_customer_stage,
        handlers::customers::stage_history,
        handlers::customers::toggle_customer_tag,
        handlers::customers::export_customers,

        // --- CRM ---
        handlers::crm::list_tags,
        handlers::crm::create_tag,
        handlers::crm::delete_tag,
        handlers::crm::list_funnels,
        handlers::crm::create_funnel,
        handlers::crm::create_stage,
        handlers::crm::update_stage,
        handlers::crm::delete_stage,
        handlers::crm::list_fields,
        handlers::crm::create_field,
        handlers::crm::list_countries,

        // --- Chats ---
        handlers::chats::list_channels,
        handlers::chats::list_teams,
        handlers::chats::start_chat,

        // --- AI ---
        handlers::ai::list_prompts,
        handlers::ai::create_prompt,
        handlers::ai::improve_text,
        handlers::ai::list_shortcuts,

        // --- Partner ---
        handlers::partner::referred_organizations,
        handlers::partner::payout_onboarding,
        handlers::partner::payout_dashboard,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Organizations ---
            models::organization::Organization,
            models::organization::MemberRole,
            models::organization::OrganizationMember,
            models::organization::MyOrganization,
            models::organization::CreateOrganizationPayload,
            models::organization::JoinOrganizationPayload,

            // --- Customers ---
            models::customer::ContactType,
            models::customer::Customer,
            models::customer::Tag,
            models::customer::ContactSummary,
            models::customer::TagSummary,
            models::customer::FunnelSummary,
            models::customer::StageSummary,
            models::customer::SortColumn,
            models::customer::SortDirection,
            models::customer::CustomerView,
            models::customer::CustomerPage,
            models::customer::ContactInput,
            models::customer::CreateCustomerPayload,
            models::customer::UpdateCustomerPayload,
            models::customer::CreateTagPayload,
            models::customer::TagToggleResponse,
            services::export_service::ExportFormat,

            // --- CRM ---
            models::crm::Funnel,
            models::crm::Stage,
            models::crm::FunnelWithStages,
            models::crm::StageHistoryEntry,
            models::crm::FieldType,
            models::crm::FieldDefinition,
            models::crm::CreateFunnelPayload,
            models::crm::StagePayload,
            models::crm::SetStagePayload,
            models::crm::CreateFieldPayload,

            // --- Chats ---
            models::chat::ChannelKind,
            models::chat::ChatStatus,
            models::chat::MessageDirection,
            models::chat::Team,
            models::chat::Channel,
            models::chat::Chat,
            models::chat::ChatMessage,
            models::chat::StartChatPayload,
            models::chat::StartChatResponse,

            // --- AI ---
            models::ai::Prompt,
            models::ai::AiMode,
            models::ai::CreatePromptPayload,
            models::ai::ImproveTextPayload,
            models::ai::ImproveTextResponse,
            models::ai::ShortcutAction,
            models::ai::ShortcutBinding,

            // --- Partner ---
            models::partner::PartnerOrganization,
            models::partner::PayoutLink,
            models::partner::PublicConfig,
            models::partner::ContactMessage,
            models::partner::ContactFormPayload,
        )
    ),
    tags(
        (name = "Public", description = "Rotas sem autenticação"),
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Organizations", description = "Organizações e Vínculos"),
        (name = "Customers", description = "Clientes, Busca e Exportação"),
        (name = "CRM", description = "Tags, Funis, Etapas e Campos"),
        (name = "Chats", description = "Canais e Início de Conversas"),
        (name = "AI", description = "Prompts e Melhoria de Texto"),
        (name = "Partner", description = "Portal do Parceiro e Recebimentos")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_org_scoped_paths_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/{org_id}/customers"));
        assert!(doc.paths.paths.contains_key("/api/{org_id}/prompts/{prompt_id}/improve-text"));
        let schemes = doc.components.expect("components").security_schemes;
        assert!(schemes.contains_key("api_jwt"));
    }
}
