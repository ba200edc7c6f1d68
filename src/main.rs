//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod llm;
mod middleware;
mod models;
mod payments;
mod services;

use crate::common::events::spawn_event_logger;
use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::{auth::auth_guard, organization::org_guard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Falha de configuração impede a aplicação de iniciar
    let app_state = AppState::new().await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let _event_logger = spawn_event_logger(&app_state.events);

    // Rotas públicas
    let public_routes = Router::new()
        .route("/health", get(handlers::public::health))
        .route("/config/public", get(handlers::public::public_config))
        .route("/user/contact", post(handlers::public::submit_contact_form))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login));

    // Rotas do usuário autenticado, sem organização
    let user_routes = Router::new()
        .route("/profile", get(handlers::auth::profile))
        .route("/profile/partner/organizations", get(handlers::partner::referred_organizations))
        .route("/profile/account-stripe/onboarding", post(handlers::partner::payout_onboarding))
        .route("/profile/account-stripe/manage", post(handlers::partner::payout_dashboard))
        .route(
            "/organizations",
            post(handlers::organizations::create_organization)
                .get(handlers::organizations::list_my_organizations),
        )
        .route("/{org_id}/member/join", post(handlers::organizations::join_organization))
        .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Rotas da organização: auth primeiro, depois o vínculo
    let org_routes = Router::new()
        // Clientes
        .route(
            "/{org_id}/customers",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route("/{org_id}/customers/lookup", get(handlers::customers::lookup_customers))
        .route("/{org_id}/customers/export", get(handlers::customers::export_customers))
        .route(
            "/{org_id}/customers/{id}",
            get(handlers::customers::get_customer)
                .put(handlers::customers::update_customer)
                .delete(handlers::customers::delete_customer),
        )
        .route("/{org_id}/customers/{id}/stage", put(handlers::customers::set_customer_stage))
        .route("/{org_id}/customers/{id}/stage-history", get(handlers::customers::stage_history))
        .route(
            "/{org_id}/customers/{id}/tags/{tag_id}/toggle",
            post(handlers::customers::toggle_customer_tag),
        )
        .route("/{org_id}/contacts/countries", get(handlers::crm::list_countries))
        // Tags
        .route("/{org_id}/tags", get(handlers::crm::list_tags).post(handlers::crm::create_tag))
        .route("/{org_id}/tags/{id}", delete(handlers::crm::delete_tag))
        // Funis e etapas
        .route("/{org_id}/funnels", get(handlers::crm::list_funnels).post(handlers::crm::create_funnel))
        .route("/{org_id}/funnels/{id}/stages", post(handlers::crm::create_stage))
        .route(
            "/{org_id}/stages/{id}",
            put(handlers::crm::update_stage).delete(handlers::crm::delete_stage),
        )
        // Campos personalizados
        .route("/{org_id}/fields", get(handlers::crm::list_fields).post(handlers::crm::create_field))
        // Conversas
        .route("/{org_id}/channels", get(handlers::chats::list_channels))
        .route("/{org_id}/teams", get(handlers::chats::list_teams))
        .route("/{org_id}/chats/start", post(handlers::chats::start_chat))
        // IA
        .route("/{org_id}/prompts", get(handlers::ai::list_prompts).post(handlers::ai::create_prompt))
        .route("/{org_id}/prompts/shortcuts", get(handlers::ai::list_shortcuts))
        .route("/{org_id}/prompts/{prompt_id}/improve-text", post(handlers::ai::improve_text))
        // A última camada adicionada roda primeiro
        .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), org_guard))
        .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let api_routes = Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(org_routes);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let bind_addr = app_state.settings.bind_addr.clone();

    let app = Router::new()
        .nest("/api", api_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
