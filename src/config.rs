// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use uuid::Uuid;

use crate::{
    common::{
        events::EventBus, i18n::I18nStore, keyed_mutex::KeyedMutex, rate_limit::RateLimiter,
        sequence::SearchSequencer,
    },
    db::{
        ChatRepository, ContactRepository, CustomerRepository, FieldRepository, FunnelRepository, OrganizationRepository,
        PartnerRepository, PromptRepository, TagRepository, UserRepository,
    },
    llm::{OpenAiCompatClient, TextModel},
    payments::{PayoutProvider, StripeClient},
    services::{
        ai_service::AiService, auth::AuthService, chat_service::ChatService,
        contact_form_service::ContactFormService, customer_service::CustomerService,
        export_service::ExportService, field_service::FieldService, funnel_service::FunnelService,
        organization_service::OrganizationService, partner_service::PartnerService,
        tag_service::TagService,
    },
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_PUBLIC_APP_URL: &str = "http://localhost:5173";
const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_STRIPE_BASE_URL: &str = "https://api.stripe.com/v1";

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub public_app_url: String,

    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_request_timeout: Duration,

    pub stripe_secret_key: Option<String>,
    pub stripe_publishable_key: Option<String>,

    pub rate_limit_login: usize,
    pub rate_limit_contact_form: usize,
    pub rate_limit_ai: usize,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
            database_max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 5),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            public_app_url: env::var("PUBLIC_APP_URL")
                .unwrap_or_else(|_| DEFAULT_PUBLIC_APP_URL.to_string())
                .trim_end_matches('/')
                .to_string(),

            llm_api_key: env_non_empty("LLM_API_KEY"),
            llm_base_url: env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_LLM_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            llm_request_timeout: Duration::from_secs(env_parse("LLM_REQUEST_TIMEOUT_SECS", 120)),

            stripe_secret_key: env_non_empty("STRIPE_SECRET_KEY"),
            stripe_publishable_key: env_non_empty("STRIPE_PUBLISHABLE_KEY"),

            rate_limit_login: env_parse("RATE_LIMIT_LOGIN", 5),
            rate_limit_contact_form: env_parse("RATE_LIMIT_CONTACT_FORM", 3),
            rate_limit_ai: env_parse("RATE_LIMIT_AI", 20),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Arc<Settings>,
    pub i18n_store: Arc<I18nStore>,
    pub events: EventBus,

    pub org_repo: OrganizationRepository,

    pub auth_service: AuthService,
    pub organization_service: OrganizationService,
    pub customer_service: CustomerService,
    pub tag_service: TagService,
    pub funnel_service: FunnelService,
    pub field_service: FieldService,
    pub chat_service: ChatService,
    pub ai_service: AiService,
    pub export_service: ExportService,
    pub partner_service: PartnerService,
    pub contact_form_service: ContactFormService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let settings = Settings::from_env()?;

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Self::build(db_pool, settings)
    }

    /// Monta o gráfico de dependências a partir de uma pool já criada.
    pub fn build(db_pool: PgPool, settings: Settings) -> anyhow::Result<Self> {
        let i18n_store = Arc::new(I18nStore::embedded()?);
        let events = EventBus::default();

        let user_repo = UserRepository::new(db_pool.clone());
        let org_repo = OrganizationRepository::new(db_pool.clone());
        let customer_repo = CustomerRepository::new(db_pool.clone());
        let tag_repo = TagRepository::new(db_pool.clone());
        let funnel_repo = FunnelRepository::new(db_pool.clone());
        let field_repo = FieldRepository::new(db_pool.clone());
        let chat_repo = ChatRepository::new(db_pool.clone());
        let prompt_repo = PromptRepository::new(db_pool.clone());
        let partner_repo = PartnerRepository::new(db_pool.clone());

        let text_model: Option<Arc<dyn TextModel>> = match &settings.llm_api_key {
            Some(key) => Some(Arc::new(OpenAiCompatClient::new(
                key.clone(),
                &settings.llm_base_url,
                &settings.llm_model,
                settings.llm_request_timeout,
            )?)),
            None => {
                tracing::warn!("LLM_API_KEY ausente: recursos de IA desativados");
                None
            }
        };

        let payouts: Option<Arc<dyn PayoutProvider>> = match &settings.stripe_secret_key {
            Some(key) => Some(Arc::new(StripeClient::new(key.clone(), DEFAULT_STRIPE_BASE_URL)?)),
            None => {
                tracing::warn!("STRIPE_SECRET_KEY ausente: onboarding de parceiros desativado");
                None
            }
        };

        let minute = Duration::from_secs(60);
        let login_limiter = RateLimiter::new(settings.rate_limit_login, minute);
        let contact_limiter = RateLimiter::new(settings.rate_limit_contact_form, minute * 10);
        let ai_limiter = RateLimiter::new(settings.rate_limit_ai, minute);

        // Fila por cliente compartilhada entre os serviços que alteram clientes
        let mutations = KeyedMutex::<Uuid>::new();
        let search_sequencer = SearchSequencer::new();

        let field_service = FieldService::new(field_repo);
        let customer_service = CustomerService::new(
            customer_repo.clone(),
            tag_repo.clone(),
            funnel_repo.clone(),
            field_service.clone(),
            db_pool.clone(),
            events.clone(),
            search_sequencer.clone(),
            mutations.clone(),
        );

        Ok(Self {
            auth_service: AuthService::new(user_repo.clone(), settings.jwt_secret.clone(), login_limiter),
            organization_service: OrganizationService::new(org_repo.clone(), funnel_repo.clone(), db_pool.clone(), events.clone()),
            tag_service: TagService::new(tag_repo, customer_repo.clone(), db_pool.clone(), events.clone(), mutations.clone()),
            funnel_service: FunnelService::new(funnel_repo, customer_repo, db_pool.clone(), events.clone(), mutations),
            chat_service: ChatService::new(chat_repo.clone(), customer_service.clone(), db_pool.clone(), events.clone()),
            ai_service: AiService::new(prompt_repo, chat_repo, text_model, ai_limiter),
            export_service: ExportService::new(customer_service.clone()),
            partner_service: PartnerService::new(partner_repo, user_repo, payouts, settings.public_app_url.clone()),
            contact_form_service: ContactFormService::new(ContactRepository::new(db_pool.clone()), contact_limiter),
            field_service,
            customer_service,
            org_repo,
            events,
            i18n_store,
            settings: Arc::new(settings),
            db_pool,
        })
    }
}
