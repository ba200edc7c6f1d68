use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

// Todos os erros de domínio e de infraestrutura da aplicação.
// Cada variante tem um código estável; a mensagem é traduzida no handler.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Nome obrigatório")]
    NameRequired,

    #[error("Contato obrigatório")]
    ContactRequired,

    #[error("Campos personalizados inválidos: {0:?}")]
    CustomFieldValidation(HashMap<String, String>),

    #[error("Contato incompatível com o canal")]
    InvalidContactForChannel,

    #[error("chatId ausente para geração")]
    MissingChatId,

    #[error("Instruções personalizadas ausentes")]
    CustomInstructionsRequired,

    #[error("Texto ausente")]
    TextRequired,

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Senha fraca")]
    WeakPassword,

    #[error("Limite de requisições excedido")]
    RateLimited,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("{0} não encontrado")]
    NotFound(&'static str),

    #[error("Usuário não é membro da organização")]
    NotAMember,

    #[error("Cargo insuficiente")]
    InsufficientRole,

    #[error("Código de convite inválido")]
    InvalidJoinCode,

    #[error("Usuário já é membro")]
    AlreadyMember,

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    #[error("Parceiro ativo obrigatório")]
    PartnerRequired,

    #[error("IA não configurada")]
    AiUnavailable,

    #[error("Falha na IA: {0}")]
    AiFailed(String),

    #[error("Pagamentos não configurados")]
    PaymentsUnavailable,

    #[error("Conta de recebimento inexistente")]
    PayoutAccountMissing,

    #[error("Falha no provedor de pagamentos: {0}")]
    PaymentsFailed(String),

    #[error("Falha na exportação: {0}")]
    ExportFailed(String),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Código estável usado como chave do catálogo de mensagens.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::NameRequired => "name_required",
            AppError::ContactRequired => "contact_required",
            AppError::CustomFieldValidation(_) => "custom_field_invalid",
            AppError::InvalidContactForChannel => "invalid_contact_for_channel",
            AppError::MissingChatId => "missing_chat_id",
            AppError::CustomInstructionsRequired => "custom_instructions_required",
            AppError::TextRequired => "text_required",
            AppError::EmailAlreadyExists => "email_already_exists",
            AppError::WeakPassword => "weak_password",
            AppError::RateLimited => "rate_limited",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::InvalidToken => "invalid_token",
            AppError::UserNotFound => "user_not_found",
            AppError::NotFound(_) => "not_found",
            AppError::NotAMember => "not_a_member",
            AppError::InsufficientRole => "insufficient_role",
            AppError::InvalidJoinCode => "invalid_join_code",
            AppError::AlreadyMember => "already_member",
            AppError::UniqueConstraintViolation(_) => "unique_violation",
            AppError::PartnerRequired => "partner_required",
            AppError::AiUnavailable => "ai_unavailable",
            AppError::AiFailed(_) => "ai_failed",
            AppError::PaymentsUnavailable => "payments_unavailable",
            AppError::PayoutAccountMissing => "payout_account_missing",
            AppError::PaymentsFailed(_) => "payments_failed",
            AppError::ExportFailed(_) => "export_failed",
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::NameRequired
            | AppError::ContactRequired
            | AppError::CustomFieldValidation(_)
            | AppError::InvalidContactForChannel
            | AppError::MissingChatId
            | AppError::CustomInstructionsRequired
            | AppError::TextRequired
            | AppError::WeakPassword
            | AppError::InvalidJoinCode => StatusCode::BAD_REQUEST,

            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,

            AppError::NotAMember | AppError::InsufficientRole | AppError::PartnerRequired => {
                StatusCode::FORBIDDEN
            }

            AppError::UserNotFound | AppError::NotFound(_) => StatusCode::NOT_FOUND,

            AppError::EmailAlreadyExists
            | AppError::AlreadyMember
            | AppError::UniqueConstraintViolation(_)
            | AppError::PayoutAccountMissing => StatusCode::CONFLICT,

            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,

            AppError::AiUnavailable | AppError::PaymentsUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            AppError::AiFailed(_) | AppError::PaymentsFailed(_) => StatusCode::BAD_GATEWAY,

            AppError::ExportFailed(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::ValidationError(errors) => {
                let mut details = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let codes: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), codes);
                }
                Some(json!(details))
            }
            AppError::CustomFieldValidation(errors) => Some(json!(errors)),
            _ => None,
        }
    }

    /// Converte o erro na resposta HTTP traduzida para o idioma do cliente.
    pub fn to_api_error(self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Erro Interno do Servidor: {}", self);
        } else {
            tracing::debug!(code = self.code(), "requisição rejeitada: {}", self);
        }

        ApiError {
            status,
            code: self.code().to_string(),
            error: i18n.translate(&locale.0, self.code()),
            details: self.details(),
        }
    }
}

// O erro já traduzido, pronto para virar resposta.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.error,
            "code": self.code,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> I18nStore {
        I18nStore::embedded().expect("catálogos embutidos válidos")
    }

    #[test]
    fn known_backend_cases_map_to_canned_messages() {
        let i18n = store();
        let pt = Locale("pt".into());

        let api = AppError::EmailAlreadyExists.to_api_error(&pt, &i18n);
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.error, "Este e-mail já está em uso.");

        let api = AppError::WeakPassword.to_api_error(&pt, &i18n);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.code, "weak_password");

        let api = AppError::RateLimited.to_api_error(&Locale("en".into()), &i18n);
        assert_eq!(api.status, StatusCode::TOO_MANY_REQUESTS);
        assert!(api.error.starts_with("Too many attempts"));
    }

    #[test]
    fn unexpected_errors_fall_back_to_generic_message() {
        let i18n = store();
        let err = AppError::InternalServerError(anyhow::anyhow!("conexão recusada"));
        let api = err.to_api_error(&Locale("en".into()), &i18n);

        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.code, "internal_error");
        assert!(!api.error.contains("conexão"));
    }

    #[test]
    fn custom_field_errors_are_returned_as_details() {
        let mut errors = HashMap::new();
        errors.insert("birthday".to_string(), "invalid_date_format".to_string());
        let api = AppError::CustomFieldValidation(errors).to_api_error(&Locale("en".into()), &store());

        let details = api.details.expect("detalhes presentes");
        assert_eq!(details["birthday"], "invalid_date_format");
    }
}
