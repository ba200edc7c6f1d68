// src/services/contact_form_service.rs

use crate::{
    common::{error::AppError, rate_limit::RateLimiter},
    db::ContactRepository,
    models::partner::{ContactFormPayload, ContactMessage},
};

#[derive(Clone)]
pub struct ContactFormService {
    repo: ContactRepository,
    limiter: RateLimiter,
}

impl ContactFormService {
    pub fn new(repo: ContactRepository, limiter: RateLimiter) -> Self {
        Self { repo, limiter }
    }

    /// Grava a mensagem do formulário público; limitado por e-mail.
    pub async fn submit(&self, payload: &ContactFormPayload) -> Result<ContactMessage, AppError> {
        let email = payload.email.trim().to_lowercase();
        self.limiter.check_and_record(&email)?;

        let subject = payload.subject.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let stored = self
            .repo
            .insert_message(payload.name.trim(), &email, subject, payload.message.trim())
            .await?;

        tracing::info!(message_id = %stored.id, "mensagem de contato recebida");
        Ok(stored)
    }
}
