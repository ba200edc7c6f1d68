//! Integração com o provedor de pagamentos para contas de repasse de parceiros.

use std::time::Duration;

use serde::Deserialize;

use crate::common::error::AppError;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum PaymentsError {
    #[error("falha ao montar cliente HTTP: {0}")]
    HttpClientBuild(String),
    #[error("falha na requisição: {0}")]
    Request(String),
    #[error("provedor respondeu {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("resposta inválida: {0}")]
    Parse(String),
}

impl From<PaymentsError> for AppError {
    fn from(e: PaymentsError) -> Self {
        AppError::PaymentsFailed(e.to_string())
    }
}

#[async_trait::async_trait]
pub trait PayoutProvider: Send + Sync {
    /// Cria a conta de repasse e devolve seu identificador.
    async fn create_account(&self, email: &str) -> Result<String, PaymentsError>;
    async fn onboarding_link(&self, account_id: &str, refresh_url: &str, return_url: &str)
        -> Result<String, PaymentsError>;
    async fn dashboard_link(&self, account_id: &str) -> Result<String, PaymentsError>;
}

pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Deserialize)]
struct UrlResponse {
    url: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: String, base_url: &str) -> Result<Self, PaymentsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| PaymentsError::HttpClientBuild(e.to_string()))?;

        Ok(Self {
            http,
            secret_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<T, PaymentsError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await
            .map_err(|e| PaymentsError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| PaymentsError::Request(e.to_string()))?;

        parse_response(status, &text)
    }
}

fn parse_response<T: for<'de> Deserialize<'de>>(status: u16, text: &str) -> Result<T, PaymentsError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorEnvelope>(text)
            .ok()
            .and_then(|e| e.error.message)
            .unwrap_or_else(|| text.to_string());
        return Err(PaymentsError::Rejected { status, message });
    }
    serde_json::from_str(text).map_err(|e| PaymentsError::Parse(e.to_string()))
}

#[async_trait::async_trait]
impl PayoutProvider for StripeClient {
    async fn create_account(&self, email: &str) -> Result<String, PaymentsError> {
        let account: IdResponse = self
            .post_form(
                "/accounts",
                &[
                    ("type", "express"),
                    ("email", email),
                    ("capabilities[transfers][requested]", "true"),
                ],
            )
            .await?;
        Ok(account.id)
    }

    async fn onboarding_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String, PaymentsError> {
        let link: UrlResponse = self
            .post_form(
                "/account_links",
                &[
                    ("account", account_id),
                    ("refresh_url", refresh_url),
                    ("return_url", return_url),
                    ("type", "account_onboarding"),
                ],
            )
            .await?;
        Ok(link.url)
    }

    async fn dashboard_link(&self, account_id: &str) -> Result<String, PaymentsError> {
        let link: UrlResponse = self
            .post_form(&format!("/accounts/{account_id}/login_links"), &[])
            .await?;
        Ok(link.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_requests_surface_provider_message() {
        let err = parse_response::<IdResponse>(400, r#"{"error":{"message":"Invalid email"}}"#).unwrap_err();
        match err {
            PaymentsError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid email");
            }
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[test]
    fn successful_response_is_parsed() {
        let link: UrlResponse = parse_response(200, r#"{"object":"account_link","url":"https://x"}"#).unwrap();
        assert_eq!(link.url, "https://x");
    }
}
