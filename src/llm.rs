//! Cliente de modelo de linguagem compatível com a API `/chat/completions`.
//!
//! O serviço de IA depende apenas do trait [`TextModel`]; o cliente HTTP
//! concreto é montado em `AppState` quando `LLM_API_KEY` está definido.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::error::AppError;

const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("falha ao montar cliente HTTP: {0}")]
    HttpClientBuild(String),
    #[error("falha na requisição: {0}")]
    ApiRequest(String),
    #[error("API respondeu {status}: {body}")]
    ApiResponse { status: u16, body: String },
    #[error("resposta inválida: {0}")]
    ApiParse(String),
    #[error("resposta sem conteúdo")]
    EmptyCompletion,
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        AppError::AiFailed(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// `None` usa o modelo padrão do cliente.
    pub model: Option<String>,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait::async_trait]
pub trait TextModel: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

pub struct OpenAiCompatClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl OpenAiCompatClient {
    pub fn new(api_key: String, base_url: &str, default_model: &str, timeout: Duration) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_model: default_model.to_string(),
        })
    }
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

fn parse_completion(text: &str) -> Result<String, LlmError> {
    let response: ChatCompletionResponse =
        serde_json::from_str(text).map_err(|e| LlmError::ApiParse(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(LlmError::EmptyCompletion)
}

#[async_trait::async_trait]
impl TextModel for OpenAiCompatClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let model = request.model.as_deref().unwrap_or(&self.default_model);
        let body = ChatCompletionBody {
            model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(LlmError::ApiResponse { status, body: text });
        }

        parse_completion(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_choice_content() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"  Olá, Roberto!  "}}]}"#;
        assert_eq!(parse_completion(raw).unwrap(), "Olá, Roberto!");
    }

    #[test]
    fn empty_or_missing_content_is_an_error() {
        assert!(matches!(parse_completion(r#"{"choices":[]}"#), Err(LlmError::EmptyCompletion)));
        assert!(matches!(
            parse_completion(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(LlmError::EmptyCompletion)
        ));
        assert!(matches!(parse_completion("not json"), Err(LlmError::ApiParse(_))));
    }

    #[test]
    fn roles_serialize_lowercase() {
        let msg = Message::new(Role::System, "x");
        assert_eq!(serde_json::to_value(&msg).unwrap()["role"], "system");
    }
}
