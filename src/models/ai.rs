// src/models/ai.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Configuração nomeada de IA ("agente") de uma organização.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,
    #[schema(example = "Atendente cordial")]
    pub name: String,
    #[schema(example = "Você é um atendente de uma clínica odontológica.")]
    pub instructions: String,
    pub model: Option<String>,
    pub temperature: f32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AiMode {
    Generate,
    Expand,
    Shorten,
    Improve,
    Formalize,
    Casualize,
    Custom,
}

/// Ação disparada por um atalho de teclado no painel de IA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "action", content = "mode", rename_all = "lowercase")]
pub enum ShortcutAction {
    Select(AiMode),
    Submit,
    Clear,
}

impl AiMode {
    /// Ordem dos atalhos 1..7.
    pub const ORDERED: [AiMode; 7] = [
        AiMode::Generate,
        AiMode::Expand,
        AiMode::Shorten,
        AiMode::Improve,
        AiMode::Formalize,
        AiMode::Casualize,
        AiMode::Custom,
    ];

    pub fn from_shortcut(key: &str, ctrl_or_cmd: bool) -> Option<ShortcutAction> {
        if ctrl_or_cmd {
            return match key {
                "Enter" => Some(ShortcutAction::Submit),
                "Backspace" => Some(ShortcutAction::Clear),
                _ => None,
            };
        }

        let digit: usize = key.parse().ok()?;
        let mode = Self::ORDERED.get(digit.checked_sub(1)?)?;
        Some(ShortcutAction::Select(*mode))
    }

    /// Mapa completo de atalhos, na ordem em que aparecem no painel.
    pub fn shortcut_bindings() -> Vec<ShortcutBinding> {
        let digits = (1..=Self::ORDERED.len()).map(|n| (n.to_string(), false));
        let combos = ["Enter", "Backspace"].into_iter().map(|k| (k.to_string(), true));

        digits
            .chain(combos)
            .filter_map(|(key, ctrl_or_cmd)| {
                Self::from_shortcut(&key, ctrl_or_cmd).map(|action| ShortcutBinding { key, ctrl_or_cmd, action })
            })
            .collect()
    }

    /// Instrução enviada ao modelo para cada modo.
    pub fn instruction(self) -> &'static str {
        match self {
            AiMode::Generate => {
                "Write the next reply to the customer based on the conversation. Answer only with the reply."
            }
            AiMode::Expand => "Expand the text with more detail while keeping its meaning and language.",
            AiMode::Shorten => "Make the text shorter and more direct while keeping its meaning and language.",
            AiMode::Improve => "Improve clarity, grammar and flow of the text without changing its language.",
            AiMode::Formalize => "Rewrite the text in a formal, professional tone in the same language.",
            AiMode::Casualize => "Rewrite the text in a friendly, casual tone in the same language.",
            AiMode::Custom => "Rewrite the text following the user's instructions.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutBinding {
    #[schema(example = "1")]
    pub key: String,
    pub ctrl_or_cmd: bool,
    pub action: ShortcutAction,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImproveTextResponse {
    pub text: String,
    pub mode: AiMode,
    pub prompt_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromptPayload {
    #[validate(length(min = 1, message = "required"))]
    pub name: String,
    #[validate(length(min = 1, message = "required"))]
    pub instructions: String,
    pub model: Option<String>,
    #[validate(range(min = 0.0, max = 2.0, message = "range"))]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImproveTextPayload {
    #[serde(default)]
    pub text: String,
    pub mode: AiMode,
    pub custom_instructions: Option<String>,
    pub chat_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_keys_select_modes_in_order() {
        assert_eq!(AiMode::from_shortcut("1", false), Some(ShortcutAction::Select(AiMode::Generate)));
        assert_eq!(AiMode::from_shortcut("4", false), Some(ShortcutAction::Select(AiMode::Improve)));
        assert_eq!(AiMode::from_shortcut("7", false), Some(ShortcutAction::Select(AiMode::Custom)));
        assert_eq!(AiMode::from_shortcut("8", false), None);
        assert_eq!(AiMode::from_shortcut("0", false), None);
    }

    #[test]
    fn modifier_combinations_submit_and_clear() {
        assert_eq!(AiMode::from_shortcut("Enter", true), Some(ShortcutAction::Submit));
        assert_eq!(AiMode::from_shortcut("Backspace", true), Some(ShortcutAction::Clear));
        assert_eq!(AiMode::from_shortcut("Enter", false), None);
        assert_eq!(AiMode::from_shortcut("1", true), None);
    }

    #[test]
    fn binding_list_covers_every_mode_and_both_combos() {
        let bindings = AiMode::shortcut_bindings();
        assert_eq!(bindings.len(), 9);
        assert_eq!(bindings[6].action, ShortcutAction::Select(AiMode::Custom));
        assert!(bindings[7].ctrl_or_cmd);
        assert_eq!(bindings[8].action, ShortcutAction::Clear);
    }
}
