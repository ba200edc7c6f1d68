// src/services/field_service.rs

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::FieldRepository,
    models::crm::{CreateFieldPayload, FieldDefinition, FieldType},
};

/// Valor já validado e normalizado, pronto para gravar (`None` apaga).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWrite {
    pub field_id: Uuid,
    pub value: Option<Value>,
}

#[derive(Clone)]
pub struct FieldService {
    repo: FieldRepository,
}

impl FieldService {
    pub fn new(repo: FieldRepository) -> Self {
        Self { repo }
    }

    pub async fn create_definition(
        &self,
        organization_id: Uuid,
        payload: &CreateFieldPayload,
    ) -> Result<FieldDefinition, AppError> {
        let key_name = payload.key_name.trim();
        if !is_valid_key_name(key_name) {
            return Err(field_error(key_name, "invalid_key"));
        }

        let needs_options = matches!(payload.field_type, FieldType::Select | FieldType::Multiselect);
        let has_options = payload
            .options
            .as_ref()
            .and_then(Value::as_array)
            .is_some_and(|items| !items.is_empty() && items.iter().all(Value::is_string));
        if needs_options && !has_options {
            return Err(field_error(key_name, "options_required"));
        }

        self.repo
            .create_definition(
                organization_id,
                payload.name.trim(),
                key_name,
                payload.field_type,
                payload.options.as_ref().filter(|_| needs_options),
                payload.is_required,
            )
            .await
    }

    pub async fn list_definitions<'e, E>(&self, executor: E, organization_id: Uuid) -> Result<Vec<FieldDefinition>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_definitions(executor, organization_id).await
    }

    pub async fn write_values(
        &self,
        conn: &mut sqlx::PgConnection,
        customer_id: Uuid,
        writes: &[FieldWrite],
    ) -> Result<(), AppError> {
        for write in writes {
            match &write.value {
                Some(value) => self.repo.upsert_value(&mut *conn, customer_id, write.field_id, value).await?,
                None => self.repo.delete_value(&mut *conn, customer_id, write.field_id).await?,
            }
        }
        Ok(())
    }
}

// --- MOTOR DE VALIDAÇÃO ---

/// Valida `values` contra as definições da organização.
/// Com `require_all`, campos obrigatórios ausentes também são erro (criação).
/// Erros são acumulados por chave: `key_name -> código`.
pub fn validate_field_values(
    definitions: &[FieldDefinition],
    values: &HashMap<String, Value>,
    require_all: bool,
) -> Result<Vec<FieldWrite>, AppError> {
    let mut errors: HashMap<String, String> = HashMap::new();
    let mut writes = Vec::new();

    for key in values.keys() {
        if !definitions.iter().any(|d| &d.key_name == key) {
            errors.insert(key.clone(), "unknown_field".to_string());
        }
    }

    for def in definitions {
        let value = values.get(&def.key_name);
        let is_blank = match value {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(Value::Array(items)) => items.is_empty(),
            Some(_) => false,
        };

        if is_blank {
            if def.is_required && (require_all || value.is_some()) {
                errors.insert(def.key_name.clone(), "required".to_string());
            } else if value.is_some() {
                writes.push(FieldWrite { field_id: def.id, value: None });
            }
            continue;
        }

        // `is_blank` cobre o None
        let Some(val) = value else { continue };

        match normalize_value(def, val) {
            Ok(normalized) => writes.push(FieldWrite { field_id: def.id, value: Some(normalized) }),
            Err(code) => {
                errors.insert(def.key_name.clone(), code.to_string());
            }
        }
    }

    if !errors.is_empty() {
        return Err(AppError::CustomFieldValidation(errors));
    }

    Ok(writes)
}

fn normalize_value(def: &FieldDefinition, val: &Value) -> Result<Value, &'static str> {
    match def.field_type {
        FieldType::Text => val.as_str().map(|s| Value::String(s.trim().to_string())).ok_or("invalid_text"),
        FieldType::Number => {
            if val.is_number() {
                Ok(val.clone())
            } else {
                Err("invalid_number")
            }
        }
        FieldType::Boolean => val.as_bool().map(Value::Bool).ok_or("invalid_boolean"),
        FieldType::Date => val
            .as_str()
            .and_then(parse_calendar_date)
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .ok_or("invalid_date_format"),
        FieldType::Select => {
            let options = def.option_values();
            match val.as_str() {
                Some(choice) if options.contains(&choice) => Ok(val.clone()),
                Some(_) => Err("invalid_option"),
                None => Err("invalid_text"),
            }
        }
        FieldType::Multiselect => {
            let options = def.option_values();
            let items = val.as_array().ok_or("invalid_list")?;
            let all_valid = items
                .iter()
                .all(|item| item.as_str().is_some_and(|choice| options.contains(&choice)));
            if all_valid {
                Ok(val.clone())
            } else {
                Err("invalid_option")
            }
        }
    }
}

/// Data de calendário como foi escrita: `YYYY-MM-DD` ou um RFC 3339,
/// do qual se usa a data no próprio fuso informado (sem converter para UTC).
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive())
}

fn is_valid_key_name(key: &str) -> bool {
    !key.is_empty()
        && key.starts_with(|c: char| c.is_ascii_lowercase())
        && key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn field_error(key: &str, code: &str) -> AppError {
    AppError::CustomFieldValidation(HashMap::from([(key.to_string(), code.to_string())]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn def(key: &str, field_type: FieldType, required: bool, options: Option<Value>) -> FieldDefinition {
        FieldDefinition {
            id: Uuid::new_v4(),
            organization_id: Uuid::nil(),
            name: key.to_string(),
            key_name: key.to_string(),
            field_type,
            options,
            is_required: required,
            position: 0,
            created_at: Utc::now(),
        }
    }

    fn errors_of(result: Result<Vec<FieldWrite>, AppError>) -> HashMap<String, String> {
        match result {
            Err(AppError::CustomFieldValidation(errors)) => errors,
            other => panic!("esperava erro de validação, veio {other:?}"),
        }
    }

    #[test]
    fn date_keeps_calendar_day_as_written() {
        // 23:30 em São Paulo já é dia seguinte em UTC; a data escrita vence
        let parsed = parse_calendar_date("1990-05-14T23:30:00-03:00").unwrap();
        assert_eq!(parsed, NaiveDate::from_ymd_opt(1990, 5, 14).unwrap());

        assert_eq!(parse_calendar_date("2024-02-29"), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(parse_calendar_date("14/05/1990"), None);
    }

    #[test]
    fn dates_are_stored_normalised() {
        let defs = vec![def("birthday", FieldType::Date, false, None)];
        let values = HashMap::from([("birthday".to_string(), json!("1990-05-14T08:00:00+09:00"))]);

        let writes = validate_field_values(&defs, &values, true).unwrap();
        assert_eq!(writes[0].value, Some(json!("1990-05-14")));
    }

    #[test]
    fn required_fields_only_enforced_on_create_or_when_cleared() {
        let defs = vec![def("segment", FieldType::Text, true, None)];

        let errors = errors_of(validate_field_values(&defs, &HashMap::new(), true));
        assert_eq!(errors["segment"], "required");

        assert!(validate_field_values(&defs, &HashMap::new(), false).unwrap().is_empty());

        let cleared = HashMap::from([("segment".to_string(), json!(""))]);
        let errors = errors_of(validate_field_values(&defs, &cleared, false));
        assert_eq!(errors["segment"], "required");
    }

    #[test]
    fn select_and_multiselect_must_use_declared_options() {
        let defs = vec![
            def("channel", FieldType::Select, false, Some(json!(["Varejo", "Atacado"]))),
            def("interests", FieldType::Multiselect, false, Some(json!(["A", "B", "C"]))),
        ];

        let ok = HashMap::from([
            ("channel".to_string(), json!("Varejo")),
            ("interests".to_string(), json!(["A", "C"])),
        ]);
        assert_eq!(validate_field_values(&defs, &ok, false).unwrap().len(), 2);

        let bad = HashMap::from([
            ("channel".to_string(), json!("Online")),
            ("interests".to_string(), json!("A")),
        ]);
        let errors = errors_of(validate_field_values(&defs, &bad, false));
        assert_eq!(errors["channel"], "invalid_option");
        assert_eq!(errors["interests"], "invalid_list");
    }

    #[test]
    fn unknown_keys_and_wrong_types_are_reported_together() {
        let defs = vec![
            def("score", FieldType::Number, false, None),
            def("vip", FieldType::Boolean, false, None),
        ];
        let values = HashMap::from([
            ("score".to_string(), json!("dez")),
            ("vip".to_string(), json!("sim")),
            ("color".to_string(), json!("azul")),
        ]);

        let errors = errors_of(validate_field_values(&defs, &values, false));
        assert_eq!(errors.len(), 3);
        assert_eq!(errors["score"], "invalid_number");
        assert_eq!(errors["vip"], "invalid_boolean");
        assert_eq!(errors["color"], "unknown_field");
    }

    #[test]
    fn null_on_optional_field_deletes_value() {
        let defs = vec![def("notes", FieldType::Text, false, None)];
        let values = HashMap::from([("notes".to_string(), Value::Null)]);

        let writes = validate_field_values(&defs, &values, false).unwrap();
        assert_eq!(writes, vec![FieldWrite { field_id: defs[0].id, value: None }]);
    }

    #[test]
    fn key_names_are_snake_case() {
        assert!(is_valid_key_name("birthday"));
        assert!(is_valid_key_name("last_visit_2"));
        assert!(!is_valid_key_name("Birthday"));
        assert!(!is_valid_key_name("2nd"));
        assert!(!is_valid_key_name("data-nasc"));
    }
}
