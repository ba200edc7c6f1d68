// src/services/export_service.rs

use std::future::Future;

use rust_xlsxwriter::{Format, Workbook};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::customer::{ContactType, CustomerView},
    services::customer_service::{CustomerQuery, CustomerService},
};

pub const EXPORT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
    Json,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ExportFormat::Json => "application/json",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportColumn {
    Name,
    Stage,
    Funnel,
    Tags,
    /// Expande em uma coluna por tipo de contato.
    Contacts,
    CreatedAt,
    Field(String),
}

impl ExportColumn {
    pub const DEFAULTS: [ExportColumn; 6] = [
        ExportColumn::Name,
        ExportColumn::Stage,
        ExportColumn::Funnel,
        ExportColumn::Tags,
        ExportColumn::Contacts,
        ExportColumn::CreatedAt,
    ];

    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(key) = raw.strip_prefix("field:") {
            return (!key.is_empty()).then(|| ExportColumn::Field(key.to_string()));
        }
        match raw {
            "name" => Some(ExportColumn::Name),
            "stage" => Some(ExportColumn::Stage),
            "funnel" => Some(ExportColumn::Funnel),
            "tags" => Some(ExportColumn::Tags),
            "contacts" => Some(ExportColumn::Contacts),
            "created_at" => Some(ExportColumn::CreatedAt),
            _ => None,
        }
    }

    fn key(&self) -> String {
        match self {
            ExportColumn::Name => "name".to_string(),
            ExportColumn::Stage => "stage".to_string(),
            ExportColumn::Funnel => "funnel".to_string(),
            ExportColumn::Tags => "tags".to_string(),
            ExportColumn::Contacts => "contacts".to_string(),
            ExportColumn::CreatedAt => "created_at".to_string(),
            ExportColumn::Field(key) => key.clone(),
        }
    }
}

/// Lista separada por vírgula; vazia usa as colunas padrão.
pub fn parse_columns(raw: Option<&str>) -> Result<Vec<ExportColumn>, AppError> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Ok(ExportColumn::DEFAULTS.to_vec());
    };

    let mut columns = Vec::new();
    for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let column = ExportColumn::parse(part).ok_or_else(|| {
            let mut errors = validator::ValidationErrors::new();
            let mut error = validator::ValidationError::new("unknown_column");
            error.message = Some(format!("unknown_column:{}", part.trim()).into());
            errors.add("columns", error);
            AppError::ValidationError(errors)
        })?;
        if !columns.contains(&column) {
            columns.push(column);
        }
    }
    Ok(columns)
}

pub fn headers(columns: &[ExportColumn]) -> Vec<String> {
    let mut out = Vec::new();
    for column in columns {
        match column {
            ExportColumn::Contacts => out.extend(ContactType::ALL.iter().map(|t| t.label().to_string())),
            ExportColumn::Name => out.push("Name".to_string()),
            ExportColumn::Stage => out.push("Stage".to_string()),
            ExportColumn::Funnel => out.push("Funnel".to_string()),
            ExportColumn::Tags => out.push("Tags".to_string()),
            ExportColumn::CreatedAt => out.push("Created at".to_string()),
            ExportColumn::Field(key) => out.push(key.clone()),
        }
    }
    out
}

fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()))
            .collect::<Vec<_>>()
            .join("; "),
        Some(other) => other.to_string(),
    }
}

/// Células de uma linha, na mesma ordem de `headers`.
pub fn row_cells(customer: &CustomerView, columns: &[ExportColumn]) -> Vec<String> {
    let mut out = Vec::new();
    for column in columns {
        match column {
            ExportColumn::Name => out.push(customer.name.clone()),
            ExportColumn::Stage => out.push(customer.stage.as_ref().map(|s| s.name.clone()).unwrap_or_default()),
            ExportColumn::Funnel => out.push(
                customer
                    .stage
                    .as_ref()
                    .map(|s| s.funnel.name.clone())
                    .unwrap_or_default(),
            ),
            ExportColumn::Tags => out.push(
                customer
                    .tags
                    .iter()
                    .map(|t| t.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            ExportColumn::Contacts => {
                let grouped = customer.contacts_by_type();
                for contact_type in ContactType::ALL {
                    out.push(grouped.get(&contact_type).map(|v| v.join("; ")).unwrap_or_default());
                }
            }
            ExportColumn::CreatedAt => out.push(customer.created_at.to_rfc3339()),
            ExportColumn::Field(key) => out.push(field_text(customer.field_values.get(key))),
        }
    }
    out
}

pub fn render_csv(customers: &[CustomerView], columns: &[ExportColumn]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(vec![]);

    writer.write_record(headers(columns)).map_err(export_err)?;
    for customer in customers {
        writer.write_record(row_cells(customer, columns)).map_err(export_err)?;
    }

    writer.into_inner().map_err(|e| AppError::ExportFailed(e.to_string()))
}

pub fn render_xlsx(customers: &[CustomerView], columns: &[ExportColumn]) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Clientes").map_err(export_err)?;

    let header_format = Format::new().set_bold();
    for (col, header) in headers(columns).iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, header, &header_format)
            .map_err(export_err)?;
    }

    for (row, customer) in customers.iter().enumerate() {
        for (col, cell) in row_cells(customer, columns).iter().enumerate() {
            worksheet
                .write_string(row as u32 + 1, col as u16, cell)
                .map_err(export_err)?;
        }
    }

    workbook.save_to_buffer().map_err(export_err)
}

/// Objetos com tags e contatos aninhados; só as colunas pedidas aparecem.
pub fn render_json(customers: &[CustomerView], columns: &[ExportColumn]) -> Result<Vec<u8>, AppError> {
    let items: Vec<Value> = customers
        .iter()
        .map(|customer| {
            let mut obj = Map::new();
            obj.insert("id".to_string(), json!(customer.id));
            let mut fields = Map::new();

            for column in columns {
                match column {
                    ExportColumn::Name => {
                        obj.insert(column.key(), json!(customer.name));
                    }
                    ExportColumn::Stage => {
                        obj.insert(column.key(), json!(customer.stage.as_ref().map(|s| &s.name)));
                    }
                    ExportColumn::Funnel => {
                        obj.insert(column.key(), json!(customer.stage.as_ref().map(|s| &s.funnel.name)));
                    }
                    ExportColumn::Tags => {
                        obj.insert(column.key(), json!(customer.tags));
                    }
                    ExportColumn::Contacts => {
                        let grouped: Map<String, Value> = customer
                            .contacts_by_type()
                            .into_iter()
                            .map(|(t, values)| (t.as_str().to_string(), json!(values)))
                            .collect();
                        obj.insert(column.key(), Value::Object(grouped));
                    }
                    ExportColumn::CreatedAt => {
                        obj.insert(column.key(), json!(customer.created_at));
                    }
                    ExportColumn::Field(key) => {
                        fields.insert(key.clone(), customer.field_values.get(key).cloned().unwrap_or(Value::Null));
                    }
                }
            }

            if !fields.is_empty() {
                obj.insert("fields".to_string(), Value::Object(fields));
            }
            Value::Object(obj)
        })
        .collect();

    serde_json::to_vec_pretty(&items).map_err(export_err)
}

fn export_err(e: impl std::fmt::Display) -> AppError {
    AppError::ExportFailed(e.to_string())
}

/// Busca páginas em sequência (1, 2, ...) até vir uma página incompleta.
pub async fn collect_all_pages<F, Fut>(page_size: u32, mut fetch: F) -> Result<Vec<CustomerView>, AppError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<CustomerView>, AppError>>,
{
    let mut all = Vec::new();
    let mut page = 1;
    loop {
        let batch = fetch(page).await?;
        let short = (batch.len() as u32) < page_size;
        all.extend(batch);
        if short {
            return Ok(all);
        }
        page += 1;
    }
}

pub struct ExportFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

#[derive(Clone)]
pub struct ExportService {
    customers: CustomerService,
}

impl ExportService {
    pub fn new(customers: CustomerService) -> Self {
        Self { customers }
    }

    pub async fn export(
        &self,
        organization_id: Uuid,
        filters: &CustomerQuery,
        format: ExportFormat,
        columns: &[ExportColumn],
    ) -> Result<ExportFile, AppError> {
        let rows = collect_all_pages(EXPORT_PAGE_SIZE, |page| {
            let mut query = filters.clone();
            query.page = page;
            query.page_size = EXPORT_PAGE_SIZE;
            async move {
                let (items, _) = self.customers.search_page(organization_id, &query).await?;
                Ok(items)
            }
        })
        .await?;

        let bytes = match format {
            ExportFormat::Csv => render_csv(&rows, columns)?,
            ExportFormat::Xlsx => render_xlsx(&rows, columns)?,
            ExportFormat::Json => render_json(&rows, columns)?,
        };

        tracing::info!(%organization_id, rows = rows.len(), format = format.extension(), "exportação gerada");

        Ok(ExportFile {
            bytes,
            content_type: format.content_type(),
            filename: format!("clientes-{}.{}", chrono::Utc::now().format("%Y%m%d"), format.extension()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::customer::{ContactSummary, FunnelSummary, StageSummary, TagSummary};
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    fn customer(name: &str) -> CustomerView {
        CustomerView {
            id: Uuid::new_v4(),
            name: name.to_string(),
            stage_id: None,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            contacts: vec![
                ContactSummary::new(Uuid::new_v4(), ContactType::Whatsapp, "+5511999999999".to_string()),
                ContactSummary::new(Uuid::new_v4(), ContactType::Email, "roberto@example.com".to_string()),
                ContactSummary::new(Uuid::new_v4(), ContactType::Whatsapp, "+5511888888888".to_string()),
            ],
            tags: vec![TagSummary { id: Uuid::new_v4(), name: "VIP".to_string(), color: "#f00".to_string() }],
            field_values: HashMap::from([("birthday".to_string(), json!("1990-05-14"))]),
            stage: Some(StageSummary {
                id: Uuid::new_v4(),
                name: "Novo contato".to_string(),
                color: "#3b82f6".to_string(),
                position: 0,
                funnel: FunnelSummary { id: Uuid::new_v4(), name: "Vendas".to_string() },
            }),
        }
    }

    #[test]
    fn contacts_expand_into_one_column_per_type() {
        let columns = vec![ExportColumn::Name, ExportColumn::Contacts];
        let header = headers(&columns);
        assert_eq!(header.len(), 1 + ContactType::ALL.len());
        assert_eq!(header[1], "Email");
        assert_eq!(header[2], "WhatsApp");

        let cells = row_cells(&customer("Roberto Silva"), &columns);
        assert_eq!(cells[1], "roberto@example.com");
        assert_eq!(cells[2], "+5511999999999; +5511888888888");
        assert_eq!(cells[3], "");
    }

    #[test]
    fn csv_quotes_every_field() {
        let columns = parse_columns(Some("name,stage,funnel,tags,field:birthday")).unwrap();
        let bytes = render_csv(&[customer("Silva, Roberto")], &columns).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();

        assert_eq!(lines.next().unwrap(), r#""Name","Stage","Funnel","Tags","birthday""#);
        assert_eq!(lines.next().unwrap(), r#""Silva, Roberto","Novo contato","Vendas","VIP","1990-05-14""#);
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn json_nests_tags_and_contacts() {
        let columns = ExportColumn::DEFAULTS.to_vec();
        let bytes = render_json(&[customer("Roberto Silva"), customer("Ana")], &columns).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["tags"][0]["name"], "VIP");
        assert_eq!(parsed[0]["contacts"]["whatsapp"], json!(["+5511999999999", "+5511888888888"]));
        assert_eq!(parsed[0]["funnel"], "Vendas");
        assert!(parsed[0].get("fields").is_none());
    }

    #[test]
    fn xlsx_renders_a_workbook() {
        let bytes = render_xlsx(&[customer("Roberto Silva")], &ExportColumn::DEFAULTS).unwrap();
        // XLSX é um zip
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn unknown_columns_are_rejected_and_duplicates_collapsed() {
        assert!(matches!(parse_columns(Some("name,phone")), Err(AppError::ValidationError(_))));
        assert_eq!(parse_columns(Some("name, name ,tags")).unwrap(), vec![ExportColumn::Name, ExportColumn::Tags]);
        assert_eq!(parse_columns(None).unwrap().len(), ExportColumn::DEFAULTS.len());
    }

    #[tokio::test]
    async fn pages_are_fetched_until_a_short_page() {
        let total = 250;
        let all: Vec<CustomerView> = (0..total).map(|i| customer(&format!("Cliente {i}"))).collect();
        let mut requested = Vec::new();

        let rows = collect_all_pages(EXPORT_PAGE_SIZE, |page| {
            requested.push(page);
            let start = ((page - 1) * EXPORT_PAGE_SIZE) as usize;
            let batch: Vec<_> = all.iter().skip(start).take(EXPORT_PAGE_SIZE as usize).cloned().collect();
            async move { Ok(batch) }
        })
        .await
        .unwrap();

        assert_eq!(rows.len(), total);
        assert_eq!(requested, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn exact_multiple_needs_one_empty_page() {
        let mut calls = 0;
        let rows = collect_all_pages(2, |page| {
            calls += 1;
            let batch = if page == 1 { vec![customer("A"), customer("B")] } else { Vec::new() };
            async move { Ok(batch) }
        })
        .await
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(calls, 2);
    }
}
