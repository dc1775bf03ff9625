//! PostgREST-style HTTP record store.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{RecordStore, StoreError, StoreResult};
use crate::models::{Medicine, MedicinePatch, NewMedicine};

/// Row as stored remotely. Optional text columns may be `null`.
#[derive(Debug, Deserialize)]
struct StoredRow {
    id: serde_json::Value,
    name: String,
    #[serde(default)]
    formula: Option<String>,
    #[serde(default)]
    dosage: Option<String>,
    #[serde(default)]
    formulation: Option<String>,
    /// Kept raw: a single malformed stock must not fail the whole list
    #[serde(default)]
    stock: serde_json::Value,
}

impl From<StoredRow> for Medicine {
    fn from(row: StoredRow) -> Self {
        // Ids may be numeric or text depending on the table definition
        let id = match row.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        Medicine {
            id,
            name: row.name,
            formula: row.formula.unwrap_or_default(),
            dosage: row.dosage.unwrap_or_default(),
            formulation: row.formulation.unwrap_or_default(),
            stock: lenient_stock(&row.stock),
        }
    }
}

/// Insert body. Empty optional text is sent as `null`.
#[derive(Debug, Serialize)]
struct InsertBody<'a> {
    name: &'a str,
    formula: Option<&'a str>,
    dosage: Option<&'a str>,
    formulation: Option<&'a str>,
    stock: u32,
}

impl<'a> From<&'a NewMedicine> for InsertBody<'a> {
    fn from(fields: &'a NewMedicine) -> Self {
        Self {
            name: &fields.name,
            formula: non_empty(&fields.formula),
            dosage: non_empty(&fields.dosage),
            formulation: non_empty(&fields.formulation),
            stock: fields.stock,
        }
    }
}

/// Update body. Absent fields are omitted; present-but-empty text becomes `null`.
#[derive(Debug, Serialize)]
struct PatchBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    formula: Option<Option<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dosage: Option<Option<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    formulation: Option<Option<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stock: Option<u32>,
}

impl<'a> From<&'a MedicinePatch> for PatchBody<'a> {
    fn from(patch: &'a MedicinePatch) -> Self {
        Self {
            name: patch.name.as_deref(),
            formula: patch.formula.as_deref().map(non_empty),
            dosage: patch.dosage.as_deref().map(non_empty),
            formulation: patch.formulation.as_deref().map(non_empty),
            stock: patch.stock,
        }
    }
}

/// Numbers (or numeric strings) are floored and clamped into `u32`. Anything else reads as 0.
fn lenient_stock(value: &serde_json::Value) -> u32 {
    let number = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() => n.floor().clamp(0.0, f64::from(u32::MAX)) as u32,
        _ => {
            if !value.is_null() {
                tracing::warn!("Unreadable stock value {}, using 0", value);
            }
            0
        }
    }
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// HTTP client for a PostgREST endpoint (e.g. Supabase `/rest/v1`).
#[derive(Clone)]
pub struct RestStore {
    client: reqwest::Client,
    table_url: String,
    headers: HeaderMap,
}

impl RestStore {
    /// Build a client for `<base_url>/rest/v1/<table>`.
    pub fn new(base_url: &str, api_key: &str, table: &str, timeout: Duration) -> StoreResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let mut headers = HeaderMap::new();
        if !api_key.is_empty() {
            let key = HeaderValue::from_str(api_key)
                .map_err(|e| StoreError::Config(format!("invalid api key: {}", e)))?;
            let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| StoreError::Config(format!("invalid api key: {}", e)))?;
            headers.insert("apikey", key);
            headers.insert(AUTHORIZATION, bearer);
        }

        Ok(Self {
            client,
            table_url: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
            headers,
        })
    }

    pub fn table_url(&self) -> &str {
        &self.table_url
    }

    fn id_filter(id: &str) -> String {
        format!("eq.{}", id)
    }

    async fn parse_rows(response: reqwest::Response) -> StoreResult<Vec<Medicine>> {
        let status = response.status();
        if status.is_success() {
            let text = response.text().await?;
            let rows: Vec<StoredRow> = serde_json::from_str(&text)?;
            Ok(rows.into_iter().map(Medicine::from).collect())
        } else {
            let body = response.text().await?;
            Err(StoreError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn single(mut rows: Vec<Medicine>, id: &str) -> StoreResult<Medicine> {
        match rows.len() {
            1 => Ok(rows.remove(0)),
            0 => Err(StoreError::NotFound(id.to_string())),
            n => Err(StoreError::InvalidResponse(format!(
                "expected one row, got {}",
                n
            ))),
        }
    }
}

#[async_trait]
impl RecordStore for RestStore {
    async fn list_all(&self) -> StoreResult<Vec<Medicine>> {
        let response = self
            .client
            .get(&self.table_url)
            .headers(self.headers.clone())
            .query(&[("select", "*"), ("order", "name")])
            .send()
            .await?;
        Self::parse_rows(response).await
    }

    async fn insert(&self, fields: &NewMedicine) -> StoreResult<Medicine> {
        let response = self
            .client
            .post(&self.table_url)
            .headers(self.headers.clone())
            .header("Prefer", "return=representation")
            .json(&InsertBody::from(fields))
            .send()
            .await?;
        let rows = Self::parse_rows(response).await?;
        Self::single(rows, "<new>")
    }

    async fn insert_many(&self, records: &[NewMedicine]) -> StoreResult<Vec<Medicine>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let bodies: Vec<InsertBody<'_>> = records.iter().map(InsertBody::from).collect();
        let response = self
            .client
            .post(&self.table_url)
            .headers(self.headers.clone())
            .header("Prefer", "return=representation")
            .json(&bodies)
            .send()
            .await?;
        Self::parse_rows(response).await
    }

    async fn update(&self, id: &str, patch: &MedicinePatch) -> StoreResult<Medicine> {
        let response = self
            .client
            .patch(&self.table_url)
            .headers(self.headers.clone())
            .header("Prefer", "return=representation")
            .query(&[("id", Self::id_filter(id))])
            .json(&PatchBody::from(patch))
            .send()
            .await?;
        let rows = Self::parse_rows(response).await?;
        Self::single(rows, id)
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let response = self
            .client
            .delete(&self.table_url)
            .headers(self.headers.clone())
            .header("Prefer", "return=representation")
            .query(&[("id", Self::id_filter(id))])
            .send()
            .await?;
        let rows = Self::parse_rows(response).await?;
        Ok(!rows.is_empty())
    }

    async fn is_empty(&self) -> StoreResult<bool> {
        let response = self
            .client
            .get(&self.table_url)
            .headers(self.headers.clone())
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let rows: Vec<serde_json::Value> = serde_json::from_str(&response.text().await?)?;
        Ok(rows.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url() {
        let store = RestStore::new(
            "https://example.supabase.co/",
            "anon",
            "medicines",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            store.table_url(),
            "https://example.supabase.co/rest/v1/medicines"
        );
    }

    #[test]
    fn test_null_columns_read_as_empty() {
        let rows: Vec<StoredRow> = serde_json::from_str(
            r#"[{"id": 12, "name": "Advil", "formula": null, "dosage": "400 mg", "formulation": null, "stock": 22}]"#,
        )
        .unwrap();
        let medicine = Medicine::from(rows.into_iter().next().unwrap());

        assert_eq!(medicine.id, "12");
        assert_eq!(medicine.formula, "");
        assert_eq!(medicine.dosage, "400 mg");
        assert_eq!(medicine.stock, 22);
    }

    #[test]
    fn test_malformed_stock_does_not_fail_the_list() {
        let rows: Vec<StoredRow> = serde_json::from_str(
            r#"[
                {"id": "a", "name": "Advil", "stock": -4},
                {"id": "b", "name": "Brufen", "stock": 7.8},
                {"id": "c", "name": "Calpol", "stock": "15"},
                {"id": "d", "name": "Losec", "stock": null},
                {"id": "e", "name": "Zyrtec", "stock": 1e12},
                {"id": "f", "name": "Tylenol", "stock": "many"}
            ]"#,
        )
        .unwrap();
        let stocks: Vec<u32> = rows.into_iter().map(|r| Medicine::from(r).stock).collect();

        assert_eq!(stocks, vec![0, 7, 15, 0, u32::MAX, 0]);
    }

    #[test]
    fn test_empty_text_sent_as_null() {
        let fields = NewMedicine {
            name: "Advil".into(),
            dosage: "400 mg".into(),
            ..Default::default()
        };
        let body = serde_json::to_value(InsertBody::from(&fields)).unwrap();
        assert_eq!(body["formula"], serde_json::Value::Null);
        assert_eq!(body["dosage"], "400 mg");
        assert_eq!(body["stock"], 0);
    }

    #[test]
    fn test_patch_body_omits_untouched_fields() {
        let patch = MedicinePatch {
            formula: Some(String::new()),
            stock: Some(3),
            ..Default::default()
        };
        let body = serde_json::to_value(PatchBody::from(&patch)).unwrap();
        let object = body.as_object().unwrap();

        assert!(!object.contains_key("name"));
        assert_eq!(object["formula"], serde_json::Value::Null);
        assert_eq!(object["stock"], 3);
    }

    #[test]
    fn test_invalid_api_key_rejected() {
        let result = RestStore::new("http://localhost", "bad\nkey", "medicines", Duration::from_secs(1));
        assert!(matches!(result, Err(StoreError::Config(_))));
    }
}
