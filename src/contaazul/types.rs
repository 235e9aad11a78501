use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

// ── Token endpoint ────────────────────────────────────────────────

/// Success payload from `POST /oauth2/token` (both grant types).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

// ── Customer collection ───────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CustomerPage {
    #[serde(default)]
    pub items: Vec<UpstreamCustomer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamCustomer {
    pub id: String,
    #[serde(default, rename = "id_legado")]
    pub legacy_id: Option<i64>,
    #[serde(default, rename = "uuid_legado")]
    pub legacy_uuid: Option<String>,
    #[serde(default, rename = "nome")]
    pub name: Option<String>,
    #[serde(default, rename = "documento")]
    pub tax_document: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "telefone")]
    pub phone: Option<String>,
    #[serde(default = "default_active", rename = "ativo")]
    pub active: bool,
    #[serde(default, rename = "tipo_pessoa")]
    pub person_type: Option<String>,
    #[serde(default, rename = "perfis")]
    pub profiles: Vec<String>,
    #[serde(default, rename = "observacoes_gerais")]
    pub notes: Option<String>,
    #[serde(default, rename = "data_criacao")]
    pub created_at: Option<String>,
    #[serde(default, rename = "data_alteracao")]
    pub updated_at: Option<String>,
}

fn default_active() -> bool {
    true
}

// ── Contract collection ───────────────────────────────────────────

/// The contracts endpoint spells its item list `items` or `itens`
/// depending on API version; both are accepted.
#[derive(Debug, Default, Deserialize)]
pub struct ContractPage {
    #[serde(default)]
    items: Vec<UpstreamContract>,
    #[serde(default)]
    itens: Vec<UpstreamContract>,
}

impl ContractPage {
    pub fn into_items(self) -> Vec<UpstreamContract> {
        if self.items.is_empty() {
            self.itens
        } else {
            self.items
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamContract {
    pub id: String,
    #[serde(default, rename = "cliente")]
    pub customer: Option<ContractCustomerRef>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "numero", deserialize_with = "opt_string_or_number")]
    pub number: Option<String>,
    #[serde(default, rename = "data_inicio")]
    pub start_date: Option<String>,
    #[serde(default, rename = "proximo_vencimento")]
    pub next_due_date: Option<String>,
}

impl UpstreamContract {
    /// Upstream customer id this contract is linked to, if any.
    pub fn linked_customer_id(&self) -> Option<&str> {
        self.customer.as_ref()?.id.as_deref()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractCustomerRef {
    #[serde(default)]
    pub id: Option<String>,
}

/// Contract numbers arrive as either a JSON string or a bare number.
fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    let raw = Option::<Raw>::deserialize(deserializer)?;
    Ok(raw.map(|value| match value {
        Raw::Text(text) => text,
        Raw::Int(number) => number.to_string(),
        Raw::Float(number) => number.to_string(),
    }))
}

// ── Upstream date handling ────────────────────────────────────────

/// Parse an upstream timestamp string; absent or unparseable values map to
/// `None` rather than failing the record.
pub fn parse_upstream_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Contract dates are date-only strings; anchor them at 12:00 UTC so a
/// timezone shift cannot roll them onto the previous or next day.
pub fn parse_upstream_date_noon(raw: &str) -> Option<DateTime<Utc>> {
    let date_part = raw.get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(12, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
