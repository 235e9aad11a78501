use super::SqliteStore;
use crate::error::StorageError;
use chrono::{DateTime, Utc};

/// Upstream customer mapped to the local shape, ready to reconcile.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub external_id: String,
    pub legacy_id: Option<i64>,
    pub legacy_uuid: Option<String>,
    pub name: Option<String>,
    pub tax_document: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub active: bool,
    pub person_type: Option<String>,
    pub profiles: Vec<String>,
    pub notes: Option<String>,
    pub external_created_at: Option<DateTime<Utc>>,
    pub external_updated_at: Option<DateTime<Utc>>,
}

/// Contract-linkage fields written by the second sync pass.
#[derive(Debug, Clone)]
pub struct ContractLink {
    pub contract_id: String,
    pub status: Option<String>,
    pub number: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Full local record, as stored.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CustomerRecord {
    pub external_id: String,
    pub tenant_id: i64,
    pub legacy_id: Option<i64>,
    pub legacy_uuid: Option<String>,
    pub name: Option<String>,
    pub tax_document: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub active: bool,
    pub person_type: Option<String>,
    /// JSON array of profile tags, e.g. `["Cliente","Fornecedor"]`.
    pub profiles: String,
    pub notes: Option<String>,
    pub external_created_at: Option<DateTime<Utc>>,
    pub external_updated_at: Option<DateTime<Utc>>,
    pub contract_id: Option<String>,
    pub contract_status: Option<String>,
    pub contract_number: Option<String>,
    pub contract_start_date: Option<DateTime<Utc>>,
    pub contract_due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CustomerRecord {
    pub fn profile_tags(&self) -> Vec<String> {
        serde_json::from_str(&self.profiles).unwrap_or_default()
    }
}

const SELECT_CUSTOMER: &str =
    "SELECT external_id, tenant_id, legacy_id, legacy_uuid, name, tax_document, email,
            phone, active, person_type, profiles, notes, external_created_at,
            external_updated_at, contract_id, contract_status, contract_number,
            contract_start_date, contract_due_date, created_at
     FROM synced_customers";

impl SqliteStore {
    /// Create-or-update keyed on `external_id`. The update path rewrites the
    /// mutable descriptive fields only; `legacy_id`, `legacy_uuid`,
    /// `tenant_id`, `external_created_at` and `created_at` are write-once.
    pub async fn upsert_customer(
        &self,
        tenant_id: i64,
        customer: &NewCustomer,
    ) -> Result<(), StorageError> {
        let profiles = serde_json::to_string(&customer.profiles)
            .map_err(|e| StorageError::Codec(e.to_string()))?;

        sqlx::query(
            "INSERT INTO synced_customers
                 (external_id, tenant_id, legacy_id, legacy_uuid, name, tax_document,
                  email, phone, active, person_type, profiles, notes,
                  external_created_at, external_updated_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT(external_id) DO UPDATE SET
                 name = excluded.name,
                 tax_document = excluded.tax_document,
                 email = excluded.email,
                 phone = excluded.phone,
                 active = excluded.active,
                 person_type = excluded.person_type,
                 profiles = excluded.profiles,
                 notes = excluded.notes,
                 external_updated_at = excluded.external_updated_at",
        )
        .bind(&customer.external_id)
        .bind(tenant_id)
        .bind(customer.legacy_id)
        .bind(&customer.legacy_uuid)
        .bind(&customer.name)
        .bind(&customer.tax_document)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.active)
        .bind(&customer.person_type)
        .bind(&profiles)
        .bind(&customer.notes)
        .bind(customer.external_created_at)
        .bind(customer.external_updated_at)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Attach contract-linkage fields to the customer whose `external_id`
    /// matches. Returns `false` when no such customer exists locally.
    pub async fn link_contract(
        &self,
        customer_external_id: &str,
        link: &ContractLink,
    ) -> Result<bool, StorageError> {
        let outcome = sqlx::query(
            "UPDATE synced_customers
             SET contract_id = ?1, contract_status = ?2, contract_number = ?3,
                 contract_start_date = ?4, contract_due_date = ?5
             WHERE external_id = ?6",
        )
        .bind(&link.contract_id)
        .bind(&link.status)
        .bind(&link.number)
        .bind(link.start_date)
        .bind(link.due_date)
        .bind(customer_external_id)
        .execute(self.pool())
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    pub async fn find_customer(
        &self,
        external_id: &str,
    ) -> Result<Option<CustomerRecord>, StorageError> {
        let record = sqlx::query_as::<_, CustomerRecord>(&format!(
            "{SELECT_CUSTOMER} WHERE external_id = ?1"
        ))
        .bind(external_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(record)
    }

    pub async fn count_customers(&self, tenant_id: i64) -> Result<i64, StorageError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM synced_customers WHERE tenant_id = ?1")
                .bind(tenant_id)
                .fetch_one(self.pool())
                .await?;
        Ok(count)
    }
}
