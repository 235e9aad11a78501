use super::SyncPhase;
use crate::auth::TokenManager;
use crate::contaazul::{
    parse_upstream_date_noon, parse_upstream_datetime, ApiClient, UpstreamContract,
    UpstreamCustomer,
};
use crate::error::SyncError;
use crate::storage::{ContractLink, NewCustomer, SqliteStore};
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Contracts are fetched inside a fixed date window wide enough to cover
/// every contract the vendor will return.
const CONTRACT_WINDOW_START: &str = "2015-01-01";
const CONTRACT_WINDOW_END: &str = "2030-12-31";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CustomerSyncReport {
    pub processed: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ContractSyncReport {
    pub processed: u64,
    pub updated: u64,
}

/// Walks the vendor's paginated collections and reconciles each page into
/// local storage. Pages are fetched sequentially; writes within a page run
/// concurrently.
#[derive(Clone)]
pub struct SyncEngine {
    store: SqliteStore,
    tokens: TokenManager,
    client: ApiClient,
    page_size: u32,
}

impl SyncEngine {
    pub fn new(
        store: SqliteStore,
        tokens: TokenManager,
        client: ApiClient,
        page_size: u32,
    ) -> Self {
        Self {
            store,
            tokens,
            client,
            page_size,
        }
    }

    /// Mirror the customer collection for the tenant. Any upstream or
    /// storage failure aborts the run; completed pages stay written.
    pub async fn sync_customers(
        &self,
        tenant_id: i64,
    ) -> Result<CustomerSyncReport, SyncError> {
        let access_token = self.tokens.valid_token(tenant_id).await?;
        let mut phase = SyncPhase::Idle;
        let mut processed: u64 = 0;
        let mut page: u32 = 1;

        loop {
            phase.advance("customers", SyncPhase::Fetching { page });
            let batch = match self
                .client
                .fetch_customers_page(&access_token, page, self.page_size)
                .await
            {
                Ok(fetched) => fetched.items,
                Err(err) => {
                    phase.advance("customers", SyncPhase::Failed);
                    return Err(err);
                }
            };
            if batch.is_empty() {
                break;
            }

            phase.advance("customers", SyncPhase::Reconciling { page });
            let store = &self.store;
            let writes = batch.iter().map(|upstream| {
                let mapped = map_customer(upstream);
                async move { store.upsert_customer(tenant_id, &mapped).await }
            });
            for outcome in join_all(writes).await {
                if let Err(err) = outcome {
                    phase.advance("customers", SyncPhase::Failed);
                    return Err(err.into());
                }
            }

            let count = batch.len();
            processed += count as u64;
            debug!(tenant_id, page, count, "customer page reconciled");

            // A short page is the last one.
            if (count as u32) < self.page_size {
                break;
            }
            page += 1;
        }

        phase.advance("customers", SyncPhase::Done);
        info!(tenant_id, processed, "customer sync finished");
        Ok(CustomerSyncReport { processed })
    }

    /// Decorate already-synced customers with contract linkage. Per-item
    /// misses and write failures are logged and skipped, so `updated` can
    /// trail `processed`.
    pub async fn sync_contracts(
        &self,
        tenant_id: i64,
    ) -> Result<ContractSyncReport, SyncError> {
        let access_token = self.tokens.valid_token(tenant_id).await?;
        let mut phase = SyncPhase::Idle;
        let mut processed: u64 = 0;
        let mut updated: u64 = 0;
        let mut page: u32 = 1;

        loop {
            phase.advance("contracts", SyncPhase::Fetching { page });
            let fetched = match self
                .client
                .fetch_contracts_page(
                    &access_token,
                    page,
                    self.page_size,
                    CONTRACT_WINDOW_START,
                    CONTRACT_WINDOW_END,
                )
                .await
            {
                Ok(fetched) => fetched,
                Err(err) => {
                    phase.advance("contracts", SyncPhase::Failed);
                    return Err(err);
                }
            };
            let batch = fetched.into_items();
            if batch.is_empty() {
                break;
            }

            phase.advance("contracts", SyncPhase::Reconciling { page });
            let store = &self.store;
            let writes = batch.iter().filter_map(|contract| {
                let Some(customer_id) = contract.linked_customer_id() else {
                    debug!(tenant_id, contract_id = %contract.id, "contract has no customer, skipping");
                    return None;
                };
                let customer_id = customer_id.to_string();
                let link = map_contract(contract);
                Some(async move {
                    let outcome = store.link_contract(&customer_id, &link).await;
                    (customer_id, link.contract_id, outcome)
                })
            });
            for (customer_id, contract_id, outcome) in join_all(writes).await {
                match outcome {
                    Ok(true) => updated += 1,
                    Ok(false) => {
                        debug!(tenant_id, %customer_id, %contract_id, "contract customer not synced locally");
                    }
                    Err(err) => {
                        warn!(tenant_id, %customer_id, %contract_id, error = %err, "contract link write failed");
                    }
                }
            }

            let count = batch.len();
            processed += count as u64;
            debug!(tenant_id, page, count, "contract page reconciled");

            if (count as u32) < self.page_size {
                break;
            }
            page += 1;
        }

        phase.advance("contracts", SyncPhase::Done);
        info!(tenant_id, processed, updated, "contract sync finished");
        Ok(ContractSyncReport { processed, updated })
    }
}

fn map_customer(upstream: &UpstreamCustomer) -> NewCustomer {
    NewCustomer {
        external_id: upstream.id.clone(),
        legacy_id: upstream.legacy_id,
        legacy_uuid: upstream.legacy_uuid.clone(),
        name: upstream.name.clone(),
        tax_document: upstream.tax_document.clone(),
        email: upstream.email.clone(),
        phone: upstream.phone.clone(),
        active: upstream.active,
        person_type: upstream.person_type.clone(),
        profiles: upstream.profiles.clone(),
        notes: upstream.notes.clone(),
        external_created_at: upstream
            .created_at
            .as_deref()
            .and_then(parse_upstream_datetime),
        external_updated_at: upstream
            .updated_at
            .as_deref()
            .and_then(parse_upstream_datetime),
    }
}

fn map_contract(contract: &UpstreamContract) -> ContractLink {
    ContractLink {
        contract_id: contract.id.clone(),
        status: contract.status.clone(),
        number: contract.number.clone(),
        start_date: contract
            .start_date
            .as_deref()
            .and_then(parse_upstream_date_noon),
        due_date: contract
            .next_due_date
            .as_deref()
            .and_then(parse_upstream_date_noon),
    }
}
