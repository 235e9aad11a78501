//! Conta Azul vendor surface: wire DTOs and the HTTP client that speaks the
//! OAuth2 token endpoint and the paginated collection endpoints.

mod client;
mod types;

pub use client::{ApiClient, ProxyOutcome};
pub use types::{
    parse_upstream_date_noon, parse_upstream_datetime, ContractPage, CustomerPage, TokenResponse,
    UpstreamContract, UpstreamCustomer,
};
