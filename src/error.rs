use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `contabridge`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum BridgeError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Token lifecycle ─────────────────────────────────────────────────
    #[error("token: {0}")]
    Token(#[from] TokenError),

    // ── Synchronization ─────────────────────────────────────────────────
    #[error("sync: {0}")]
    Sync(#[from] SyncError),

    // ── Storage ─────────────────────────────────────────────────────────
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Token lifecycle errors ─────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("tenant id must be a positive integer")]
    InvalidTenant,

    #[error("integration not configured for tenant {tenant_id}: {reason}")]
    NotConfigured { tenant_id: i64, reason: &'static str },

    #[error("vendor rejected token refresh: {detail}")]
    RefreshFailed { detail: String },

    #[error("vendor rejected authorization-code exchange: {detail}")]
    ExchangeFailed { detail: String },

    #[error("vendor request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),
}

// ─── Synchronization errors ─────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("token: {0}")]
    Token(#[from] TokenError),

    #[error("vendor API returned {status} on page {page}: {body}")]
    Upstream { status: u16, page: u32, body: String },

    #[error("vendor request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),
}

// ─── Storage errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("codec: {0}")]
    Codec(String),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, BridgeError>;
