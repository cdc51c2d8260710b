use rust_decimal::Decimal;
use thiserror::Error;

/// Errors surfaced by the settlement and reporting engines.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid job {job_id}: {reason}")]
    InvalidJob { job_id: i64, reason: String },

    #[error("Deposit of {amount} for profile {profile_id} exceeds the cap of {cap}")]
    OverDeposit {
        profile_id: i64,
        amount: Decimal,
        cap: Decimal,
    },

    #[error("Insufficient balance for profile {profile_id}: balance {balance}, required {required}")]
    InsufficientBalance {
        profile_id: i64,
        balance: Decimal,
        required: Decimal,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable label for the error kind, used as a metrics tag and by callers
    /// mapping errors onto their transport.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::InvalidJob { .. } => "invalid_job",
            AppError::OverDeposit { .. } => "over_deposit",
            AppError::InsufficientBalance { .. } => "insufficient_balance",
            AppError::Database(_) => "database",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }

    /// Returns true for errors caused by the request rather than the store.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
