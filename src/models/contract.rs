use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle of a contract. Transitions happen outside the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "contract_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    New,
    InProgress,
    Terminated,
}

impl ContractStatus {
    /// Statuses counted as active.
    pub const ACTIVE: [ContractStatus; 2] = [ContractStatus::New, ContractStatus::InProgress];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

impl sqlx::postgres::PgHasArrayType for ContractStatus {
    fn array_type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("_contract_status")
    }
}

/// Agreement between a client and a contractor, composed of jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Contract {
    pub id: i64,
    pub terms: String,
    pub status: ContractStatus,
    pub client_id: i64,
    pub contractor_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    pub fn new(
        id: i64,
        terms: impl Into<String>,
        status: ContractStatus,
        client_id: i64,
        contractor_id: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            terms: terms.into(),
            status,
            client_id,
            contractor_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overrides the creation timestamp, mostly for seeding historical data.
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = created_at;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Returns true if the profile is the client or the contractor.
    pub fn involves(&self, profile_id: i64) -> bool {
        self.client_id == profile_id || self.contractor_id == profile_id
    }
}
