pub mod contract_repository;
pub mod job_repository;
pub mod memory;
pub mod postgres;
pub mod profile_repository;

pub use contract_repository::ContractRepository;
pub use job_repository::JobRepository;
pub use memory::InMemoryLedgerStore;
pub use postgres::PgLedgerStore;
pub use profile_repository::ProfileRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::Result;
use crate::models::{Contract, ContractStatus, DateRange, Job, JobFilter, Profile};

/// Database connection pool type alias.
pub type DbPool = PgPool;

/// Storage boundary for the ledger.
///
/// Reads on the store itself see committed data only. Every mutation goes
/// through a [`LedgerTransaction`] obtained from [`LedgerStore::begin`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Opens a unit of work. Dropping it without `commit` discards its writes.
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>>;

    async fn find_profile(&self, id: i64) -> Result<Option<Profile>>;

    async fn find_contract(&self, id: i64) -> Result<Option<Contract>>;

    async fn find_job(&self, id: i64) -> Result<Option<Job>>;

    /// Contracts whose status is one of `statuses`, ordered by id.
    async fn contracts_by_status(&self, statuses: &[ContractStatus]) -> Result<Vec<Contract>>;

    /// Contracts on which the profile works as contractor, ordered by id.
    async fn contracts_by_contractor(&self, contractor_id: i64) -> Result<Vec<Contract>>;

    /// Contracts created inside the inclusive range, ordered by id.
    async fn contracts_created_between(&self, range: DateRange) -> Result<Vec<Contract>>;

    /// Jobs attached to any of the given contracts, ordered by id.
    async fn jobs_by_contracts(&self, contract_ids: &[i64], filter: JobFilter) -> Result<Vec<Job>>;
}

/// An isolated read-modify-write session against the store.
///
/// `lock_*` calls hold the row until commit or drop, so two transactions
/// touching the same profile or job are serialized.
#[async_trait]
pub trait LedgerTransaction: Send {
    async fn lock_profile(&mut self, id: i64) -> Result<Option<Profile>>;

    async fn lock_job(&mut self, id: i64) -> Result<Option<Job>>;

    async fn find_contract(&mut self, id: i64) -> Result<Option<Contract>>;

    /// Sum of unpaid job prices over every contract the profile is party to.
    async fn outstanding_total(&mut self, profile_id: i64) -> Result<Decimal>;

    async fn credit(&mut self, profile_id: i64, amount: Decimal) -> Result<Profile>;

    /// Returns `None` when the balance would go negative; nothing is written then.
    async fn debit(&mut self, profile_id: i64, amount: Decimal) -> Result<Option<Profile>>;

    /// Returns `None` when the job is missing or already paid.
    async fn mark_job_paid(&mut self, job_id: i64, paid_at: DateTime<Utc>) -> Result<Option<Job>>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
