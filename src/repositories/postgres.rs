use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use super::{
    ContractRepository, JobRepository, LedgerStore, LedgerTransaction, ProfileRepository,
};
use crate::error::{AppError, Result};
use crate::models::{Contract, ContractStatus, DateRange, Job, JobFilter, Profile};

/// PostgreSQL-backed ledger store. Conflicting writers are serialized with
/// `SELECT ... FOR UPDATE` row locks inside each transaction.
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn profiles(&self) -> ProfileRepository {
        ProfileRepository::new(self.pool.clone())
    }

    pub fn contracts(&self) -> ContractRepository {
        ContractRepository::new(self.pool.clone())
    }

    pub fn jobs(&self) -> JobRepository {
        JobRepository::new(self.pool.clone())
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>> {
        let tx = self.pool.begin().await.map_err(AppError::Database)?;
        Ok(Box::new(PgLedgerTransaction { tx }))
    }

    async fn find_profile(&self, id: i64) -> Result<Option<Profile>> {
        self.profiles().find_by_id(id).await
    }

    async fn find_contract(&self, id: i64) -> Result<Option<Contract>> {
        self.contracts().find_by_id(id).await
    }

    async fn find_job(&self, id: i64) -> Result<Option<Job>> {
        self.jobs().find_by_id(id).await
    }

    async fn contracts_by_status(&self, statuses: &[ContractStatus]) -> Result<Vec<Contract>> {
        self.contracts().list_by_status(statuses).await
    }

    async fn contracts_by_contractor(&self, contractor_id: i64) -> Result<Vec<Contract>> {
        self.contracts().list_by_contractor(contractor_id).await
    }

    async fn contracts_created_between(&self, range: DateRange) -> Result<Vec<Contract>> {
        self.contracts().list_created_between(range).await
    }

    async fn jobs_by_contracts(&self, contract_ids: &[i64], filter: JobFilter) -> Result<Vec<Job>> {
        self.jobs().list_by_contracts(contract_ids, filter).await
    }
}

/// A single database transaction. Rolled back by sqlx when dropped uncommitted.
pub struct PgLedgerTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTransaction for PgLedgerTransaction {
    async fn lock_profile(&mut self, id: i64) -> Result<Option<Profile>> {
        ProfileRepository::lock(&mut *self.tx, id).await
    }

    async fn lock_job(&mut self, id: i64) -> Result<Option<Job>> {
        JobRepository::lock(&mut *self.tx, id).await
    }

    async fn find_contract(&mut self, id: i64) -> Result<Option<Contract>> {
        ContractRepository::find_in(&mut *self.tx, id).await
    }

    async fn outstanding_total(&mut self, profile_id: i64) -> Result<Decimal> {
        JobRepository::outstanding_total(&mut *self.tx, profile_id).await
    }

    async fn credit(&mut self, profile_id: i64, amount: Decimal) -> Result<Profile> {
        ProfileRepository::credit(&mut *self.tx, profile_id, amount).await
    }

    async fn debit(&mut self, profile_id: i64, amount: Decimal) -> Result<Option<Profile>> {
        ProfileRepository::debit(&mut *self.tx, profile_id, amount).await
    }

    async fn mark_job_paid(&mut self, job_id: i64, paid_at: DateTime<Utc>) -> Result<Option<Job>> {
        JobRepository::mark_paid(&mut *self.tx, job_id, paid_at).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(AppError::Database)
    }
}
