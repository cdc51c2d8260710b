use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{LedgerStore, LedgerTransaction};
use crate::error::{AppError, Result};
use crate::models::{
    fits_money_column, Contract, ContractStatus, DateRange, Job, JobFilter, Profile,
};

#[derive(Debug, Clone, Default)]
struct LedgerState {
    profiles: BTreeMap<i64, Profile>,
    contracts: BTreeMap<i64, Contract>,
    jobs: BTreeMap<i64, Job>,
}

impl LedgerState {
    fn outstanding_total(&self, profile_id: i64) -> Result<Decimal> {
        self.jobs
            .values()
            .filter(|job| JobFilter::Unpaid.matches(job))
            .filter(|job| {
                self.contracts
                    .get(&job.contract_id)
                    .is_some_and(|contract| contract.involves(profile_id))
            })
            .try_fold(Decimal::ZERO, |total, job| {
                total.checked_add(job.price).ok_or_else(|| {
                    AppError::Internal(anyhow!(
                        "outstanding total overflows for profile {}",
                        profile_id
                    ))
                })
            })
    }
}

/// Ledger store held in process memory.
///
/// A transaction owns the state lock for its whole lifetime and edits a staged
/// copy, so writers are fully serialized and an uncommitted transaction
/// leaves no trace.
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a profile. The balance obeys the same limits as
    /// the `profiles.balance` column.
    pub async fn insert_profile(&self, profile: Profile) -> Result<()> {
        if profile.balance < Decimal::ZERO {
            return Err(AppError::InvalidInput(format!(
                "Profile {} cannot start with a negative balance",
                profile.id
            )));
        }
        if !fits_money_column(profile.balance) {
            return Err(AppError::InvalidInput(format!(
                "Profile {} balance {} does not fit a money column",
                profile.id, profile.balance
            )));
        }
        self.state.lock().await.profiles.insert(profile.id, profile);
        Ok(())
    }

    /// Inserts or replaces a contract. Both parties must already exist.
    pub async fn insert_contract(&self, contract: Contract) -> Result<()> {
        let mut state = self.state.lock().await;
        for party in [contract.client_id, contract.contractor_id] {
            if !state.profiles.contains_key(&party) {
                return Err(AppError::NotFound(format!(
                    "Profile with id '{}' not found",
                    party
                )));
            }
        }
        state.contracts.insert(contract.id, contract);
        Ok(())
    }

    /// Inserts or replaces a job. Its contract must already exist, and the
    /// row obeys the same checks as the `jobs` table.
    pub async fn insert_job(&self, job: Job) -> Result<()> {
        if job.price <= Decimal::ZERO {
            return Err(AppError::InvalidInput(format!(
                "Job {} must have a positive price",
                job.id
            )));
        }
        if !fits_money_column(job.price) {
            return Err(AppError::InvalidInput(format!(
                "Job {} price {} does not fit a money column",
                job.id, job.price
            )));
        }
        if job.paid != job.payment_date.is_some() {
            return Err(AppError::InvalidInput(format!(
                "Job {} must carry a payment date exactly when it is paid",
                job.id
            )));
        }
        let mut state = self.state.lock().await;
        if !state.contracts.contains_key(&job.contract_id) {
            return Err(AppError::NotFound(format!(
                "Contract with id '{}' not found",
                job.contract_id
            )));
        }
        state.jobs.insert(job.id, job);
        Ok(())
    }

    /// Total of all balances. Payments move money, so only deposits change it.
    pub async fn total_balance(&self) -> Decimal {
        self.state
            .lock()
            .await
            .profiles
            .values()
            .map(|profile| profile.balance)
            .sum()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, staged }))
    }

    async fn find_profile(&self, id: i64) -> Result<Option<Profile>> {
        Ok(self.state.lock().await.profiles.get(&id).cloned())
    }

    async fn find_contract(&self, id: i64) -> Result<Option<Contract>> {
        Ok(self.state.lock().await.contracts.get(&id).cloned())
    }

    async fn find_job(&self, id: i64) -> Result<Option<Job>> {
        Ok(self.state.lock().await.jobs.get(&id).cloned())
    }

    async fn contracts_by_status(&self, statuses: &[ContractStatus]) -> Result<Vec<Contract>> {
        let state = self.state.lock().await;
        Ok(state
            .contracts
            .values()
            .filter(|contract| statuses.contains(&contract.status))
            .cloned()
            .collect())
    }

    async fn contracts_by_contractor(&self, contractor_id: i64) -> Result<Vec<Contract>> {
        let state = self.state.lock().await;
        Ok(state
            .contracts
            .values()
            .filter(|contract| contract.contractor_id == contractor_id)
            .cloned()
            .collect())
    }

    async fn contracts_created_between(&self, range: DateRange) -> Result<Vec<Contract>> {
        let state = self.state.lock().await;
        Ok(state
            .contracts
            .values()
            .filter(|contract| range.contains(contract.created_at))
            .cloned()
            .collect())
    }

    async fn jobs_by_contracts(&self, contract_ids: &[i64], filter: JobFilter) -> Result<Vec<Job>> {
        let state = self.state.lock().await;
        Ok(state
            .jobs
            .values()
            .filter(|job| contract_ids.contains(&job.contract_id) && filter.matches(job))
            .cloned()
            .collect())
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<LedgerState>,
    staged: LedgerState,
}

#[async_trait]
impl LedgerTransaction for InMemoryTransaction {
    async fn lock_profile(&mut self, id: i64) -> Result<Option<Profile>> {
        Ok(self.staged.profiles.get(&id).cloned())
    }

    async fn lock_job(&mut self, id: i64) -> Result<Option<Job>> {
        Ok(self.staged.jobs.get(&id).cloned())
    }

    async fn find_contract(&mut self, id: i64) -> Result<Option<Contract>> {
        Ok(self.staged.contracts.get(&id).cloned())
    }

    async fn outstanding_total(&mut self, profile_id: i64) -> Result<Decimal> {
        self.staged.outstanding_total(profile_id)
    }

    async fn credit(&mut self, profile_id: i64, amount: Decimal) -> Result<Profile> {
        let profile = self.staged.profiles.get_mut(&profile_id).ok_or_else(|| {
            AppError::NotFound(format!("Profile with id '{}' not found", profile_id))
        })?;
        let fits = profile
            .balance
            .checked_add(amount)
            .is_some_and(fits_money_column);
        if !fits {
            return Err(AppError::InvalidInput(format!(
                "Crediting {} would exceed the maximum balance of profile '{}'",
                amount, profile_id
            )));
        }
        profile.credit(amount);
        Ok(profile.clone())
    }

    async fn debit(&mut self, profile_id: i64, amount: Decimal) -> Result<Option<Profile>> {
        let Some(profile) = self.staged.profiles.get_mut(&profile_id) else {
            return Ok(None);
        };
        match profile.debit(amount) {
            Ok(()) => Ok(Some(profile.clone())),
            Err(_) => Ok(None),
        }
    }

    async fn mark_job_paid(&mut self, job_id: i64, paid_at: DateTime<Utc>) -> Result<Option<Job>> {
        let Some(job) = self.staged.jobs.get_mut(&job_id) else {
            return Ok(None);
        };
        if !job.mark_paid(paid_at) {
            return Ok(None);
        }
        Ok(Some(job.clone()))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
