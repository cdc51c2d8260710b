use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::error::{AppError, Result};
use crate::models::{
    ClientEarnings, Contract, ContractStatus, DateRange, Job, JobFilter, ProfessionEarnings,
};
use crate::observability::{get_metrics, LatencyTimer};
use crate::repositories::LedgerStore;

/// Read-only queries over the ledger.
pub struct ReportingEngine {
    store: Arc<dyn LedgerStore>,
}

impl ReportingEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Contracts that are `new` or `in_progress`.
    #[instrument(skip(self))]
    pub async fn find_all_active_contracts(&self) -> Result<Vec<Contract>> {
        let timer = LatencyTimer::new();
        let contracts = self.store.contracts_by_status(&ContractStatus::ACTIVE).await?;
        get_metrics().record_report_latency("active_contracts", timer.elapsed_ms(), contracts.len());
        Ok(contracts)
    }

    /// Looks up a single contract.
    pub async fn find_contract(&self, contract_id: i64) -> Result<Contract> {
        self.store
            .find_contract(contract_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Contract with id '{}' not found", contract_id))
            })
    }

    /// Jobs without a payment date on contracts where the profile is the contractor.
    #[instrument(skip(self))]
    pub async fn unpaid_jobs_by_user(&self, profile_id: Option<i64>) -> Result<Vec<Job>> {
        let profile_id = profile_id
            .ok_or_else(|| AppError::InvalidInput("profile id is required".to_string()))?;

        let timer = LatencyTimer::new();
        let contracts = self.store.contracts_by_contractor(profile_id).await?;
        if contracts.is_empty() {
            return Ok(Vec::new());
        }

        let contract_ids: Vec<i64> = contracts.iter().map(|c| c.id).collect();
        let jobs = self
            .store
            .jobs_by_contracts(&contract_ids, JobFilter::Unpaid)
            .await?;

        get_metrics().record_report_latency("unpaid_jobs", timer.elapsed_ms(), jobs.len());
        Ok(jobs)
    }

    /// The contractor, and its profession, with the highest paid total across
    /// contracts created in `[start, end]`. Ties go to the contractor met first.
    #[instrument(skip(self))]
    pub async fn best_profession(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Option<ProfessionEarnings>> {
        let range = DateRange::from_bounds(start, end)?;
        let timer = LatencyTimer::new();

        let contracts = self.store.contracts_created_between(range).await?;
        let totals = self
            .paid_totals_by(&contracts, |contract| contract.contractor_id)
            .await?;

        let mut best: Option<(i64, Decimal)> = None;
        for (contractor_id, total) in totals {
            if best.map_or(true, |(_, max)| total > max) {
                best = Some((contractor_id, total));
            }
        }

        let Some((contractor_id, paid_total)) = best else {
            return Ok(None);
        };

        let contractor = self.store.find_profile(contractor_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Profile with id '{}' not found", contractor_id))
        })?;

        get_metrics().record_report_latency("best_profession", timer.elapsed_ms(), 1);
        debug!(contractor_id, paid_total = %paid_total, "Best profession resolved");

        Ok(Some(ProfessionEarnings {
            profession: contractor.profession.clone(),
            contractor,
            paid_total,
        }))
    }

    /// Clients ranked by the total they paid on contracts created in
    /// `[start, end]`, highest first. `limit` truncates the ranking.
    #[instrument(skip(self))]
    pub async fn best_clients(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<ClientEarnings>> {
        let range = DateRange::from_bounds(start, end)?;
        let timer = LatencyTimer::new();

        let contracts = self.store.contracts_created_between(range).await?;
        let totals = self
            .paid_totals_by(&contracts, |contract| contract.client_id)
            .await?;

        let mut ranking = Vec::with_capacity(totals.len());
        for (client_id, paid_total) in totals {
            let client = self.store.find_profile(client_id).await?.ok_or_else(|| {
                AppError::NotFound(format!("Profile with id '{}' not found", client_id))
            })?;
            ranking.push(ClientEarnings {
                profile_id: client.id,
                full_name: client.full_name(),
                paid_total,
            });
        }

        ranking.sort_by(|a, b| {
            b.paid_total
                .cmp(&a.paid_total)
                .then_with(|| a.profile_id.cmp(&b.profile_id))
        });
        if let Some(limit) = limit {
            ranking.truncate(limit);
        }

        get_metrics().record_report_latency("best_clients", timer.elapsed_ms(), ranking.len());
        Ok(ranking)
    }

    /// Sums paid job prices over `contracts`, grouped by the profile `party`
    /// picks from each contract. Groups keep the order in which they were first
    /// met while walking jobs in id order; parties with no paid job are absent.
    async fn paid_totals_by(
        &self,
        contracts: &[Contract],
        party: impl Fn(&Contract) -> i64,
    ) -> Result<Vec<(i64, Decimal)>> {
        if contracts.is_empty() {
            return Ok(Vec::new());
        }

        let party_by_contract: HashMap<i64, i64> =
            contracts.iter().map(|c| (c.id, party(c))).collect();
        let contract_ids: Vec<i64> = contracts.iter().map(|c| c.id).collect();
        let paid_jobs = self
            .store
            .jobs_by_contracts(&contract_ids, JobFilter::Paid)
            .await?;

        let mut totals: Vec<(i64, Decimal)> = Vec::new();
        let mut index: HashMap<i64, usize> = HashMap::new();
        for job in paid_jobs {
            let Some(&profile_id) = party_by_contract.get(&job.contract_id) else {
                continue;
            };
            match index.get(&profile_id) {
                Some(&slot) => totals[slot].1 += job.price,
                None => {
                    index.insert(profile_id, totals.len());
                    totals.push((profile_id, job.price));
                }
            }
        }

        Ok(totals)
    }
}
