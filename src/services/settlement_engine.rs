use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::SettlementSettings;
use crate::error::{AppError, Result};
use crate::models::{fits_money_column, Job, Profile, MONEY_SCALE};
use crate::observability::{get_metrics, mask_amount, LatencyTimer};
use crate::repositories::{LedgerStore, LedgerTransaction};

/// Tunables for the settlement rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementPolicy {
    /// A deposit may be at most this multiple of the depositor's outstanding total.
    pub deposit_cap_ratio: Decimal,
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            deposit_cap_ratio: Decimal::new(125, 2),
        }
    }
}

impl From<&SettlementSettings> for SettlementPolicy {
    fn from(settings: &SettlementSettings) -> Self {
        Self {
            deposit_cap_ratio: settings.deposit_cap_ratio,
        }
    }
}

impl SettlementPolicy {
    /// Largest deposit accepted against the given outstanding total.
    pub fn deposit_cap(&self, outstanding: Decimal) -> Result<Decimal> {
        outstanding
            .checked_mul(self.deposit_cap_ratio)
            .ok_or_else(|| {
                AppError::Internal(anyhow!(
                    "deposit cap overflows for outstanding total {}",
                    outstanding
                ))
            })
    }
}

/// Caller-supplied terms for paying a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Price the payer agreed to; must match the job's price.
    pub price: Decimal,
    /// Profile funding the payment, the client on the job's contract.
    pub payer_id: i64,
}

/// The only component allowed to change balances or a job's paid flag.
/// Each operation runs inside one store transaction.
pub struct SettlementEngine {
    store: Arc<dyn LedgerStore>,
    policy: SettlementPolicy,
}

impl SettlementEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self::with_policy(store, SettlementPolicy::default())
    }

    pub fn with_policy(store: Arc<dyn LedgerStore>, policy: SettlementPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &SettlementPolicy {
        &self.policy
    }

    /// Adds funds to a profile, capped relative to its unpaid job total.
    #[instrument(skip(self, amount), fields(amount = %mask_amount(&amount)))]
    pub async fn deposit(&self, profile_id: i64, amount: Decimal) -> Result<Profile> {
        let timer = LatencyTimer::new();
        let result = self.execute_deposit(profile_id, amount).await;

        let metrics = get_metrics();
        metrics.record_settlement_latency("deposit", timer.elapsed_ms());
        match &result {
            Ok(_) => metrics.record_deposit(amount),
            Err(e) => metrics.record_settlement_failed("deposit", e.kind()),
        }
        result
    }

    /// Pays for a job: moves its price from the client to the contractor and
    /// marks the job paid, all or nothing.
    #[instrument(skip(self, request), fields(payer_id = request.payer_id))]
    pub async fn pay_for_job(&self, job_id: i64, request: PaymentRequest) -> Result<Job> {
        let timer = LatencyTimer::new();
        let result = self.execute_payment(job_id, &request).await;

        let metrics = get_metrics();
        metrics.record_settlement_latency("pay_for_job", timer.elapsed_ms());
        match &result {
            Ok(job) => metrics.record_job_payment(job.price),
            Err(e) => metrics.record_settlement_failed("pay_for_job", e.kind()),
        }
        result
    }

    async fn execute_deposit(&self, profile_id: i64, amount: Decimal) -> Result<Profile> {
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("Deposit amount must be positive".to_string()));
        }
        if !fits_money_column(amount) {
            return Err(AppError::InvalidInput(format!(
                "Deposit amount {} must have at most {} decimal places and fit a balance",
                amount, MONEY_SCALE
            )));
        }

        let mut tx = self.store.begin().await?;

        let profile = tx.lock_profile(profile_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Profile with id '{}' not found", profile_id))
        })?;

        let outstanding = tx.outstanding_total(profile.id).await?;
        let cap = self.policy.deposit_cap(outstanding)?;
        if amount > cap {
            return Err(AppError::OverDeposit {
                profile_id,
                amount,
                cap,
            });
        }
        ensure_balance_fits(&profile, amount)?;

        let updated = tx.credit(profile.id, amount).await?;
        tx.commit().await?;

        debug!(profile_id, outstanding = %outstanding, "Deposit applied");
        Ok(updated)
    }

    async fn execute_payment(&self, job_id: i64, request: &PaymentRequest) -> Result<Job> {
        let mut tx = self.store.begin().await?;

        let job = tx
            .lock_job(job_id)
            .await?
            .ok_or_else(|| AppError::InvalidJob {
                job_id,
                reason: "job does not exist".to_string(),
            })?;

        if job.is_paid() {
            return Err(AppError::InvalidJob {
                job_id,
                reason: "job has already been paid".to_string(),
            });
        }

        if request.price != job.price {
            return Err(AppError::InvalidInput(format!(
                "Agreed price {} does not match job price {}",
                request.price, job.price
            )));
        }

        let contract = tx.find_contract(job.contract_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Contract with id '{}' not found", job.contract_id))
        })?;

        if contract.client_id != request.payer_id {
            return Err(AppError::InvalidInput(format!(
                "Profile '{}' is not the client on contract '{}'",
                request.payer_id, contract.id
            )));
        }

        let (payer, contractor) =
            lock_parties(tx.as_mut(), request.payer_id, contract.contractor_id).await?;

        if !payer.has_sufficient_funds(job.price) {
            return Err(AppError::InsufficientBalance {
                profile_id: payer.id,
                balance: payer.balance,
                required: job.price,
            });
        }

        if payer.id != contractor.id {
            ensure_balance_fits(&contractor, job.price)?;
        }

        tx.debit(payer.id, job.price)
            .await?
            .ok_or_else(|| AppError::InsufficientBalance {
                profile_id: payer.id,
                balance: payer.balance,
                required: job.price,
            })?;
        tx.credit(contract.contractor_id, job.price).await?;

        let paid = tx
            .mark_job_paid(job.id, Utc::now())
            .await?
            .ok_or_else(|| AppError::InvalidJob {
                job_id,
                reason: "job has already been paid".to_string(),
            })?;

        tx.commit().await?;

        debug!(
            job_id,
            contract_id = contract.id,
            contractor_id = contract.contractor_id,
            "Job paid"
        );
        Ok(paid)
    }
}

/// Rejects a credit that would push the balance past what the store can hold.
fn ensure_balance_fits(profile: &Profile, amount: Decimal) -> Result<()> {
    match profile.balance.checked_add(amount) {
        Some(balance) if fits_money_column(balance) => Ok(()),
        _ => Err(AppError::InvalidInput(format!(
            "Crediting {} would exceed the maximum balance of profile '{}'",
            amount, profile.id
        ))),
    }
}

/// Locks the payer and the contractor rows in ascending id order so that
/// concurrent payments between the same parties cannot deadlock.
async fn lock_parties(
    tx: &mut dyn LedgerTransaction,
    payer_id: i64,
    contractor_id: i64,
) -> Result<(Profile, Profile)> {
    let not_found = |id: i64| AppError::NotFound(format!("Profile with id '{}' not found", id));

    if payer_id == contractor_id {
        let profile = tx.lock_profile(payer_id).await?.ok_or_else(|| not_found(payer_id))?;
        return Ok((profile.clone(), profile));
    }

    let (first, second) = if payer_id < contractor_id {
        (payer_id, contractor_id)
    } else {
        (contractor_id, payer_id)
    };

    let first_profile = tx.lock_profile(first).await?.ok_or_else(|| not_found(first))?;
    let second_profile = tx.lock_profile(second).await?.ok_or_else(|| not_found(second))?;

    if first == payer_id {
        Ok((first_profile, second_profile))
    } else {
        Ok((second_profile, first_profile))
    }
}
