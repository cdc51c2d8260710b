use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Side of the marketplace a profile acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "profile_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProfileType {
    /// Hires contractors and funds their jobs.
    Client,
    /// Performs jobs and receives payment for them.
    Contractor,
}

/// An account holding a monetary balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub profession: String,
    /// Never negative; only the settlement engine changes it.
    pub balance: Decimal,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub profile_type: ProfileType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Creates a profile with a zero balance.
    pub fn new(
        id: i64,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        profession: impl Into<String>,
        profile_type: ProfileType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            profession: profession.into(),
            balance: Decimal::ZERO,
            profile_type,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance = balance;
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn has_sufficient_funds(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }

    /// Increases the balance.
    pub fn credit(&mut self, amount: Decimal) {
        self.balance += amount;
        self.updated_at = Utc::now();
    }

    /// Decreases the balance, refusing to go below zero.
    pub fn debit(&mut self, amount: Decimal) -> Result<(), InsufficientFundsError> {
        if !self.has_sufficient_funds(amount) {
            return Err(InsufficientFundsError {
                requested: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct InsufficientFundsError {
    pub requested: Decimal,
    pub available: Decimal,
}

impl std::fmt::Display for InsufficientFundsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Insufficient funds: requested {}, available {}",
            self.requested, self.available
        )
    }
}

impl std::error::Error for InsufficientFundsError {}
