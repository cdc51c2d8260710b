use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A billable unit of work under a contract.
/// `paid` only ever moves from false to true, together with `payment_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: i64,
    pub description: String,
    pub price: Decimal,
    pub paid: bool,
    pub payment_date: Option<DateTime<Utc>>,
    pub contract_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Creates an unpaid job.
    pub fn new(id: i64, description: impl Into<String>, price: Decimal, contract_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id,
            description: description.into(),
            price,
            paid: false,
            payment_date: None,
            contract_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the job already settled at `paid_at`.
    pub fn paid_at(mut self, paid_at: DateTime<Utc>) -> Self {
        self.paid = true;
        self.payment_date = Some(paid_at);
        self
    }

    pub fn is_paid(&self) -> bool {
        self.paid
    }

    /// Flips the job to paid. Returns false if it was already paid.
    pub fn mark_paid(&mut self, paid_at: DateTime<Utc>) -> bool {
        if self.paid {
            return false;
        }
        self.paid = true;
        self.payment_date = Some(paid_at);
        self.updated_at = paid_at;
        true
    }
}

/// Payment state filter for job listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobFilter {
    #[default]
    All,
    Paid,
    /// Jobs without a payment date.
    Unpaid,
}

impl JobFilter {
    pub fn matches(&self, job: &Job) -> bool {
        match self {
            JobFilter::All => true,
            JobFilter::Paid => job.paid,
            JobFilter::Unpaid => job.payment_date.is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_job_is_unpaid() {
        let job = Job::new(1, "Logo design", dec!(200), 3);
        assert!(!job.is_paid());
        assert!(job.payment_date.is_none());
    }

    #[test]
    fn test_mark_paid_is_one_way() {
        let mut job = Job::new(1, "Logo design", dec!(200), 3);
        let first = Utc::now();
        assert!(job.mark_paid(first));
        assert_eq!(job.payment_date, Some(first));

        assert!(!job.mark_paid(Utc::now()));
        assert_eq!(job.payment_date, Some(first));
    }

    #[test]
    fn test_job_filter() {
        let unpaid = Job::new(1, "a", dec!(10), 1);
        let paid = Job::new(2, "b", dec!(10), 1).paid_at(Utc::now());

        assert!(JobFilter::All.matches(&unpaid) && JobFilter::All.matches(&paid));
        assert!(JobFilter::Unpaid.matches(&unpaid));
        assert!(!JobFilter::Unpaid.matches(&paid));
        assert!(JobFilter::Paid.matches(&paid));
        assert!(!JobFilter::Paid.matches(&unpaid));
    }
}
