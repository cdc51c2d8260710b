use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::error::{AppError, Result};
use crate::models::{Job, JobFilter};

/// Repository for Job rows.
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a job, letting the database assign the id.
    pub async fn create(&self, job: &Job) -> Result<Job> {
        let row = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (description, price, paid, payment_date, contract_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, description, price, paid, payment_date, contract_id, created_at, updated_at
            "#,
        )
        .bind(&job.description)
        .bind(job.price)
        .bind(job.paid)
        .bind(job.payment_date)
        .bind(job.contract_id)
        .bind(job.created_at)
        .bind(job.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Finds a job by id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, Job>(
            r#"
            SELECT id, description, price, paid, payment_date, contract_id, created_at, updated_at
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Lists jobs on the given contracts matching the payment filter.
    pub async fn list_by_contracts(&self, contract_ids: &[i64], filter: JobFilter) -> Result<Vec<Job>> {
        if contract_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, Job>(
            r#"
            SELECT id, description, price, paid, payment_date, contract_id, created_at, updated_at
            FROM jobs
            WHERE contract_id = ANY($1)
              AND ($2::bool IS NULL OR paid = $2)
              AND ($3::bool IS NULL OR (payment_date IS NULL) = $3)
            ORDER BY id
            "#,
        )
        .bind(contract_ids)
        .bind(matches!(filter, JobFilter::Paid).then_some(true))
        .bind(matches!(filter, JobFilter::Unpaid).then_some(true))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Reads a job and holds its row lock until the transaction ends.
    pub async fn lock(conn: &mut PgConnection, id: i64) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, Job>(
            r#"
            SELECT id, description, price, paid, payment_date, contract_id, created_at, updated_at
            FROM jobs
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Sums unpaid job prices across every contract the profile is party to.
    pub async fn outstanding_total(conn: &mut PgConnection, profile_id: i64) -> Result<Decimal> {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(j.price), 0)
            FROM jobs j
            JOIN contracts c ON c.id = j.contract_id
            WHERE (c.client_id = $1 OR c.contractor_id = $1)
              AND j.payment_date IS NULL
            "#,
        )
        .bind(profile_id)
        .fetch_one(conn)
        .await
        .map_err(AppError::Database)?;

        Ok(total)
    }

    /// Flips an unpaid job to paid. Returns None if it was already paid.
    pub async fn mark_paid(
        conn: &mut PgConnection,
        id: i64,
        paid_at: DateTime<Utc>,
    ) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET paid = TRUE,
                payment_date = $2,
                updated_at = $2
            WHERE id = $1 AND paid = FALSE
            RETURNING id, description, price, paid, payment_date, contract_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(paid_at)
        .fetch_optional(conn)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }
}
