use sqlx::{PgConnection, PgPool};

use crate::error::{AppError, Result};
use crate::models::{Contract, ContractStatus, DateRange};

/// Read-side repository for Contract rows.
pub struct ContractRepository {
    pool: PgPool,
}

impl ContractRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a contract, letting the database assign the id.
    pub async fn create(&self, contract: &Contract) -> Result<Contract> {
        let row = sqlx::query_as::<_, Contract>(
            r#"
            INSERT INTO contracts (terms, status, client_id, contractor_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, terms, status, client_id, contractor_id, created_at, updated_at
            "#,
        )
        .bind(&contract.terms)
        .bind(contract.status)
        .bind(contract.client_id)
        .bind(contract.contractor_id)
        .bind(contract.created_at)
        .bind(contract.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Finds a contract by id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Contract>> {
        let mut conn = self.pool.acquire().await.map_err(AppError::Database)?;
        Self::find_in(&mut *conn, id).await
    }

    /// Finds a contract by id on an existing connection.
    pub async fn find_in(conn: &mut PgConnection, id: i64) -> Result<Option<Contract>> {
        let row = sqlx::query_as::<_, Contract>(
            r#"
            SELECT id, terms, status, client_id, contractor_id, created_at, updated_at
            FROM contracts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Lists contracts in any of the given statuses.
    pub async fn list_by_status(&self, statuses: &[ContractStatus]) -> Result<Vec<Contract>> {
        let rows = sqlx::query_as::<_, Contract>(
            r#"
            SELECT id, terms, status, client_id, contractor_id, created_at, updated_at
            FROM contracts
            WHERE status = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(statuses)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Lists contracts where the profile is the contractor.
    pub async fn list_by_contractor(&self, contractor_id: i64) -> Result<Vec<Contract>> {
        let rows = sqlx::query_as::<_, Contract>(
            r#"
            SELECT id, terms, status, client_id, contractor_id, created_at, updated_at
            FROM contracts
            WHERE contractor_id = $1
            ORDER BY id
            "#,
        )
        .bind(contractor_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Lists contracts created inside the inclusive range.
    pub async fn list_created_between(&self, range: DateRange) -> Result<Vec<Contract>> {
        let rows = sqlx::query_as::<_, Contract>(
            r#"
            SELECT id, terms, status, client_id, contractor_id, created_at, updated_at
            FROM contracts
            WHERE created_at BETWEEN $1 AND $2
            ORDER BY id
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }
}
