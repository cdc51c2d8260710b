use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::error::{AppError, Result};
use crate::models::Profile;

/// Repository for Profile rows. Balance changes take a connection so they run
/// inside the caller's transaction.
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a profile, letting the database assign the id.
    pub async fn create(&self, profile: &Profile) -> Result<Profile> {
        let row = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (first_name, last_name, profession, balance, type, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, first_name, last_name, profession, balance, type, created_at, updated_at
            "#,
        )
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.profession)
        .bind(profile.balance)
        .bind(profile.profile_type)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Finds a profile by id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Profile>> {
        let row = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, first_name, last_name, profession, balance, type, created_at, updated_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Reads a profile and holds its row lock until the transaction ends.
    pub async fn lock(conn: &mut PgConnection, id: i64) -> Result<Option<Profile>> {
        let row = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, first_name, last_name, profession, balance, type, created_at, updated_at
            FROM profiles
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

    /// Credits a profile balance.
    pub async fn credit(conn: &mut PgConnection, id: i64, amount: Decimal) -> Result<Profile> {
        let row = sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles
            SET balance = balance + $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, first_name, last_name, profession, balance, type, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(amount)
        .fetch_optional(conn)
        .await
        .map_err(AppError::Database)?;

        row.ok_or_else(|| AppError::NotFound(format!("Profile with id '{}' not found", id)))
    }

    /// Debits a profile balance.
    /// Returns None if the balance is lower than the amount.
    pub async fn debit(conn: &mut PgConnection, id: i64, amount: Decimal) -> Result<Option<Profile>> {
        let row = sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles
            SET balance = balance - $2,
                updated_at = NOW()
            WHERE id = $1
              AND balance >= $2
            RETURNING id, first_name, last_name, profession, balance, type, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(amount)
        .fetch_optional(conn)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }
}
