use sqlx::SqlitePool;
use anyhow::{Result, Context};
use chrono::{DateTime, Utc};
use crate::models::license::License;

const LICENSE_COLUMNS: &str = "id, key, owner, created_at, expires_at, active, notes";

#[derive(Clone, Debug)]
pub struct LicenseRepository {
    pool: SqlitePool,
}

impl LicenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new active license. A duplicate key surfaces as the
    /// underlying unique-constraint `sqlx::Error`.
    pub async fn create(
        &self,
        key: &str,
        owner: Option<&str>,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
        notes: Option<&str>,
    ) -> Result<License> {
        let rec = sqlx::query_as::<_, License>(&format!(
            r#"
            INSERT INTO licenses (key, owner, created_at, expires_at, active, notes)
            VALUES (?, ?, ?, ?, 1, ?)
            RETURNING {LICENSE_COLUMNS}
            "#
        ))
        .bind(key)
        .bind(owner)
        .bind(created_at)
        .bind(expires_at)
        .bind(notes)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create license")?;

        Ok(rec)
    }

    pub async fn get_all(&self) -> Result<Vec<License>> {
        let recs = sqlx::query_as::<_, License>(&format!(
            "SELECT {LICENSE_COLUMNS} FROM licenses ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch licenses")?;

        Ok(recs)
    }

    pub async fn get_by_key(&self, key: &str) -> Result<Option<License>> {
        sqlx::query_as::<_, License>(&format!(
            "SELECT {LICENSE_COLUMNS} FROM licenses WHERE key = ?"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch license by key")
    }

    /// Flip `active` in a single statement. `None` when the id does not exist.
    pub async fn toggle_active(&self, id: i64) -> Result<Option<License>> {
        sqlx::query_as::<_, License>(&format!(
            "UPDATE licenses SET active = NOT active WHERE id = ? RETURNING {LICENSE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to toggle license")
    }

    /// Returns `false` when nothing was deleted.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM licenses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete license")?;

        Ok(result.rows_affected() > 0)
    }
}
