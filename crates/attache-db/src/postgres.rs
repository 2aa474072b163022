//! Postgres record repository.
//!
//! Record types are mapped to tables explicitly; attachment data lives in a TEXT
//! column named `{field}_data` and records are matched on `id::text`.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use attache_core::RecordRef;
use sqlx::{PgPool, Row};

use crate::records::{Record, RecordRepository};

#[derive(Clone)]
pub struct PgRecordRepository {
    pool: PgPool,
    tables: HashMap<String, String>,
}

impl PgRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            tables: HashMap::new(),
        }
    }

    /// Map a record type (e.g. `User`) to its table (e.g. `users`).
    pub fn with_table(mut self, record_type: impl Into<String>, table: impl Into<String>) -> Self {
        self.tables.insert(record_type.into(), table.into());
        self
    }

    fn table_for(&self, record: &RecordRef) -> Result<&str> {
        let table = self
            .tables
            .get(&record.record_type)
            .with_context(|| format!("No table mapped for record type {}", record.record_type))?;
        ensure_identifier(table)?;
        Ok(table)
    }
}

// Table and column names are interpolated into SQL; only plain identifiers pass.
fn ensure_identifier(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if !valid {
        bail!("Invalid SQL identifier: {}", name);
    }
    Ok(())
}

#[async_trait]
impl RecordRepository for PgRecordRepository {
    #[tracing::instrument(skip(self), fields(db.record_type = %record.record_type, db.record_id = %record.record_id))]
    async fn find(&self, record: &RecordRef, attribute: &str) -> Result<Option<Record>> {
        let table = self.table_for(record)?;
        ensure_identifier(attribute)?;

        let sql = format!(
            "SELECT {column} FROM {table} WHERE id::text = $1",
            column = attribute,
            table = table
        );
        let row = sqlx::query(&sql)
            .bind(&record.record_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to load {}", record))?;

        match row {
            Some(row) => {
                let value: Option<String> = row
                    .try_get(0)
                    .with_context(|| format!("Failed to read {} of {}", attribute, record))?;
                Ok(Some(
                    Record::new(record.clone()).with_attribute(attribute, value),
                ))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, record), fields(db.record_type = %record.record_ref.record_type, db.record_id = %record.record_ref.record_id))]
    async fn save(&self, record: &Record) -> Result<()> {
        let table = self.table_for(&record.record_ref)?;
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        for (attribute, value) in &record.attributes {
            ensure_identifier(attribute)?;
            let sql = format!(
                "UPDATE {table} SET {column} = $1 WHERE id::text = $2",
                table = table,
                column = attribute
            );
            let result = sqlx::query(&sql)
                .bind(value.as_deref())
                .bind(&record.record_ref.record_id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to update {} of {}", attribute, record.record_ref))?;
            if result.rows_affected() == 0 {
                bail!("Record {} no longer exists", record.record_ref);
            }
        }

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(())
    }
}
