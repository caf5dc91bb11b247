//! Idempotent batched upsert.
//!
//! Every producer persists through here. Rows are projected onto the
//! columns the table really has, grouped into fixed-size batches and
//! written with `INSERT .. ON CONFLICT(pk) DO UPDATE`, so re-applying
//! the same rows refreshes them instead of duplicating them.

use crate::{
    error::{SeedError, SeedResult},
    row::Row,
    store::{SchemaCatalog, SeedStore, TableSchema},
    types::Table,
};
use rusqlite::{params_from_iter, Connection};

pub struct BulkWriter<'a> {
    store: &'a SeedStore,
    catalog: &'a SchemaCatalog,
    batch_size: usize,
    commit_every: usize,
}

impl<'a> BulkWriter<'a> {
    pub fn new(
        store: &'a SeedStore,
        catalog: &'a SchemaCatalog,
        batch_size: usize,
        commit_every: usize,
    ) -> Self {
        Self {
            store,
            catalog,
            batch_size: batch_size.max(1),
            commit_every: commit_every.max(1),
        }
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        self.catalog
    }

    /// Upsert `rows` in self-managed transactions, committing every
    /// `commit_every` batches and once more at the end.
    ///
    /// On a failing batch the open transaction is rolled back and the
    /// error is returned; batches committed before it stay written.
    pub fn upsert(&self, table: Table, rows: &[Row]) -> SeedResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let schema = self.catalog.require(table)?;
        let plan = UpsertPlan::build(schema, rows)?;
        let conn = self.store.conn();

        let mut affected = 0usize;
        let mut committed = 0usize;
        let mut tx = conn.unchecked_transaction()?;

        for (batch, chunk) in rows.chunks(self.batch_size).enumerate() {
            match plan.write_batch(&tx, schema, chunk) {
                Ok(n) => affected += n,
                Err(source) => {
                    if let Err(e) = tx.rollback() {
                        log::error!("{table}: rollback after batch {batch} failed: {e}");
                    }
                    log::error!("{table}: bulk upsert failed at batch {batch}: {source}");
                    return Err(SeedError::BatchWriteFailure {
                        table,
                        batch,
                        committed_rows: committed,
                        source,
                    });
                }
            }
            if (batch + 1) % self.commit_every == 0 {
                tx.commit()?;
                committed = affected;
                log::debug!("{table}: committed {committed} rows after batch {batch}");
                tx = conn.unchecked_transaction()?;
            }
        }
        tx.commit()?;
        log::info!("{table}: {affected} rows upserted");
        Ok(affected)
    }

    /// Same projection and batching, inside a transaction the caller owns.
    /// Never commits; any error is returned untouched for the caller to
    /// roll back.
    pub fn upsert_within(&self, conn: &Connection, table: Table, rows: &[Row]) -> SeedResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let schema = self.catalog.require(table)?;
        let plan = UpsertPlan::build(schema, rows)?;
        let mut affected = 0usize;
        for chunk in rows.chunks(self.batch_size) {
            affected += plan.write_batch(conn, schema, chunk)?;
        }
        log::debug!("{table}: {affected} rows staged in open transaction");
        Ok(affected)
    }
}

/// The statement for one table, derived from the first row's columns.
struct UpsertPlan {
    columns: Vec<&'static str>,
    sql: String,
}

impl UpsertPlan {
    fn build(schema: &TableSchema, rows: &[Row]) -> SeedResult<Self> {
        if schema.primary_key.is_empty() {
            return Err(SeedError::MissingPrimaryKey {
                table: schema.table,
            });
        }
        let first = rows[0].project(|c| schema.has_column(c));
        let columns: Vec<&'static str> = first.columns().collect();
        if first.len() < rows[0].len() {
            log::debug!(
                "{}: dropping {} column(s) unknown to the schema",
                schema.table,
                rows[0].len() - first.len()
            );
        }
        Ok(Self {
            sql: upsert_sql(schema, &columns),
            columns,
        })
    }

    fn write_batch(&self, conn: &Connection, schema: &TableSchema, chunk: &[Row]) -> rusqlite::Result<usize> {
        let mut stmt = conn.prepare_cached(&self.sql)?;
        let mut affected = 0;
        for row in chunk {
            let projected = row.project(|c| schema.has_column(c));
            let values = self
                .columns
                .iter()
                .map(|c| projected.get(c).cloned().unwrap_or(rusqlite::types::Value::Null));
            affected += stmt.execute(params_from_iter(values))?;
        }
        Ok(affected)
    }
}

/// `INSERT .. ON CONFLICT (pk) DO UPDATE SET col = excluded.col` for every
/// non-key column; `DO NOTHING` when every written column is part of the key.
pub fn upsert_sql(schema: &TableSchema, columns: &[&str]) -> String {
    let quoted: Vec<String> = columns.iter().map(|c| format!("\"{c}\"")).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    let conflict: Vec<String> = schema
        .primary_key
        .iter()
        .map(|k| format!("\"{k}\""))
        .collect();
    let updates: Vec<String> = columns
        .iter()
        .filter(|c| !schema.is_key(c))
        .map(|c| format!("\"{c}\" = excluded.\"{c}\""))
        .collect();
    let action = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };
    format!(
        "INSERT INTO \"{}\" ({}) VALUES ({}) ON CONFLICT ({}) {}",
        schema.table.as_str(),
        quoted.join(", "),
        placeholders.join(", "),
        conflict.join(", "),
        action
    )
}
