//! Schema catalog: what each target table looks like right now.
//!
//! Loaded once at startup from `pragma_table_info`. A table that is
//! missing is logged and left out of the catalog; writers for it skip.

use super::SeedStore;
use crate::{
    error::{SeedError, SeedResult},
    types::Table,
};
use rusqlite::params;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub decl_type: String,
    pub nullable: bool,
    pub has_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: Table,
    pub columns: Vec<ColumnInfo>,
    /// Primary-key columns in key order.
    pub primary_key: Vec<String>,
}

impl TableSchema {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn is_key(&self, name: &str) -> bool {
        self.primary_key.iter().any(|k| k == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    tables: BTreeMap<Table, TableSchema>,
}

impl SchemaCatalog {
    /// Introspect every table in `tables`. Missing tables are warned about
    /// and omitted rather than failing the load.
    pub fn load(store: &SeedStore, tables: &[Table]) -> SeedResult<Self> {
        let mut catalog = Self::default();
        for &table in tables {
            match describe(store, table)? {
                Some(schema) => {
                    log::info!("schema: {table} has {} columns", schema.columns.len());
                    catalog.insert(schema);
                }
                None => log::warn!("schema: table {table} does not exist or is not accessible"),
            }
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, schema: TableSchema) {
        self.tables.insert(schema.table, schema);
    }

    pub fn get(&self, table: Table) -> Option<&TableSchema> {
        self.tables.get(&table)
    }

    pub fn contains(&self, table: Table) -> bool {
        self.tables.contains_key(&table)
    }

    /// The schema for `table`, or `SchemaUnavailable`.
    pub fn require(&self, table: Table) -> SeedResult<&TableSchema> {
        self.get(table)
            .ok_or(SeedError::SchemaUnavailable { table })
    }

    /// Check that every column a generator fills exists in the table.
    /// Tables absent from the catalog pass; their writes are skipped later.
    pub fn check_shape(&self, table: Table, columns: &[&str]) -> SeedResult<()> {
        let Some(schema) = self.get(table) else {
            return Ok(());
        };
        let missing: Vec<String> = columns
            .iter()
            .filter(|c| !schema.has_column(c))
            .map(|c| c.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SeedError::SchemaMismatch { table, missing })
        }
    }
}

fn describe(store: &SeedStore, table: Table) -> SeedResult<Option<TableSchema>> {
    let mut stmt = store.conn().prepare(
        "SELECT name, type, \"notnull\", dflt_value IS NOT NULL, pk
         FROM pragma_table_info(?1) ORDER BY cid ASC",
    )?;
    let mut keyed: Vec<(i64, String)> = Vec::new();
    let columns = stmt
        .query_map(params![table.as_str()], |row| {
            Ok((
                ColumnInfo {
                    name: row.get(0)?,
                    decl_type: row.get(1)?,
                    nullable: row.get::<_, i64>(2)? == 0,
                    has_default: row.get(3)?,
                },
                row.get::<_, i64>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|(col, pk)| {
            if pk > 0 {
                keyed.push((pk, col.name.clone()));
            }
            col
        })
        .collect::<Vec<_>>();

    if columns.is_empty() {
        return Ok(None);
    }
    keyed.sort();
    Ok(Some(TableSchema {
        table,
        columns,
        primary_key: keyed.into_iter().map(|(_, name)| name).collect(),
    }))
}
