use crate::types::Table;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Cannot open store at '{target}': {source}")]
    ConnectionFailure {
        target: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Table '{table}' is missing or inaccessible")]
    SchemaUnavailable { table: Table },

    #[error("Table '{table}' has no column(s) {missing:?} required by its generator")]
    SchemaMismatch { table: Table, missing: Vec<String> },

    #[error("Table '{table}' has no primary key; upsert needs one")]
    MissingPrimaryKey { table: Table },

    #[error("Batch {batch} of '{table}' failed ({committed_rows} rows committed earlier): {source}")]
    BatchWriteFailure {
        table: Table,
        batch: usize,
        committed_rows: usize,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Ledger transaction rolled back: {0}")]
    LedgerTransactionFailure(#[source] Box<SeedError>),

    #[error("Reward catalog is empty or missing; load the catalog before simulating the ledger")]
    CatalogMissing,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type SeedResult<T> = Result<T, SeedError>;
