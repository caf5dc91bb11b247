//! Batched upsert tests: idempotence, projection, partial failure.

use seedgen_core::{
    clock::SeedClock,
    config::GenerationParams,
    entity_generator::EntityGenerator,
    error::SeedError,
    reward_catalog,
    rng::{RngBank, StreamSlot},
    row::{rows_of, Row},
    store::{SchemaCatalog, SeedStore},
    types::Table,
    writer::{upsert_sql, BulkWriter},
};

fn migrated() -> SeedStore {
    let store = SeedStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn user_rows(n: usize) -> Vec<Row> {
    let params = GenerationParams::default();
    EntityGenerator::new(&params)
        .generate(
            n,
            0.5,
            &[1],
            &SeedClock::fixed_test(),
            &mut RngBank::new(21).for_stream(StreamSlot::Entity),
        )
        .user_rows()
}

#[test]
fn same_rows_twice_leave_one_copy() {
    let store = migrated();
    let catalog = SchemaCatalog::load(&store, &Table::ALL).unwrap();
    let writer = BulkWriter::new(&store, &catalog, 4, 2);
    let rows = rows_of(&reward_catalog::catalog(&SeedClock::fixed_test()));

    assert_eq!(writer.upsert(Table::Rewards, &rows).unwrap(), 15);
    let first = store.reward_inventory().unwrap();
    assert_eq!(writer.upsert(Table::Rewards, &rows).unwrap(), 15);

    assert_eq!(store.count_rows(Table::Rewards).unwrap(), 15);
    assert_eq!(store.reward_inventory().unwrap(), first);
}

#[test]
fn rewrite_refreshes_non_key_columns() {
    let store = migrated();
    let catalog = SchemaCatalog::load(&store, &Table::ALL).unwrap();
    let writer = BulkWriter::new(&store, &catalog, 100, 1);
    let mut rewards = reward_catalog::catalog(&SeedClock::fixed_test());

    writer.upsert(Table::Rewards, &rows_of(&rewards)).unwrap();
    rewards[0].stock = 3;
    writer.upsert(Table::Rewards, &rows_of(&rewards)).unwrap();

    assert_eq!(store.reward_stock(1).unwrap(), Some(3));
    assert_eq!(store.count_rows(Table::Rewards).unwrap(), 15);
}

#[test]
fn unknown_columns_are_dropped() {
    let store = migrated();
    let catalog = SchemaCatalog::load(&store, &Table::ALL).unwrap();
    let writer = BulkWriter::new(&store, &catalog, 100, 1);
    let rows: Vec<Row> = rows_of(&reward_catalog::catalog(&SeedClock::fixed_test()))
        .into_iter()
        .map(|r| r.with("loyalty_tier", "gold".to_string()))
        .collect();

    assert_eq!(writer.upsert(Table::Rewards, &rows).unwrap(), 15);
}

#[test]
fn empty_input_writes_nothing() {
    let store = migrated();
    let catalog = SchemaCatalog::load(&store, &Table::ALL).unwrap();
    let writer = BulkWriter::new(&store, &catalog, 10, 1);
    assert_eq!(writer.upsert(Table::Users, &[]).unwrap(), 0);
}

#[test]
fn missing_table_is_unavailable() {
    let store = migrated();
    store.execute_batch("DROP TABLE rankings;").unwrap();
    let catalog = SchemaCatalog::load(&store, &Table::ALL).unwrap();

    assert!(!catalog.contains(Table::Rankings));
    let writer = BulkWriter::new(&store, &catalog, 10, 1);
    let row = Row::new().with("id", 1i64);
    let err = writer.upsert(Table::Rankings, &[row]).unwrap_err();
    assert!(matches!(err, SeedError::SchemaUnavailable { table: Table::Rankings }));
}

#[test]
fn failing_batch_keeps_earlier_commits() {
    let store = migrated();
    let catalog = SchemaCatalog::load(&store, &Table::ALL).unwrap();
    // 16 rows per batch, commit every 2 batches: rows 0..32 are committed
    // before batch 2 (rows 32..48) starts.
    let writer = BulkWriter::new(&store, &catalog, 16, 2);

    let mut rows = user_rows(50);
    rows[40] = Row::new().with("id", 41i64);

    match writer.upsert(Table::Users, &rows) {
        Err(SeedError::BatchWriteFailure {
            table,
            batch,
            committed_rows,
            ..
        }) => {
            assert_eq!(table, Table::Users);
            assert_eq!(batch, 2);
            assert_eq!(committed_rows, 32);
        }
        other => panic!("expected a batch failure, got {other:?}"),
    }
    assert_eq!(store.count_rows(Table::Users).unwrap(), 32);
}

#[test]
fn upsert_statement_updates_every_non_key_column() {
    let store = migrated();
    let catalog = SchemaCatalog::load(&store, &Table::ALL).unwrap();
    let schema = catalog.require(Table::Points).unwrap();
    assert_eq!(schema.primary_key, vec!["user_id".to_string()]);

    let sql = upsert_sql(schema, &["user_id", "current_balance"]);
    assert_eq!(
        sql,
        "INSERT INTO \"points\" (\"user_id\", \"current_balance\") VALUES (?1, ?2) \
         ON CONFLICT (\"user_id\") DO UPDATE SET \"current_balance\" = excluded.\"current_balance\""
    );
    assert!(upsert_sql(schema, &["user_id"]).ends_with("DO NOTHING"));
}

#[test]
fn strict_shape_check_reports_missing_columns() {
    let store = migrated();
    store
        .execute_batch("ALTER TABLE rewards DROP COLUMN description;")
        .unwrap();
    let catalog = SchemaCatalog::load(&store, &Table::ALL).unwrap();

    match catalog.check_shape(Table::Rewards, &["id", "name", "description"]) {
        Err(SeedError::SchemaMismatch { table, missing }) => {
            assert_eq!(table, Table::Rewards);
            assert_eq!(missing, vec!["description".to_string()]);
        }
        other => panic!("expected a schema mismatch, got {other:?}"),
    }
    assert!(catalog.check_shape(Table::Rewards, &["id", "name"]).is_ok());
}
