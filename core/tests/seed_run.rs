//! End-to-end seeding runs against an in-memory store, including the
//! ways a run degrades when tables are locked or missing.

use seedgen_core::{
    balance_aggregator::{fold_ledger, recompute},
    clock::SeedClock,
    config::SeedConfig,
    error::SeedError,
    orchestrator::Orchestrator,
    report::{RunReport, StepStatus},
    reward_catalog,
    store::SeedStore,
    types::Table,
};
use std::collections::BTreeMap;

fn migrated() -> SeedStore {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = SeedStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn run(store: &SeedStore, config: SeedConfig) -> RunReport {
    Orchestrator::new(store, config)
        .with_clock(SeedClock::fixed_test())
        .run()
}

fn eager_config() -> SeedConfig {
    let mut config = SeedConfig::default_test();
    config.generation.redemption_probability = 1.0;
    config
}

fn status<'r>(report: &'r RunReport, step: &str) -> Option<&'r StepStatus> {
    report.steps.iter().find(|s| s.step == step).map(|s| &s.status)
}

fn block_inserts(store: &SeedStore, table: &str) {
    store
        .execute_batch(&format!(
            "CREATE TRIGGER block_{table} BEFORE INSERT ON {table}
             BEGIN SELECT RAISE(ABORT, '{table} is locked'); END;"
        ))
        .unwrap();
}

#[test]
fn full_run_populates_every_table() {
    let store = migrated();
    let report = run(&store, SeedConfig::default_test());
    assert!(report.succeeded(), "run failed: {:?}", report.fatal);

    assert_eq!(store.count_rows(Table::Companies).unwrap(), 1);
    assert_eq!(store.count_rows(Table::Users).unwrap(), 50);
    assert_eq!(store.count_rows(Table::Employees).unwrap(), 50);
    assert_eq!(store.count_rows(Table::Rewards).unwrap(), 15);
    assert_eq!(store.count_rows(Table::Rankings).unwrap(), 0);

    // 30 active users × 6 months, electricity always, gas sometimes.
    let energy = store.count_rows(Table::EnergyRecords).unwrap();
    assert!((180..=360).contains(&energy), "energy rows: {energy}");
    assert_eq!(report.count(Table::EnergyRecords) as i64, energy);

    // floor(30 × 0.7) point-active users, each with at least six earns.
    assert_eq!(store.count_rows(Table::Points).unwrap(), 21);
    assert!(store.count_rows(Table::PointsLedger).unwrap() >= 21 * 6);
}

#[test]
fn balances_match_the_ledger() {
    let store = migrated();
    let report = run(&store, eager_config());
    assert!(report.succeeded());

    let ledger = store.ledger_entries().unwrap();
    let balances = store.point_balances().unwrap();
    assert_eq!(balances, fold_ledger(&ledger));

    for b in &balances {
        assert_eq!(b.current_balance, b.total_earned - b.total_spent);
        assert!(b.current_balance >= 0, "user {} has {}", b.user_id, b.current_balance);
    }
}

#[test]
fn recomputing_balances_is_idempotent() {
    let store = migrated();
    run(&store, eager_config());

    let first = store.point_balances().unwrap();
    assert_eq!(recompute(&store).unwrap(), first.len());
    assert_eq!(store.point_balances().unwrap(), first);
}

#[test]
fn persisted_ledger_respects_price_and_stock() {
    let store = migrated();
    run(&store, eager_config());

    let catalog = reward_catalog::catalog(&SeedClock::fixed_test());
    let redemptions = store.redemptions().unwrap();
    assert!(!redemptions.is_empty());

    let mut redeemed: BTreeMap<i64, i64> = BTreeMap::new();
    for r in &redemptions {
        let reward = &catalog[(r.reward_id - 1) as usize];
        assert_eq!(r.points_used, reward.points_required);
        *redeemed.entry(r.reward_id).or_default() += 1;
    }
    for reward in &catalog {
        let left = store.reward_stock(reward.id).unwrap().unwrap();
        let used = redeemed.get(&reward.id).copied().unwrap_or(0);
        assert!(left >= 0);
        assert_eq!(left, reward.stock - used, "stock of reward {}", reward.id);
    }

    let mut running: BTreeMap<i64, i64> = BTreeMap::new();
    for e in store.ledger_entries().unwrap() {
        let balance = running.entry(e.user_id).or_default();
        *balance += e.delta;
        assert!(*balance >= 0, "entry {} overdraws user {}", e.id, e.user_id);
    }
}

#[test]
fn rerun_on_the_same_store_upserts_in_place() {
    let store = migrated();
    let config = eager_config();
    run(&store, config.clone());

    let ledger = store.ledger_entries().unwrap();
    let balances = store.point_balances().unwrap();
    let stock = store.reward_inventory().unwrap();
    let counts: Vec<i64> = Table::ALL.iter().map(|t| store.count_rows(*t).unwrap()).collect();

    let report = run(&store, config);
    assert!(report.succeeded());
    assert_eq!(store.ledger_entries().unwrap(), ledger);
    assert_eq!(store.point_balances().unwrap(), balances);
    assert_eq!(store.reward_inventory().unwrap(), stock);
    let again: Vec<i64> = Table::ALL.iter().map(|t| store.count_rows(*t).unwrap()).collect();
    assert_eq!(again, counts);
}

#[test]
fn smaller_rerun_leaves_no_stale_ledger_rows() {
    let store = migrated();
    run(&store, eager_config());
    let large_ledger = store.count_rows(Table::PointsLedger).unwrap();

    let mut smaller = eager_config();
    smaller.employees = 10;
    let report = run(&store, smaller);
    assert!(report.succeeded(), "run failed: {:?}", report.fatal);

    let ledger = store.ledger_entries().unwrap();
    assert!((ledger.len() as i64) < large_ledger);
    assert_eq!(report.count(Table::PointsLedger), ledger.len());
    for (i, e) in ledger.iter().enumerate() {
        assert_eq!(e.id, i as i64 + 1, "ledger ids must be dense after a rerun");
    }

    // 10 employees → 6 active → floor(6 × 0.7) = 4 point-active users.
    let balances = store.point_balances().unwrap();
    assert_eq!(balances, fold_ledger(&ledger));
    assert!(balances.iter().all(|b| b.user_id <= 4), "stale balances: {balances:?}");

    let redemptions = store.redemptions().unwrap();
    assert_eq!(report.count(Table::Redemptions), redemptions.len());
    for reward in reward_catalog::catalog(&SeedClock::fixed_test()) {
        let used = redemptions.iter().filter(|r| r.reward_id == reward.id).count() as i64;
        assert_eq!(
            store.reward_stock(reward.id).unwrap(),
            Some(reward.stock - used),
            "stock of reward {}",
            reward.id
        );
    }
}

#[test]
fn existing_companies_are_reused() {
    let store = migrated();
    store
        .execute_batch(
            "INSERT INTO companies (id, name, created_at, updated_at) VALUES
                (1, 'North', '2024-01-01 00:00:00', '2024-01-01 00:00:00'),
                (2, 'South', '2024-01-01 00:00:00', '2024-01-01 00:00:00');",
        )
        .unwrap();

    let report = run(&store, SeedConfig::default_test());
    assert!(report.succeeded());
    assert_eq!(store.count_rows(Table::Companies).unwrap(), 2);
    assert_eq!(store.count_rows(Table::Employees).unwrap(), 50);
}

#[test]
fn company_ids_with_gaps_are_respected() {
    let store = migrated();
    store
        .execute_batch(
            "INSERT INTO companies (id, name, created_at, updated_at) VALUES
                (7, 'East', '2024-01-01 00:00:00', '2024-01-01 00:00:00'),
                (42, 'West', '2024-01-01 00:00:00', '2024-01-01 00:00:00');",
        )
        .unwrap();
    assert_eq!(store.company_ids().unwrap(), vec![7, 42]);

    let report = run(&store, SeedConfig::default_test());
    assert!(report.succeeded(), "run failed: {:?}", report.fatal);
    assert!(matches!(status(&report, "employees"), Some(StepStatus::Completed)));
    assert_eq!(store.count_rows(Table::Employees).unwrap(), 50);
    assert_eq!(store.company_ids().unwrap(), vec![7, 42]);
}

#[test]
fn strict_mode_stops_on_a_narrower_schema() {
    let store = migrated();
    store
        .execute_batch("ALTER TABLE rewards DROP COLUMN description;")
        .unwrap();

    let report = run(&store, SeedConfig::default_test());
    assert!(!report.succeeded());
    assert!(matches!(
        report.fatal,
        Some(SeedError::SchemaMismatch {
            table: Table::Rewards,
            ..
        })
    ));
    assert!(matches!(status(&report, "schema"), Some(StepStatus::Failed { .. })));
    assert_eq!(store.count_rows(Table::Users).unwrap(), 0);
}

#[test]
fn lenient_mode_drops_unknown_columns() {
    let store = migrated();
    store
        .execute_batch("ALTER TABLE rewards DROP COLUMN description;")
        .unwrap();

    let mut config = SeedConfig::default_test();
    config.strict_schema = false;
    let report = run(&store, config);
    assert!(report.succeeded(), "run failed: {:?}", report.fatal);
    assert_eq!(store.count_rows(Table::Rewards).unwrap(), 15);
}

#[test]
fn failed_batch_is_recovered_and_the_run_continues() {
    let store = migrated();
    block_inserts(&store, "employees");

    let report = run(&store, SeedConfig::default_test());
    assert!(report.succeeded(), "run failed: {:?}", report.fatal);
    assert!(matches!(status(&report, "employees"), Some(StepStatus::Recovered { .. })));
    assert_eq!(store.count_rows(Table::Employees).unwrap(), 0);
    assert_eq!(store.count_rows(Table::Users).unwrap(), 50);
    assert!(store.count_rows(Table::PointsLedger).unwrap() > 0);
    assert!(matches!(status(&report, "balances"), Some(StepStatus::Completed)));
}

#[test]
fn ledger_failure_rolls_back_and_aborts() {
    let store = migrated();
    block_inserts(&store, "redemptions");

    let report = run(&store, eager_config());
    assert!(!report.succeeded());
    assert!(matches!(
        report.fatal,
        Some(SeedError::LedgerTransactionFailure(_))
    ));
    assert!(matches!(status(&report, "ledger"), Some(StepStatus::Failed { .. })));
    assert!(status(&report, "balances").is_none(), "balances must not run");

    assert_eq!(store.count_rows(Table::PointsLedger).unwrap(), 0);
    assert_eq!(store.count_rows(Table::Redemptions).unwrap(), 0);
    for reward in reward_catalog::catalog(&SeedClock::fixed_test()) {
        assert_eq!(store.reward_stock(reward.id).unwrap(), Some(reward.stock));
    }
    assert_eq!(store.count_rows(Table::Users).unwrap(), 50);
}

#[test]
fn ledger_needs_the_catalog() {
    let store = migrated();
    block_inserts(&store, "rewards");

    let report = run(&store, SeedConfig::default_test());
    assert!(matches!(status(&report, "rewards"), Some(StepStatus::Recovered { .. })));
    assert!(matches!(report.fatal, Some(SeedError::CatalogMissing)));
    assert_eq!(store.count_rows(Table::PointsLedger).unwrap(), 0);
}

#[test]
fn missing_table_is_skipped() {
    let store = migrated();
    store.execute_batch("DROP TABLE energy_records;").unwrap();

    let report = run(&store, SeedConfig::default_test());
    assert!(report.succeeded(), "run failed: {:?}", report.fatal);
    assert!(matches!(
        status(&report, "energy_records"),
        Some(StepStatus::Skipped { .. })
    ));
    assert_eq!(report.count(Table::EnergyRecords), 0);
    assert_eq!(store.count_rows(Table::Points).unwrap(), 21);
}

#[test]
fn invalid_config_is_fatal_before_any_write() {
    let store = migrated();
    let mut config = SeedConfig::default_test();
    config.active_rate = 1.5;

    let report = run(&store, config);
    assert!(matches!(report.fatal, Some(SeedError::Config(_))));
    assert_eq!(store.count_rows(Table::Companies).unwrap(), 0);
}

#[test]
fn negative_redemption_lookback_is_rejected() {
    let store = migrated();
    let mut config = eager_config();
    config.generation.redemption_lookback_days = -1;

    let report = run(&store, config);
    assert!(matches!(report.fatal, Some(SeedError::Config(_))));
    assert!(matches!(status(&report, "schema"), Some(StepStatus::Failed { .. })));
    assert_eq!(store.count_rows(Table::PointsLedger).unwrap(), 0);
}

#[test]
fn out_of_range_generation_knobs_are_rejected() {
    let mut config = SeedConfig::default_test();
    config.generation.redemption_probability = 1.5;
    assert!(config.validate().is_err());

    let mut config = SeedConfig::default_test();
    config.generation.point_active_fraction = -0.1;
    assert!(config.validate().is_err());

    let mut config = SeedConfig::default_test();
    config.generation.gas_report_probability = f64::NAN;
    assert!(config.validate().is_err());

    let mut config = SeedConfig::default_test();
    config.generation.usage_noise_std = -0.5;
    assert!(config.validate().is_err());

    assert!(SeedConfig::default_test().validate().is_ok());
}

#[test]
fn report_serializes_counts_by_table_name() {
    let store = migrated();
    let report = run(&store, SeedConfig::default_test());
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["counts"]["users"], 50);
    assert_eq!(json["counts"]["rewards"], 15);
    assert_eq!(json["fatal"], serde_json::Value::Null);
    assert_eq!(json["steps"][0]["step"], "schema");
    assert_eq!(json["steps"][0]["status"]["status"], "completed");
}
