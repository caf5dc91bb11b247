//! The seeding run, start to finish.
//!
//! EXECUTION ORDER (fixed, never reordered):
//!   0. Schema catalog load + row-shape check
//!   1. Company        (created once, reused afterwards)
//!   2. Users
//!   3. Employees      (user_id = generated user id)
//!   4. Energy records (active users only)
//!   5. Reward catalog
//!   6. Ledger         (needs step 5; one transaction)
//!   7. Balances       (recomputed from the ledger)
//!
//! RULES:
//!   - Every step returns a StepOutcome; the run folds them into a RunReport.
//!   - A failed upsert is recovered: logged, reported, the run moves on.
//!   - Any Err from a step is fatal: later steps do not run. There is no
//!     resume; every write is an upsert, so the run is simply repeated.

use crate::{
    balance_aggregator,
    clock::SeedClock,
    config::SeedConfig,
    entity_generator::{default_company, CompanyRecord, EmployeeRecord, EntityGenerator, UserRecord},
    error::{SeedError, SeedResult},
    ledger_simulator::{self, LedgerEntry, LedgerSimulator, Redemption},
    report::{RunReport, StepOutcome},
    reward_catalog::{self, RewardRecord},
    rng::{RngBank, StreamSlot},
    row::{rows_of, Row, TableRow},
    store::{SchemaCatalog, SeedStore},
    types::{RowId, Table, UserId},
    usage_synthesizer::{EnergyRecord, UsageSynthesizer},
    writer::BulkWriter,
};
use std::time::Instant;
use uuid::Uuid;

const POINTS_COLUMNS: &[&str] = &[
    "user_id",
    "current_balance",
    "total_earned",
    "total_spent",
    "updated_at",
];

/// Everything a step needs, built once per run and passed down.
pub struct RunContext<'a> {
    pub run_id: String,
    pub config: &'a SeedConfig,
    pub clock: SeedClock,
    pub rng: RngBank,
    pub catalog: SchemaCatalog,
}

impl RunContext<'_> {
    fn writer<'s>(&'s self, store: &'s SeedStore) -> BulkWriter<'s> {
        BulkWriter::new(
            store,
            &self.catalog,
            self.config.batch_size,
            self.config.commit_every_batches,
        )
    }
}

pub struct Orchestrator<'a> {
    store: &'a SeedStore,
    config: SeedConfig,
    clock: SeedClock,
}

impl<'a> Orchestrator<'a> {
    pub fn new(store: &'a SeedStore, config: SeedConfig) -> Self {
        Self {
            store,
            config,
            clock: SeedClock::system(),
        }
    }

    /// Pin "now" for the whole run.
    pub fn with_clock(mut self, clock: SeedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SeedConfig {
        &self.config
    }

    /// Execute every step in order. The report carries the fatal error,
    /// if any, in `fatal`.
    pub fn run(&self) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::new(Uuid::new_v4().to_string(), self.config.seed);
        log::info!(
            "seed run {}: {} employees, {} active, {} months back, seed {}",
            report.run_id,
            self.config.employees,
            self.config.active_count(),
            self.config.months_back,
            self.config.seed
        );

        if let Err(e) = self.run_steps(&mut report) {
            log::error!("seed run {} aborted: {e}", report.run_id);
            report.fatal = Some(e);
        }
        report.elapsed_ms = started.elapsed().as_millis();
        report.log_summary();
        report
    }

    fn run_steps(&self, report: &mut RunReport) -> SeedResult<()> {
        let run_id = report.run_id.clone();
        let ctx = record(report, "schema", self.prepare(run_id))?;
        let writer = ctx.writer(self.store);

        let company_ids = record(report, "companies", self.ensure_company(&ctx, &writer))?;

        let population = EntityGenerator::new(&self.config.generation).generate(
            self.config.employees,
            self.config.active_rate,
            &company_ids,
            &ctx.clock,
            &mut ctx.rng.for_stream(StreamSlot::Entity),
        );
        record(report, "users", Ok((self.persist(&writer, Table::Users, &population.user_rows()), ())))?;
        record(
            report,
            "employees",
            Ok((self.persist(&writer, Table::Employees, &population.employee_rows()), ())),
        )?;

        let active = population.active_user_ids();
        record(report, "energy_records", Ok((self.energy_step(&ctx, &writer, &active), ())))?;

        let catalog_loaded = record(report, "rewards", Ok(self.rewards_step(&ctx, &writer)))?;

        record(report, "ledger", self.ledger_step(&ctx, &writer, &active, catalog_loaded).map(|o| (o, ())))?;
        record(report, "balances", Ok((self.balance_step(&ctx), ())))?;
        Ok(())
    }

    // ── Step 0 ─────────────────────────────────────────────────

    fn prepare(&self, run_id: String) -> SeedResult<(StepOutcome, RunContext<'_>)> {
        self.config
            .validate()
            .map_err(|e| SeedError::Config(e.to_string()))?;
        let catalog = SchemaCatalog::load(self.store, &Table::ALL)?;

        for (table, columns) in producer_shapes() {
            match catalog.check_shape(table, columns) {
                Ok(()) => {}
                Err(e) if self.config.strict_schema => return Err(e),
                Err(e) => log::warn!("{e}; extra columns will be dropped on write"),
            }
        }

        let ctx = RunContext {
            run_id,
            config: &self.config,
            clock: self.clock,
            rng: RngBank::new(self.config.seed),
            catalog,
        };
        Ok((StepOutcome::Completed(Vec::new()), ctx))
    }

    // ── Step 1 ─────────────────────────────────────────────────

    /// Returns the ids employees can be spread across.
    fn ensure_company(&self, ctx: &RunContext<'_>, writer: &BulkWriter<'_>) -> SeedResult<(StepOutcome, Vec<RowId>)> {
        if !ctx.catalog.contains(Table::Companies) {
            return Ok((skip_missing(Table::Companies), Vec::new()));
        }
        let existing = self.store.company_ids()?;
        if !existing.is_empty() {
            log::info!("companies: reusing {} existing companies", existing.len());
            return Ok((StepOutcome::Completed(Vec::new()), existing));
        }
        let company: CompanyRecord = default_company(&self.config.company_name, &ctx.clock);
        let outcome = self.persist(writer, Table::Companies, &[company.to_row()]);
        Ok((outcome, vec![company.id]))
    }

    // ── Steps 2-5 ──────────────────────────────────────────────

    fn energy_step(&self, ctx: &RunContext<'_>, writer: &BulkWriter<'_>, active: &[UserId]) -> StepOutcome {
        if !ctx.catalog.contains(Table::EnergyRecords) {
            return skip_missing(Table::EnergyRecords);
        }
        let records = UsageSynthesizer::new(&self.config.generation).synthesize(
            active,
            self.config.months_back,
            &ctx.clock,
            &mut ctx.rng.for_stream(StreamSlot::Usage),
        );
        self.persist(writer, Table::EnergyRecords, &rows_of(&records))
    }

    /// Returns the outcome and whether the catalog is now in the store.
    fn rewards_step(&self, ctx: &RunContext<'_>, writer: &BulkWriter<'_>) -> (StepOutcome, bool) {
        let rewards = reward_catalog::catalog(&ctx.clock);
        let outcome = self.persist(writer, Table::Rewards, &rows_of(&rewards));
        let loaded = matches!(outcome, StepOutcome::Completed(_));
        (outcome, loaded)
    }

    /// Write through the bulk writer, turning a write failure into a
    /// recovered outcome.
    fn persist(&self, writer: &BulkWriter<'_>, table: Table, rows: &[Row]) -> StepOutcome {
        if !writer.catalog().contains(table) {
            return skip_missing(table);
        }
        match writer.upsert(table, rows) {
            Ok(n) => StepOutcome::completed(table, n),
            Err(error) => {
                log::warn!("{table}: write failed, continuing with the next step: {error}");
                StepOutcome::Recovered { error }
            }
        }
    }

    // ── Step 6 ─────────────────────────────────────────────────

    fn ledger_step(
        &self,
        ctx: &RunContext<'_>,
        writer: &BulkWriter<'_>,
        active: &[UserId],
        catalog_loaded: bool,
    ) -> SeedResult<StepOutcome> {
        if !catalog_loaded || !ctx.catalog.contains(Table::Rewards) {
            return Err(SeedError::CatalogMissing);
        }
        for table in [Table::PointsLedger, Table::Redemptions] {
            if !ctx.catalog.contains(table) {
                return Ok(skip_missing(table));
            }
        }

        let simulator = LedgerSimulator::new(&self.config.generation, self.store.reward_inventory()?)?;
        let plan = simulator.run(
            active,
            self.config.months_back,
            &ctx.clock,
            &mut ctx.rng.for_stream(StreamSlot::Ledger),
        );
        let counts = ledger_simulator::commit(&plan, self.store, writer)?;
        Ok(StepOutcome::Completed(vec![
            (Table::PointsLedger, counts.ledger_rows),
            (Table::Redemptions, counts.redemption_rows),
        ]))
    }

    // ── Step 7 ─────────────────────────────────────────────────

    fn balance_step(&self, ctx: &RunContext<'_>) -> StepOutcome {
        for table in [Table::PointsLedger, Table::Points] {
            if !ctx.catalog.contains(table) {
                return skip_missing(table);
            }
        }
        match balance_aggregator::recompute(self.store) {
            Ok(n) => StepOutcome::completed(Table::Points, n),
            Err(error) => {
                log::error!("balances: recompute failed and was rolled back: {error}");
                StepOutcome::Recovered { error }
            }
        }
    }
}

/// Record a step's result in the report and pass its value through.
fn record<T>(report: &mut RunReport, step: &'static str, result: SeedResult<(StepOutcome, T)>) -> SeedResult<T> {
    match result {
        Ok((outcome, value)) => {
            report.record(step, &outcome);
            Ok(value)
        }
        Err(e) => {
            report.record_failure(step, &e);
            Err(e)
        }
    }
}

fn skip_missing(table: Table) -> StepOutcome {
    log::warn!("{table}: table unavailable, skipping its writes");
    StepOutcome::Skipped {
        reason: format!("table {table} is unavailable"),
    }
}

/// The columns each generator fills, per target table.
pub fn producer_shapes() -> [(Table, &'static [&'static str]); 8] {
    [
        (CompanyRecord::TABLE, CompanyRecord::COLUMNS),
        (UserRecord::TABLE, UserRecord::COLUMNS),
        (EmployeeRecord::TABLE, EmployeeRecord::COLUMNS),
        (EnergyRecord::TABLE, EnergyRecord::COLUMNS),
        (RewardRecord::TABLE, RewardRecord::COLUMNS),
        (LedgerEntry::TABLE, LedgerEntry::COLUMNS),
        (Redemption::TABLE, Redemption::COLUMNS),
        (Table::Points, POINTS_COLUMNS),
    ]
}
