//! seed-runner: populate a target database with the integration dataset.
//!
//! Usage:
//!   seed-runner --db seed.db
//!   seed-runner --db seed.db --employees 2000 --months 12 --seed 7
//!   SEED_DB_PATH=seed.db seed-runner --config seed.json --report run.json

use anyhow::{Context, Result};
use seedgen_core::{config::SeedConfig, orchestrator::Orchestrator, report::RunReport, store::SeedStore};
use std::env;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(report) if report.succeeded() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<RunReport> {
    let args: Vec<String> = env::args().collect();

    let Some(db) = flag_value(&args, "--db").or_else(|| env::var("SEED_DB_PATH").ok()) else {
        anyhow::bail!("no target database: pass --db or set SEED_DB_PATH");
    };

    let mut config = match flag_value(&args, "--config") {
        Some(path) => SeedConfig::load(&path)?,
        None => SeedConfig::default(),
    };
    config.employees = parse_arg(&args, "--employees", config.employees);
    config.months_back = parse_arg(&args, "--months", config.months_back);
    config.active_rate = parse_arg(&args, "--active-rate", config.active_rate);
    config.seed = parse_arg(&args, "--seed", config.seed);
    config.validate()?;

    println!("seed-runner");
    println!("  db:          {db}");
    println!("  employees:   {}", config.employees);
    println!("  active rate: {}", config.active_rate);
    println!("  months:      {}", config.months_back);
    println!("  seed:        {}", config.seed);
    println!();

    let store = SeedStore::open(&db)?;
    store.migrate()?;

    let report = Orchestrator::new(&store, config).run();
    print_summary(&report);

    if let Some(path) = flag_value(&args, "--report") {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json).with_context(|| format!("writing report to {path}"))?;
        log::info!("run report written to {path}");
    }
    Ok(report)
}

fn print_summary(report: &RunReport) {
    println!("=== RUN SUMMARY ===");
    println!("  run_id:   {}", report.run_id);
    println!("  elapsed:  {} ms", report.elapsed_ms);
    for (table, rows) in &report.counts {
        println!("  {:<16}{rows}", format!("{table}:"));
    }
    match &report.fatal {
        Some(e) => println!("  result:   FAILED ({e})"),
        None => println!("  result:   ok"),
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].clone())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
