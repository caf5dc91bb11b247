//! Seed generator for the loyalty-programme integration dataset.
//!
//! Synthesizes users, employees, monthly utility usage, a reward catalog,
//! a points ledger with redemptions, and derived balances, then upserts
//! everything into the target store. Randomized, but consistent: stock is
//! never oversold, spend never exceeds earn, balances always reproduce.

pub mod balance_aggregator;
pub mod clock;
pub mod config;
pub mod entity_generator;
pub mod error;
pub mod ledger_simulator;
pub mod name_generator;
pub mod orchestrator;
pub mod report;
pub mod reward_catalog;
pub mod rng;
pub mod row;
pub mod store;
pub mod types;
pub mod usage_synthesizer;
pub mod writer;
