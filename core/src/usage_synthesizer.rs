//! Monthly utility usage per active user.
//!
//! Each user gets one baseline per commodity, drawn once. Every month
//! multiplies it by the calendar month's seasonal factor and by a noise
//! factor shared across commodities for that user-month. The primary
//! commodity is always reported; the secondary one only some months.

use crate::{
    clock::{timestamp_value, SeedClock},
    config::{seasonal_factor, CommodityParams, GenerationParams},
    rng::StreamRng,
    row::{Row, TableRow},
    types::{RowId, Table, UserId},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyRecord {
    pub id: RowId,
    pub user_id: UserId,
    pub kind: String,
    pub year: i32,
    pub month: u32,
    pub usage_value: f64,
    pub unit: String,
    pub cost: i64,
    pub created_at: NaiveDateTime,
}

impl TableRow for EnergyRecord {
    const TABLE: Table = Table::EnergyRecords;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "type",
        "year",
        "month",
        "usage_value",
        "unit",
        "cost_yen",
        "created_at",
    ];

    fn to_row(&self) -> Row {
        Row::new()
            .with("id", self.id)
            .with("user_id", self.user_id)
            .with("type", self.kind.clone())
            .with("year", self.year)
            .with("month", self.month)
            .with("usage_value", self.usage_value)
            .with("unit", self.unit.clone())
            .with("cost_yen", self.cost)
            .with("created_at", timestamp_value(&self.created_at))
    }
}

/// Per-user baselines, fixed for the whole window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub primary: f64,
    pub secondary: f64,
}

pub struct UsageSynthesizer<'a> {
    params: &'a GenerationParams,
}

impl<'a> UsageSynthesizer<'a> {
    pub fn new(params: &'a GenerationParams) -> Self {
        Self { params }
    }

    pub fn draw_baseline(&self, rng: &mut StreamRng) -> Baseline {
        Baseline {
            primary: draw_floor_clamped(&self.params.electricity, rng),
            secondary: draw_floor_clamped(&self.params.gas, rng),
        }
    }

    /// Records for every user in `users` over `months_back` months ending at
    /// the current month. Ids are assigned in generation order from 1.
    pub fn synthesize(
        &self,
        users: &[UserId],
        months_back: u32,
        clock: &SeedClock,
        rng: &mut StreamRng,
    ) -> Vec<EnergyRecord> {
        let mut records = Vec::with_capacity(users.len() * months_back as usize * 2);
        for &user_id in users {
            let baseline = self.draw_baseline(rng);
            for offset in 0..months_back {
                self.synthesize_month(user_id, baseline, offset, clock, rng, &mut records);
            }
        }
        log::info!(
            "usage: {} records for {} users × {months_back} months",
            records.len(),
            users.len()
        );
        records
    }

    fn synthesize_month(
        &self,
        user_id: UserId,
        baseline: Baseline,
        offset: u32,
        clock: &SeedClock,
        rng: &mut StreamRng,
        out: &mut Vec<EnergyRecord>,
    ) {
        let bucket = clock.bucket(offset);
        let seasonal = seasonal_factor(bucket.month);
        let noise = rng.gauss(1.0, self.params.usage_noise_std).max(0.0);

        let mut push = |commodity: &CommodityParams, base: f64| {
            let usage = round_to(usage_for(commodity, base, seasonal, noise), 2);
            out.push(EnergyRecord {
                id: out.len() as RowId + 1,
                user_id,
                kind: commodity.kind.clone(),
                year: bucket.year,
                month: bucket.month,
                usage_value: usage,
                unit: commodity.unit.clone(),
                cost: cost_for(commodity, usage),
                created_at: bucket.date,
            });
        };

        push(&self.params.electricity, baseline.primary);
        if rng.chance(self.params.gas_report_probability) {
            push(&self.params.gas, baseline.secondary);
        }
    }
}

fn draw_floor_clamped(commodity: &CommodityParams, rng: &mut StreamRng) -> f64 {
    rng.gauss(commodity.baseline_mean, commodity.baseline_std)
        .max(commodity.floor)
}

/// baseline × seasonal × noise, never below the commodity floor.
pub fn usage_for(commodity: &CommodityParams, baseline: f64, seasonal: f64, noise: f64) -> f64 {
    (baseline * seasonal * noise).max(commodity.floor)
}

/// Cost is a pure function of the (rounded) usage.
pub fn cost_for(commodity: &CommodityParams, usage: f64) -> i64 {
    (usage * commodity.rate).round() as i64
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}
