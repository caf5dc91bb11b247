use serde::{Deserialize, Serialize};

/// Monthly demand multipliers, January first.
pub const SEASONAL_FACTORS: [f64; 12] = [
    1.30, // Jan
    1.25, // Feb
    1.10, // Mar
    0.90, // Apr
    0.85, // May
    1.10, // Jun (rainy season)
    1.35, // Jul
    1.40, // Aug
    1.20, // Sep
    0.90, // Oct
    0.95, // Nov
    1.20, // Dec
];

/// Seasonal multiplier for a calendar month (1-12).
pub fn seasonal_factor(month: u32) -> f64 {
    SEASONAL_FACTORS[((month.clamp(1, 12)) - 1) as usize]
}

/// Baseline and billing parameters for one metered commodity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommodityParams {
    pub kind: String,
    pub unit: String,
    pub baseline_mean: f64,
    pub baseline_std: f64,
    /// Minimum baseline and minimum recorded usage.
    pub floor: f64,
    /// Currency units per unit of usage.
    pub rate: f64,
}

/// Knobs of the generative model. Defaults reproduce the production dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationParams {
    pub electricity: CommodityParams,
    pub gas: CommodityParams,
    /// Chance a user reports the secondary commodity in a given month.
    pub gas_report_probability: f64,
    pub usage_noise_std: f64,
    /// Share of active users that earn points.
    pub point_active_fraction: f64,
    pub earn_events_per_month: (i64, i64),
    pub earn_point_values: Vec<i64>,
    pub earn_reasons: Vec<String>,
    /// Chance a point-active user redeems at all.
    pub redemption_probability: f64,
    pub redemptions_per_user: (i64, i64),
    pub redemption_lookback_days: i64,
    /// Creation-date window for active users, days back.
    pub active_created_days: (i64, i64),
    /// Creation-date window for inactive users, days back.
    pub inactive_created_days: (i64, i64),
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            electricity: CommodityParams {
                kind: "electricity".into(),
                unit: "kWh".into(),
                baseline_mean: 450.0,
                baseline_std: 100.0,
                floor: 200.0,
                rate: 30.0,
            },
            gas: CommodityParams {
                kind: "gas".into(),
                unit: "m³".into(),
                baseline_mean: 35.0,
                baseline_std: 8.0,
                floor: 10.0,
                rate: 160.0,
            },
            gas_report_probability: 0.7,
            usage_noise_std: 0.1,
            point_active_fraction: 0.7,
            earn_events_per_month: (1, 3),
            earn_point_values: vec![10, 20, 30, 50, 100, 150],
            earn_reasons: [
                "Monthly login",
                "Energy-saving goal achieved",
                "Usage data uploaded",
                "Air-conditioner setpoint optimised",
                "Switched to LED lighting",
                "Training course completed",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            redemption_probability: 0.3,
            redemptions_per_user: (1, 2),
            redemption_lookback_days: 365,
            active_created_days: (30, 730),
            inactive_created_days: (0, 90),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SeedConfig {
    pub employees: usize,
    pub months_back: u32,
    pub active_rate: f64,
    pub seed: u64,
    /// Rows per upsert batch.
    pub batch_size: usize,
    /// Commit after this many batches (plus a final commit).
    pub commit_every_batches: usize,
    /// Fail at startup when a generator writes columns the table lacks.
    /// When false the writer silently drops those columns instead.
    pub strict_schema: bool,
    pub company_name: String,
    pub generation: GenerationParams,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            employees: 15_000,
            months_back: 24,
            active_rate: 0.6,
            seed: 42,
            batch_size: 1000,
            commit_every_batches: 5,
            strict_schema: true,
            company_name: "Tech0 Sample Company".into(),
            generation: GenerationParams::default(),
        }
    }
}

impl SeedConfig {
    /// Load overrides from a JSON file. Missing fields keep their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: SeedConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Small, fast configuration for tests.
    pub fn default_test() -> Self {
        Self {
            employees: 50,
            months_back: 6,
            active_rate: 0.6,
            seed: 0xC0FF_EE00,
            batch_size: 16,
            commit_every_batches: 2,
            ..Self::default()
        }
    }

    /// Number of users flagged active: floor(employees × active_rate).
    pub fn active_count(&self) -> usize {
        active_count(self.employees, self.active_rate)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.active_rate) {
            anyhow::bail!("active_rate must be within [0, 1], got {}", self.active_rate);
        }
        if self.batch_size == 0 || self.commit_every_batches == 0 {
            anyhow::bail!("batch_size and commit_every_batches must be positive");
        }
        let g = &self.generation;
        if g.earn_point_values.is_empty() || g.earn_reasons.is_empty() {
            anyhow::bail!("earn_point_values and earn_reasons must not be empty");
        }
        for (name, (lo, hi)) in [
            ("earn_events_per_month", g.earn_events_per_month),
            ("redemptions_per_user", g.redemptions_per_user),
            ("active_created_days", g.active_created_days),
            ("inactive_created_days", g.inactive_created_days),
        ] {
            if lo > hi || lo < 0 {
                anyhow::bail!("{name} must be a non-negative range, got ({lo}, {hi})");
            }
        }
        if g.redemption_lookback_days < 0 {
            anyhow::bail!(
                "redemption_lookback_days must be non-negative, got {}",
                g.redemption_lookback_days
            );
        }
        for (name, p) in [
            ("point_active_fraction", g.point_active_fraction),
            ("redemption_probability", g.redemption_probability),
            ("gas_report_probability", g.gas_report_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                anyhow::bail!("{name} must be within [0, 1], got {p}");
            }
        }
        for (name, sd) in [
            ("usage_noise_std", g.usage_noise_std),
            ("electricity.baseline_std", g.electricity.baseline_std),
            ("gas.baseline_std", g.gas.baseline_std),
        ] {
            if sd.is_nan() || sd < 0.0 {
                anyhow::bail!("{name} must be a non-negative standard deviation, got {sd}");
            }
        }
        Ok(())
    }
}

/// floor(n × rate), with rate clamped to [0, 1].
pub fn active_count(n: usize, rate: f64) -> usize {
    let rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
    ((n as f64) * rate).floor() as usize
}
