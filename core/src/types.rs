//! Shared primitive types used across the whole seeding run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary key of a persisted row. Always pre-allocated by the generator.
pub type RowId = i64;

/// Identity of a user; equals the 1-based generation index.
pub type UserId = RowId;

/// Identity of a reward in the catalog.
pub type RewardId = RowId;

/// Every table the seeder knows about.
/// Ordering is the order tables are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Companies,
    Users,
    Employees,
    EnergyRecords,
    Rewards,
    PointsLedger,
    Redemptions,
    Points,
    Rankings,
}

impl Table {
    pub const ALL: [Table; 9] = [
        Table::Companies,
        Table::Users,
        Table::Employees,
        Table::EnergyRecords,
        Table::Rewards,
        Table::PointsLedger,
        Table::Redemptions,
        Table::Points,
        Table::Rankings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Companies => "companies",
            Self::Users => "users",
            Self::Employees => "employees",
            Self::EnergyRecords => "energy_records",
            Self::Rewards => "rewards",
            Self::PointsLedger => "points_ledger",
            Self::Redemptions => "redemptions",
            Self::Points => "points",
            Self::Rankings => "rankings",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
