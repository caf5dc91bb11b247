//! The fixed reward catalog. Reference data: no randomness.

use crate::{
    clock::{timestamp_value, SeedClock},
    row::{Row, TableRow},
    types::{RewardId, Table},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRecord {
    pub id: RewardId,
    pub name: String,
    pub category: String,
    pub points_required: i64,
    pub stock: i64,
    pub description: String,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

impl TableRow for RewardRecord {
    const TABLE: Table = Table::Rewards;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "category",
        "points_required",
        "stock",
        "description",
        "active",
        "created_at",
        "updated_at",
    ];

    fn to_row(&self) -> Row {
        Row::new()
            .with("id", self.id)
            .with("name", self.name.clone())
            .with("category", self.category.clone())
            .with("points_required", self.points_required)
            .with("stock", self.stock)
            .with("description", self.description.clone())
            .with("active", self.active)
            .with("created_at", timestamp_value(&self.created_at))
            .with("updated_at", timestamp_value(&self.created_at))
    }
}

/// (name, category, points_required, initial stock, description)
const CATALOG: [(&str, &str, i64, i64, &str); 15] = [
    ("Amazon gift card ¥500", "Gift cards", 500, 10_000, "¥500 of credit on Amazon.co.jp"),
    ("Amazon gift card ¥1000", "Gift cards", 1000, 5_000, "¥1000 of credit on Amazon.co.jp"),
    ("Starbucks card ¥500", "Gift cards", 550, 3_000, "Prepaid ¥500 Starbucks card"),
    ("Book voucher ¥1000", "Gift cards", 1100, 2_000, "Book voucher accepted at bookstores nationwide"),
    ("QUO card ¥500", "Gift cards", 550, 8_000, "Prepaid ¥500 card for convenience stores"),
    ("Coffee beans (200g)", "Food & drink", 400, 1_500, "Organic coffee beans, 200g"),
    ("Green tea bag set", "Food & drink", 300, 2_000, "50 Shizuoka green tea bags"),
    ("Eco bag", "Household", 200, 5_000, "Foldable organic cotton shopping bag"),
    ("Insulated bottle (500ml)", "Household", 600, 1_000, "Stainless steel bottle, keeps hot or cold"),
    ("LED bulb (60W equivalent)", "Household", 250, 3_000, "Energy-saving daylight LED bulb"),
    ("Wireless mouse", "Electronics", 800, 500, "Ergonomic wireless mouse"),
    ("Power bank", "Electronics", 1200, 800, "10000mAh portable battery"),
    ("Streaming gift code, 1 month", "Entertainment", 900, 2_000, "One month of streaming service"),
    ("Movie ticket", "Entertainment", 1500, 1_000, "Admission ticket valid at cinemas nationwide"),
    ("Herb growing kit", "Other", 450, 1_200, "Grow-your-own basil and parsley kit"),
];

/// The catalog as it is loaded at `clock.now`. Ids are 1-based list order.
pub fn catalog(clock: &SeedClock) -> Vec<RewardRecord> {
    CATALOG
        .iter()
        .enumerate()
        .map(|(i, (name, category, points, stock, description))| RewardRecord {
            id: i as RewardId + 1,
            name: name.to_string(),
            category: category.to_string(),
            points_required: *points,
            stock: *stock,
            description: description.to_string(),
            active: true,
            created_at: clock.now,
        })
        .collect()
}
