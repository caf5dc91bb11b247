//! Users and their employee records.
//!
//! The first floor(N × active_rate) records by index are active; the rest
//! are not. Active users are backdated across a long window so the
//! population skews toward long-tenured accounts, inactive ones land in
//! a narrow recent window (recent churn or onboarding).

use crate::{
    clock::{timestamp_value, SeedClock},
    config::{active_count, GenerationParams},
    name_generator::NameGenerator,
    rng::StreamRng,
    row::{Row, TableRow},
    types::{RowId, Table, UserId},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const DEPARTMENTS: [&str; 5] = [
    "Sales",
    "Engineering",
    "Administration",
    "Human Resources",
    "Accounting",
];

pub const DEFAULT_COMPANY_ID: RowId = 1;

pub const POSITIONS: [&str; 5] = ["Staff", "Senior Staff", "Supervisor", "Manager", "Director"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub id: RowId,
    pub name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TableRow for CompanyRecord {
    const TABLE: Table = Table::Companies;
    const COLUMNS: &'static [&'static str] = &["id", "name", "created_at", "updated_at"];

    fn to_row(&self) -> Row {
        Row::new()
            .with("id", self.id)
            .with("name", self.name.clone())
            .with("created_at", timestamp_value(&self.created_at))
            .with("updated_at", timestamp_value(&self.updated_at))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl TableRow for UserRecord {
    const TABLE: Table = Table::Users;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "email",
        "password_hash",
        "first_name",
        "last_name",
        "is_active",
        "created_at",
        "updated_at",
    ];

    fn to_row(&self) -> Row {
        Row::new()
            .with("id", self.id)
            .with("email", self.email.clone())
            .with("password_hash", self.password_hash.clone())
            .with("first_name", self.first_name.clone())
            .with("last_name", self.last_name.clone())
            .with("is_active", self.is_active)
            .with("created_at", timestamp_value(&self.created_at))
            .with("updated_at", timestamp_value(&self.created_at))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub id: RowId,
    /// Always the id of the user generated in the same pass.
    pub user_id: UserId,
    pub company_id: RowId,
    pub employee_code: String,
    pub department: String,
    pub position: String,
    pub created_at: NaiveDateTime,
}

impl TableRow for EmployeeRecord {
    const TABLE: Table = Table::Employees;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "company_id",
        "employee_id",
        "department",
        "position",
        "created_at",
        "updated_at",
    ];

    fn to_row(&self) -> Row {
        Row::new()
            .with("id", self.id)
            .with("user_id", self.user_id)
            .with("company_id", self.company_id)
            .with("employee_id", self.employee_code.clone())
            .with("department", self.department.clone())
            .with("position", self.position.clone())
            .with("created_at", timestamp_value(&self.created_at))
            .with("updated_at", timestamp_value(&self.created_at))
    }
}

/// Ordered (user, employee) pairs from one generation pass.
#[derive(Debug, Clone, Default)]
pub struct Population {
    pub pairs: Vec<(UserRecord, EmployeeRecord)>,
}

impl Population {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn user_rows(&self) -> Vec<Row> {
        self.pairs.iter().map(|(u, _)| u.to_row()).collect()
    }

    pub fn employee_rows(&self) -> Vec<Row> {
        self.pairs.iter().map(|(_, e)| e.to_row()).collect()
    }

    /// Ids of active users, in generation order.
    pub fn active_user_ids(&self) -> Vec<UserId> {
        self.pairs
            .iter()
            .filter(|(u, _)| u.is_active)
            .map(|(u, _)| u.id)
            .collect()
    }
}

pub struct EntityGenerator<'a> {
    params: &'a GenerationParams,
}

impl<'a> EntityGenerator<'a> {
    pub fn new(params: &'a GenerationParams) -> Self {
        Self { params }
    }

    /// Generate `count` pairs. Ids are 1-based generation indexes and are
    /// written explicitly, so employee.user_id never depends on the store
    /// handing out identities in order.
    pub fn generate(
        &self,
        count: usize,
        active_rate: f64,
        company_ids: &[RowId],
        clock: &SeedClock,
        rng: &mut StreamRng,
    ) -> Population {
        let active = active_count(count, active_rate);
        let mut pairs = Vec::with_capacity(count);

        for i in 1..=count {
            let id = i as UserId;
            let is_active = i <= active;
            let (lo, hi) = if is_active {
                self.params.active_created_days
            } else {
                self.params.inactive_created_days
            };
            let created_at = clock.days_ago(rng.range_inclusive(lo, hi));
            let name = NameGenerator::generate(rng);

            let user = UserRecord {
                id,
                email: format!("user{i:06}@example.com"),
                password_hash: format!("dummy_hash_{i}"),
                first_name: name.first.to_string(),
                last_name: name.last.to_string(),
                is_active,
                created_at,
            };
            let employee = EmployeeRecord {
                id,
                user_id: id,
                company_id: rng.pick(company_ids).copied().unwrap_or(DEFAULT_COMPANY_ID),
                employee_code: format!("EMP{i:06}"),
                department: DEPARTMENTS[rng.next_u64_below(DEPARTMENTS.len() as u64) as usize].into(),
                position: POSITIONS[rng.next_u64_below(POSITIONS.len() as u64) as usize].into(),
                created_at,
            };
            pairs.push((user, employee));
        }
        log::info!("entities: generated {count} users ({active} active)");
        Population { pairs }
    }
}

/// The single company every employee belongs to when the store has none.
pub fn default_company(name: &str, clock: &SeedClock) -> CompanyRecord {
    CompanyRecord {
        id: DEFAULT_COMPANY_ID,
        name: name.to_string(),
        created_at: clock.days_ago(365 * 2),
        updated_at: clock.now,
    }
}
