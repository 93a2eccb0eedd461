use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Target assigned when the caller gives none.
pub const DEFAULT_TARGET: u32 = 7;

/// Opaque habit identifier. Backed by a ULID so ids are unique and never reused.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct HabitId(String);

impl HabitId {
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for HabitId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for HabitId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    pub streak: u32,
    pub target: u32,
}

impl Habit {
    /// Fraction of the target reached, capped at 1.0.
    pub fn progress(&self) -> f64 {
        let target = self.target.max(1) as f64;
        (self.streak as f64 / target).min(1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.streak >= self.target
    }
}

/// Normalise a requested target length: absent means 7, anything below 1 becomes 1.
pub fn normalize_target(target_days: Option<i64>) -> u32 {
    match target_days {
        None => DEFAULT_TARGET,
        Some(days) => days.clamp(1, u32::MAX as i64) as u32,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Badge {
    pub id: String,
    pub emoji: String,
    pub title: String,
}

/// Streak values recorded per day, then per habit.
pub type DayRecord = BTreeMap<HabitId, u32>;

/// Day-indexed history. Keys serialize as `YYYY-MM-DD`.
pub type History = BTreeMap<NaiveDate, DayRecord>;

/// The unit of persistence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub history: History,
    #[serde(default)]
    pub badges: Vec<Badge>,
}

impl LedgerSnapshot {
    pub fn is_empty(&self) -> bool {
        self.habits.is_empty() && self.history.is_empty() && self.badges.is_empty()
    }
}
