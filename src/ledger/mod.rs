//! The habit ledger: owner of habits, daily history and badges.
//!
//! Every mutating operation ends with a full-snapshot save through the
//! [`SnapshotStore`]. Save failures are logged and otherwise ignored; the
//! in-memory state stays authoritative for the life of the process.

pub mod badges;
pub mod clock;
pub mod history;
pub mod types;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

pub use self::badges::{MAX_BADGES, MilestoneTier};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::history::{HistoryMatrix, MatrixColumn, MatrixRow};
pub use self::types::{
    Badge, DEFAULT_TARGET, DayRecord, Habit, HabitId, History, LedgerSnapshot, normalize_target,
};

use crate::export::{self, ExportError};
use crate::storage::SnapshotStore;

/// Result of a streak change: the habit as it now stands and the badges the
/// change unlocked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreakUpdate {
    pub habit: Habit,
    pub unlocked: Vec<Badge>,
}

pub struct Ledger<S, C = SystemClock> {
    store: S,
    clock: C,
    habits: Vec<Habit>,
    history: History,
    badges: Vec<Badge>,
}

impl<S: SnapshotStore, C: Clock> Ledger<S, C> {
    /// Load the persisted snapshot. Missing or unreadable data yields an empty ledger.
    pub fn open(store: S, clock: C) -> Self {
        let snapshot = match store.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => LedgerSnapshot::default(),
            Err(e) => {
                warn!("failed to load ledger snapshot, starting empty: {e}");
                LedgerSnapshot::default()
            }
        };
        Self::from_snapshot(store, clock, snapshot)
    }

    pub fn from_snapshot(store: S, clock: C, snapshot: LedgerSnapshot) -> Self {
        let LedgerSnapshot {
            mut habits,
            history,
            mut badges,
        } = snapshot;
        for habit in &mut habits {
            habit.target = habit.target.max(1);
        }
        badges::enforce_cap(&mut badges);
        debug!(
            habits = habits.len(),
            days = history.len(),
            badges = badges.len(),
            "ledger opened"
        );
        Self {
            store,
            clock,
            habits,
            history,
            badges,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            habits: self.habits.clone(),
            history: self.history.clone(),
            badges: self.badges.clone(),
        }
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.snapshot()) {
            warn!("failed to persist ledger snapshot: {e}");
        }
    }

    // Registry

    /// Create a habit with a zero streak. The name is stored as given;
    /// validating it is the caller's job.
    pub fn add_habit(&mut self, name: impl Into<String>, target_days: Option<i64>) -> Habit {
        let habit = Habit {
            id: HabitId::generate(),
            name: name.into(),
            streak: 0,
            target: normalize_target(target_days),
        };
        debug!(id = %habit.id, target = habit.target, "habit added");
        self.habits.push(habit.clone());
        self.persist();
        habit
    }

    /// Remove a habit and purge its entries from every day of history.
    /// Badges it earned are kept. Returns whether a habit was removed.
    pub fn remove_habit(&mut self, id: &HabitId) -> bool {
        let before = self.habits.len();
        self.habits.retain(|h| &h.id != id);
        let removed = self.habits.len() != before;
        for day in self.history.values_mut() {
            day.remove(id);
        }
        debug!(%id, removed, "habit removed");
        self.persist();
        removed
    }

    pub fn get_habit_by_id(&self, id: &HabitId) -> Option<&Habit> {
        self.habits.iter().find(|h| &h.id == id)
    }

    pub fn list_habits(&self) -> &[Habit] {
        &self.habits
    }

    pub fn list_badges(&self) -> &[Badge] {
        &self.badges
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    // Streaks

    /// The single streak mutation path. Clamps at zero, records today's value,
    /// unlocks badges, then persists. Unknown ids are a no-op.
    pub fn update_habit_streak(&mut self, id: &HabitId, delta: i64) -> Option<StreakUpdate> {
        let today = self.clock.today();
        let habit = {
            let habit = self.habits.iter_mut().find(|h| &h.id == id)?;
            let next = (habit.streak as i64).saturating_add(delta);
            habit.streak = next.clamp(0, u32::MAX as i64) as u32;
            habit.clone()
        };

        self.history
            .entry(today)
            .or_default()
            .insert(habit.id.clone(), habit.streak);

        let unlocked = badges::check_for_badges(&mut self.badges, &habit);
        for badge in &unlocked {
            info!(badge = %badge.id, "{} {}", badge.emoji, badge.title);
        }
        debug!(%id, delta, streak = habit.streak, "streak updated");

        self.persist();
        Some(StreakUpdate { habit, unlocked })
    }

    pub fn increment(&mut self, id: &HabitId) -> Option<StreakUpdate> {
        self.update_habit_streak(id, 1)
    }

    pub fn decrement(&mut self, id: &HabitId) -> Option<StreakUpdate> {
        self.update_habit_streak(id, -1)
    }

    // Daily reconciliation

    /// Make sure today's history row exists and holds a value for every habit,
    /// carrying the current streak forward where nothing was recorded yet.
    /// Existing values are never overwritten. Returns the number of cells filled.
    pub fn ensure_history_tracked(&mut self) -> usize {
        let today = self.clock.today();
        let day = self.history.entry(today).or_default();
        let mut filled = 0;
        for habit in &self.habits {
            day.entry(habit.id.clone()).or_insert_with(|| {
                filled += 1;
                habit.streak
            });
        }
        if filled > 0 {
            debug!(%today, filled, "history backfilled");
        }
        self.persist();
        filled
    }

    // Views

    pub fn recent_dates(&self, n: usize) -> Vec<NaiveDate> {
        history::recent_dates(self.clock.today(), n)
    }

    pub fn history_matrix(&self, n: usize) -> HistoryMatrix {
        HistoryMatrix::build(&self.history, &self.habits, &self.recent_dates(n))
    }

    pub fn export_csv(&self, n: usize) -> Result<String, ExportError> {
        export::to_csv(&self.history_matrix(n))
    }

    pub fn export_file_name(&self) -> String {
        export::file_name(self.clock.today())
    }

    pub fn reset_all(&mut self) {
        self.habits.clear();
        self.history.clear();
        self.badges.clear();
        info!("ledger reset");
        self.persist();
    }
}
