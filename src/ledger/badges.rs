//! Badge derivation.
//!
//! Badges are unlocked from a habit's current streak only. Each unlock is keyed
//! by `{habit id}-{milestone}` so re-running the check never duplicates one,
//! and the collection is capped at [`MAX_BADGES`] with oldest-first eviction.

use std::collections::HashSet;

use super::types::{Badge, Habit};

/// Maximum number of badges retained.
pub const MAX_BADGES: usize = 18;

/// Fixed streak milestones, in ascending order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MilestoneTier {
    Bronze,
    Silver,
    Gold,
    Trophy,
}

impl MilestoneTier {
    pub const ALL: [MilestoneTier; 4] = [
        MilestoneTier::Bronze,
        MilestoneTier::Silver,
        MilestoneTier::Gold,
        MilestoneTier::Trophy,
    ];

    pub fn days(self) -> u32 {
        match self {
            MilestoneTier::Bronze => 7,
            MilestoneTier::Silver => 21,
            MilestoneTier::Gold => 50,
            MilestoneTier::Trophy => 100,
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            MilestoneTier::Bronze => "🥉",
            MilestoneTier::Silver => "🥈",
            MilestoneTier::Gold => "🥇",
            MilestoneTier::Trophy => "🏆",
        }
    }

    fn title(self, habit_name: &str) -> String {
        match self {
            MilestoneTier::Bronze => format!("{habit_name}: 7 days in a row"),
            MilestoneTier::Silver => format!("{habit_name}: 21 days 💪"),
            MilestoneTier::Gold => format!("{habit_name}: 50 days!"),
            MilestoneTier::Trophy => format!("{habit_name}: 100 days 🎉"),
        }
    }

    pub fn badge_id(self, habit: &Habit) -> String {
        format!("{}-{}", habit.id, self.days())
    }

    pub fn badge(self, habit: &Habit) -> Badge {
        Badge {
            id: self.badge_id(habit),
            emoji: self.emoji().to_string(),
            title: self.title(&habit.name),
        }
    }
}

pub const TARGET_EMOJI: &str = "✨";

pub fn target_badge_id(habit: &Habit) -> String {
    format!("{}-target", habit.id)
}

pub fn target_badge(habit: &Habit) -> Badge {
    Badge {
        id: target_badge_id(habit),
        emoji: TARGET_EMOJI.to_string(),
        title: format!("{}: Target reached ({})!", habit.name, habit.target),
    }
}

/// Badges `habit` qualifies for that are not in `existing`, in unlock order:
/// milestones ascending, then the target badge.
pub fn derive_unlocks(habit: &Habit, existing: &HashSet<&str>) -> Vec<Badge> {
    let mut unlocked: Vec<Badge> = MilestoneTier::ALL
        .into_iter()
        .filter(|tier| habit.streak >= tier.days())
        .filter(|tier| !existing.contains(tier.badge_id(habit).as_str()))
        .map(|tier| tier.badge(habit))
        .collect();

    if habit.streak >= habit.target && !existing.contains(target_badge_id(habit).as_str()) {
        unlocked.push(target_badge(habit));
    }
    unlocked
}

/// Append newly earned badges for `habit` and enforce the retention cap.
/// Returns the badges unlocked by this call.
pub fn check_for_badges(badges: &mut Vec<Badge>, habit: &Habit) -> Vec<Badge> {
    let unlocked = {
        let existing: HashSet<&str> = badges.iter().map(|b| b.id.as_str()).collect();
        derive_unlocks(habit, &existing)
    };
    badges.extend(unlocked.iter().cloned());
    enforce_cap(badges);
    unlocked
}

/// Drop the oldest badges until at most [`MAX_BADGES`] remain.
pub fn enforce_cap(badges: &mut Vec<Badge>) {
    if badges.len() > MAX_BADGES {
        let excess = badges.len() - MAX_BADGES;
        badges.drain(..excess);
    }
}
