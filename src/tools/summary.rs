use schemars::JsonSchema;
use serde::Deserialize;

use crate::server::ServerState;

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub struct SummaryParams {
    #[serde(default)]
    pub verbose: bool,
}

pub fn ledger_summary(state: &ServerState, verbose: bool) -> String {
    let uptime = state.uptime();
    let transports = if state.transports.is_empty() {
        "none".to_string()
    } else {
        state.transports.join(", ")
    };
    let ledger = state.ledger.lock();
    let habits = ledger.list_habits();
    let complete = habits.iter().filter(|h| h.is_complete()).count();
    let badges = ledger.list_badges().len();

    if verbose {
        let mut out = format!(
            "status: ok\nversion: {}\nuptime_seconds: {}\ntransports: {}\ntoday: {}\nhabits: {}\ncomplete: {}\nbadges: {}\ndays_recorded: {}",
            state.version,
            uptime.as_secs(),
            transports,
            ledger.today(),
            habits.len(),
            complete,
            badges,
            ledger.history().len(),
        );
        for habit in habits {
            out.push_str(&format!(
                "\n- {} [{}] {}/{}",
                habit.name, habit.id, habit.streak, habit.target
            ));
        }
        out
    } else {
        format!(
            "ok (v{}, uptime {}s, {} habits, {} at target, {} badges)",
            state.version,
            uptime.as_secs(),
            habits.len(),
            complete,
            badges
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{open_with, share};
    use crate::ledger::FixedClock;
    use crate::settings::Settings;
    use crate::storage::MemoryStore;

    fn state() -> ServerState {
        let clock = FixedClock::ymd(2024, 1, 1).unwrap();
        let mut ledger = open_with(Box::new(MemoryStore::new()), Box::new(clock));
        let id = ledger.add_habit("Read", Some(1)).id;
        ledger.increment(&id);
        ledger.add_habit("Run", None);
        ServerState::new(share(ledger), &Settings::default())
    }

    #[test]
    fn short_summary_counts() {
        let text = ledger_summary(&state(), false);
        assert!(text.starts_with("ok (v"), "{text}");
        assert!(text.contains("2 habits, 1 at target, 1 badges"), "{text}");
    }

    #[test]
    fn verbose_summary_lists_habits() {
        let text = ledger_summary(&state(), true);
        assert!(text.contains("transports: stdio"), "{text}");
        assert!(text.contains("today: 2024-01-01"), "{text}");
        assert!(text.contains("- Read ["), "{text}");
        assert!(text.contains("1/1"), "{text}");
    }
}
