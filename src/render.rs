//! Terminal presentation. Everything here reads ledger data; nothing is derived
//! beyond layout.

use colored::Colorize;

use crate::ledger::{Badge, Habit, HistoryMatrix};

const BAR_WIDTH: usize = 10;

pub fn progress_bar(habit: &Habit, width: usize) -> String {
    let filled = ((habit.progress() * width as f64).round() as usize).min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

pub fn habits(habits: &[Habit]) -> String {
    if habits.is_empty() {
        return "No habits yet. Add one with `habit-ledger add <name>`."
            .dimmed()
            .to_string();
    }
    let name_width = habits
        .iter()
        .map(|h| h.name.chars().count())
        .max()
        .unwrap_or(0);
    habits
        .iter()
        .map(|h| {
            let bar = progress_bar(h, BAR_WIDTH);
            let bar = if h.is_complete() {
                bar.yellow().bold()
            } else {
                bar.cyan()
            };
            format!(
                "{:<name_width$}  {} {:>4}/{:<4} {}",
                h.name,
                bar,
                h.streak,
                h.target,
                h.id.to_string().dimmed(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn badges(badges: &[Badge]) -> String {
    if badges.is_empty() {
        return "No badges yet.".dimmed().to_string();
    }
    badges
        .iter()
        .map(|b| format!("{} {}", b.emoji, b.title))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Date rows by habit columns. Empty when there are no habits.
pub fn history_table(matrix: &HistoryMatrix) -> String {
    if matrix.columns.is_empty() {
        return String::new();
    }
    let widths: Vec<usize> = matrix
        .columns
        .iter()
        .map(|c| c.name.chars().count().max(3))
        .collect();

    let mut out = format!("{:<10}", "Date").bold().to_string();
    for (col, width) in matrix.columns.iter().zip(&widths) {
        out.push_str(&format!("  {:>width$}", col.name.bold(), width = *width));
    }
    for row in &matrix.rows {
        out.push('\n');
        out.push_str(&row.date.format("%Y-%m-%d").to_string());
        for (value, width) in row.values.iter().zip(&widths) {
            let cell = format!("{value:>width$}", width = *width);
            if *value == 0 {
                out.push_str(&format!("  {}", cell.dimmed()));
            } else {
                out.push_str(&format!("  {cell}"));
            }
        }
    }
    out
}
