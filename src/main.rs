use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use dialoguer::{Confirm, theme::ColorfulTheme};

use habit_ledger::app::{self, AppLedger};
use habit_ledger::cli::{Cli, Command};
use habit_ledger::error::{ServiceError, ServiceResult};
use habit_ledger::ledger::{HabitId, StreakUpdate};
use habit_ledger::metadata::{PKG_NAME, PKG_VERSION};
use habit_ledger::settings::{Settings, settings_path};
use habit_ledger::validation::{parse_target, validate_days, validate_habit_name};
use habit_ledger::{logging, render, server};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(match cli.command {
        Command::Start(_) => "info",
        _ => "warn",
    });

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ServiceResult<()> {
    let settings_file = match &cli.global.config {
        Some(path) => path.clone(),
        None => settings_path()?,
    };
    let mut settings = Settings::load_from(&settings_file)?;

    match cli.command {
        Command::Version => {
            println!("{PKG_NAME} {PKG_VERSION}");
            Ok(())
        }
        Command::Config => {
            let edited = settings.edit_interactively()?;
            edited.save_to(&settings_file)?;
            println!("{} {}", "saved".green(), settings_file.display());
            Ok(())
        }
        Command::Start(args) => {
            cli.global.apply(&mut settings);
            args.apply(&mut settings);
            settings.validate()?;
            tracing::info!("starting {PKG_NAME} v{PKG_VERSION}");
            let ledger = app::share(app::open_ledger(&settings)?);
            server::run(&settings, ledger).await
        }
        command => {
            cli.global.apply(&mut settings);
            let mut ledger = app::open_ledger(&settings)?;
            run_local(command, &mut ledger, &settings)
        }
    }
}

fn print_update(update: &StreakUpdate) {
    let habit = &update.habit;
    let count = format!("{} / {}", habit.streak, habit.target);
    let count = if habit.is_complete() {
        count.yellow().bold()
    } else {
        count.normal()
    };
    println!("{}  {count}", habit.name);
    for badge in &update.unlocked {
        println!("{} {} {}", "unlocked".green().bold(), badge.emoji, badge.title);
    }
}

fn bump(ledger: &mut AppLedger, id: String, delta: i64) -> ServiceResult<()> {
    match ledger.update_habit_streak(&HabitId::from(id.as_str()), delta) {
        Some(update) => {
            print_update(&update);
            Ok(())
        }
        None => Err(ServiceError::HabitNotFound(id)),
    }
}

fn run_local(command: Command, ledger: &mut AppLedger, settings: &Settings) -> ServiceResult<()> {
    match command {
        Command::Add { name, target } => {
            let name = validate_habit_name(&name)?;
            let target = parse_target(&target)?;
            let habit = ledger.add_habit(name, Some(target));
            println!(
                "{} {} ({} days) {}",
                "added".green(),
                habit.name,
                habit.target,
                habit.id.to_string().dimmed()
            );
        }
        Command::Remove { id } => {
            if !ledger.remove_habit(&HabitId::from(id.as_str())) {
                return Err(ServiceError::HabitNotFound(id));
            }
            println!("{} {id}", "removed".green());
        }
        Command::Inc { id } => bump(ledger, id, 1)?,
        Command::Dec { id } => bump(ledger, id, -1)?,
        Command::List => println!("{}", render::habits(ledger.list_habits())),
        Command::Badges => println!("{}", render::badges(ledger.list_badges())),
        Command::History { days } => {
            let days = validate_days(days.unwrap_or(settings.history_days))?;
            let matrix = ledger.history_matrix(days);
            if matrix.columns.is_empty() {
                println!("{}", render::habits(&[]));
            } else {
                println!("{}", render::history_table(&matrix));
            }
        }
        Command::Export { days, output } => {
            let days = validate_days(days.unwrap_or(settings.history_days))?;
            let csv = ledger.export_csv(days)?;
            match output {
                Some(path) if path == Path::new("-") => print!("{csv}"),
                Some(path) => write_export(&path, &csv)?,
                None => write_export(Path::new(&ledger.export_file_name()), &csv)?,
            }
        }
        Command::Reset { yes } => {
            let confirmed = yes
                || Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt("Erase all habits, history and badges?")
                    .default(false)
                    .interact()?;
            if confirmed {
                ledger.reset_all();
                println!("{}", "all data erased".yellow());
            }
        }
        Command::Start(_) | Command::Config | Command::Version => {}
    }
    Ok(())
}

fn write_export(path: &Path, csv: &str) -> ServiceResult<()> {
    fs::write(path, csv)?;
    println!("{} {}", "exported".green(), path.display());
    Ok(())
}
