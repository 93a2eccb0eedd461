use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::metadata::{PKG_DESCRIPTION, PKG_NAME, PKG_VERSION};
use crate::settings::Settings;

#[derive(Parser, Debug, Clone)]
#[command(name = PKG_NAME)]
#[command(version = PKG_VERSION)]
#[command(about = PKG_DESCRIPTION, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArguments,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArguments {
    /// Settings file (defaults to <config dir>/habit-ledger/settings.json)
    #[arg(long, global = true, env = "HABIT_LEDGER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ledger data file, overriding the settings file
    #[arg(long, global = true, env = "HABIT_LEDGER_DATA")]
    pub data_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the ledger over MCP
    Start(StartArguments),
    /// Create a habit
    Add {
        name: String,
        /// Target streak length in days
        #[arg(long, short, default_value = "7")]
        target: String,
    },
    /// Delete a habit and its history
    Remove { id: String },
    /// Add a day to a habit's streak
    Inc { id: String },
    /// Remove a day from a habit's streak
    Dec { id: String },
    /// Show habits and their progress
    List,
    /// Show unlocked badges
    Badges,
    /// Show the recent history table
    History {
        #[arg(long, short)]
        days: Option<usize>,
    },
    /// Write the recent history as ';'-separated CSV
    Export {
        #[arg(long, short)]
        days: Option<usize>,
        /// Output file; `-` for stdout. Defaults to habits_history_<today>.csv
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Delete all habits, history and badges
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Open an interactive editor for settings.json
    Config,
    /// Print version information
    Version,
}

#[derive(Args, Debug, Clone, Default)]
pub struct StartArguments {
    /// Enable stdio transport
    #[arg(long, env = "HABIT_LEDGER_ENABLE_STDIO")]
    pub enable_stdio: Option<bool>,

    /// Enable streamable HTTP transport
    #[arg(long, env = "HABIT_LEDGER_ENABLE_HTTP")]
    pub enable_http: Option<bool>,

    /// HTTP bind address
    #[arg(long, env = "HABIT_LEDGER_HTTP_ADDR")]
    pub http_addr: Option<String>,

    /// Seconds between background history reconciliations
    #[arg(long, env = "HABIT_LEDGER_RECONCILE_SECS")]
    pub reconcile_interval_secs: Option<u64>,
}

impl GlobalArguments {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(path) = &self.data_file {
            settings.data_file = Some(path.clone());
        }
    }
}

impl StartArguments {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(v) = self.enable_stdio {
            settings.enable_stdio = v;
        }
        if let Some(v) = self.enable_http {
            settings.enable_http = v;
        }
        if let Some(addr) = &self.http_addr {
            settings.http_addr = addr.clone();
        }
        if let Some(secs) = self.reconcile_interval_secs {
            settings.reconcile_interval_secs = secs;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_with_target() {
        let cli = Cli::try_parse_from(["habit-ledger", "add", "Read", "--target", "21"]).unwrap();
        match cli.command {
            Command::Add { name, target } => {
                assert_eq!(name, "Read");
                assert_eq!(target, "21");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn start_overrides_settings() {
        let cli = Cli::try_parse_from([
            "habit-ledger",
            "--data-file",
            "/tmp/h.json",
            "start",
            "--enable-http",
            "true",
            "--http-addr",
            "0.0.0.0:9000",
        ])
        .unwrap();
        let mut settings = Settings::default();
        cli.global.apply(&mut settings);
        let Command::Start(args) = cli.command else {
            panic!("expected start");
        };
        args.apply(&mut settings);
        assert!(settings.enable_http);
        assert!(settings.enable_stdio);
        assert_eq!(settings.http_addr, "0.0.0.0:9000");
        assert_eq!(settings.data_file, Some(PathBuf::from("/tmp/h.json")));
    }
}
