pub mod app;
pub mod cli;
pub mod error;
pub mod export;
pub mod ledger;
pub mod logging;
pub mod metadata;
pub mod render;
pub mod server;
pub mod settings;
pub mod storage;
pub mod tools;
pub mod validation;

pub use ledger::{Badge, Clock, Habit, HabitId, Ledger, LedgerSnapshot, SystemClock};
pub use storage::{JsonFileStore, MemoryStore, SnapshotStore};
