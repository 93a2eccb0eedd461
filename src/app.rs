use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::ledger::{Clock, Ledger, SystemClock};
use crate::settings::Settings;
use crate::storage::{JsonFileStore, SnapshotStore, StorageError};

pub type BoxedStore = Box<dyn SnapshotStore + Send>;
pub type BoxedClock = Box<dyn Clock + Send>;

/// The ledger as the binary runs it: store and clock picked at startup.
pub type AppLedger = Ledger<BoxedStore, BoxedClock>;

/// One ledger shared by every MCP session and the reconciliation task.
pub type SharedLedger = Arc<Mutex<AppLedger>>;

/// Open the ledger at the configured data file and run the startup reconciliation.
pub fn open_ledger(settings: &Settings) -> Result<AppLedger, StorageError> {
    let path = settings.resolve_data_file()?;
    info!("using data file {}", path.display());
    Ok(open_with(
        Box::new(JsonFileStore::new(path)),
        Box::new(SystemClock),
    ))
}

pub fn open_with(store: BoxedStore, clock: BoxedClock) -> AppLedger {
    let mut ledger = Ledger::open(store, clock);
    ledger.ensure_history_tracked();
    ledger
}

pub fn share(ledger: AppLedger) -> SharedLedger {
    Arc::new(Mutex::new(ledger))
}
