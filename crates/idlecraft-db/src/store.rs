//! Database store wrapper.

use crate::error::{Error, Result};
use crate::ledger::LedgerTx;
use crate::models::*;
use native_db::*;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

// Static models for the database
static MODELS: LazyLock<Models> = LazyLock::new(|| {
    let mut models = Models::new();
    models.define::<StoredItem>().unwrap();
    models.define::<StoredTool>().unwrap();
    models.define::<StoredGeneratable>().unwrap();
    models.define::<StoredCraftingRecipe>().unwrap();
    models.define::<StoredToolRecipe>().unwrap();
    models.define::<StoredCategoryLevel>().unwrap();
    models.define::<StoredUser>().unwrap();
    models.define::<StoredUserItem>().unwrap();
    models.define::<StoredUserTool>().unwrap();
    models.define::<StoredCategoryXp>().unwrap();
    models.define::<StoredSequence>().unwrap();
    models.define::<StoredListing>().unwrap();
    models.define::<StoredMarketRecord>().unwrap();
    models
});

/// Durable ledger store.
///
/// Each [`idlecraft_core::LedgerStore::transact`] call is one native_db
/// read-write transaction. Write transactions are exclusive, so a sweep
/// and a player action never interleave.
pub struct Store {
    pub(crate) db: Database<'static>,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Builder::new()
            .create(&MODELS, path)
            .map_err(|e| Error::Database(e.to_string()))?;
        debug!(path = %path.display(), "database opened");
        Ok(Self { db })
    }

    /// Create an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let db = Builder::new()
            .create_in_memory(&MODELS)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(Self { db })
    }
}

impl idlecraft_core::LedgerStore for Store {
    fn transact<T, F>(&self, f: F) -> idlecraft_core::Result<T>
    where
        F: FnOnce(&mut dyn idlecraft_core::Ledger) -> idlecraft_core::Result<T>,
    {
        let rw = self.db.rw_transaction().map_err(Error::from)?;
        let mut tx = LedgerTx { rw };
        // dropping the transaction without commit aborts it
        let out = f(&mut tx)?;
        tx.rw.commit().map_err(Error::from)?;
        Ok(out)
    }
}
