use crate::config::TreeLockConfig;
use crate::error::{Result, TreeLockError};
use crate::store::{DirectoryLockStore, LockId, LockStore};
use log::info;
use std::path::Path;

pub struct ClearCommand<'a> {
    config: &'a TreeLockConfig,
    root: &'a Path,
}

impl<'a> ClearCommand<'a> {
    pub fn new(root: &'a Path, config: &'a TreeLockConfig) -> Result<Self> {
        Ok(Self { config, root })
    }

    /// Releases lock records by id. The caller is responsible for verifying
    /// that the owning process is really gone; release itself is idempotent.
    pub fn execute(&self, raw_ids: &[u64]) -> Result<()> {
        let ids = raw_ids
            .iter()
            .map(|raw| {
                LockId::new(*raw).ok_or_else(|| {
                    TreeLockError::InvalidArgument("lock id must be non-zero".to_string())
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let store = DirectoryLockStore::new(self.root)
            .with_table_timeout(self.config.locking.table_timeout());
        let active = store.dump_all()?;

        for id in &ids {
            match active.get(id) {
                Some(path) => info!("Clearing lock {id} on {path}"),
                None => println!("Lock {id} not found (already released?)"),
            }
        }

        store.release(&ids)?;

        let cleared = ids.iter().filter(|id| active.contains_key(id)).count();
        println!("Cleared {cleared} lock record(s)");
        Ok(())
    }
}
