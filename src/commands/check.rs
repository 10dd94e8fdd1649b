use crate::config::TreeLockConfig;
use crate::error::Result;
use crate::manager::TreeLockManager;
use crate::path::TreePath;
use crate::store::DirectoryLockStore;
use std::path::Path;
use std::sync::Arc;

pub struct CheckCommand<'a> {
    config: &'a TreeLockConfig,
    root: &'a Path,
}

impl<'a> CheckCommand<'a> {
    pub fn new(root: &'a Path, config: &'a TreeLockConfig) -> Result<Self> {
        Ok(Self { config, root })
    }

    /// Guard check over the given paths; fails with the first conflicting
    /// path and a locked-tree exit code.
    pub fn execute(&self, raw_paths: &[String]) -> Result<()> {
        let paths = raw_paths
            .iter()
            .map(|raw| TreePath::parse(raw))
            .collect::<Result<Vec<_>>>()?;

        let store = Arc::new(
            DirectoryLockStore::new(self.root)
                .with_table_timeout(self.config.locking.table_timeout()),
        );
        let manager = TreeLockManager::new(store);
        manager.assert_free(&paths)?;

        println!("{} path(s) free of conflicting locks", paths.len());
        Ok(())
    }
}
