use crate::config::TreeLockConfig;
use crate::error::Result;
use crate::store::{DirectoryLockStore, SweepRunner};
use std::path::Path;
use std::time::Duration;

pub struct SweepCommand<'a> {
    config: &'a TreeLockConfig,
    root: &'a Path,
}

impl<'a> SweepCommand<'a> {
    pub fn new(root: &'a Path, config: &'a TreeLockConfig) -> Result<Self> {
        Ok(Self { config, root })
    }

    pub fn execute(&self, stale_minutes: Option<u32>) -> Result<()> {
        let threshold = match stale_minutes {
            Some(minutes) => Duration::from_secs(u64::from(minutes) * 60),
            None => self.config.stale_threshold(),
        };

        let store = DirectoryLockStore::new(self.root)
            .with_table_timeout(self.config.locking.table_timeout());
        let runner = SweepRunner::new(&store, threshold);
        let report = runner.run()?;

        println!(
            "Swept {} stale record(s) in {:.3}s",
            report.removed,
            report.duration.as_secs_f64()
        );
        if report.errors > 0 {
            println!("{} record(s) could not be processed", report.errors);
        }
        Ok(())
    }
}
