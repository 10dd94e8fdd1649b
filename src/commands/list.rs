use crate::config::TreeLockConfig;
use crate::error::Result;
use crate::store::DirectoryLockStore;
use log::debug;
use std::path::Path;

pub struct ListCommand<'a> {
    config: &'a TreeLockConfig,
    root: &'a Path,
}

impl<'a> ListCommand<'a> {
    pub fn new(root: &'a Path, config: &'a TreeLockConfig) -> Result<Self> {
        Ok(Self { config, root })
    }

    pub fn execute(&self) -> Result<()> {
        let store = DirectoryLockStore::new(self.root)
            .with_table_timeout(self.config.locking.table_timeout());
        let records = store.dump_records()?;

        if records.is_empty() {
            println!("No active locks");
            return Ok(());
        }

        println!("Active locks:");
        let stale_minutes = i64::from(self.config.stale_minutes);

        for record in &records {
            let age = record.age();
            debug!("Lock {} created at {}", record.id, record.created_at);

            let pid = record
                .pid
                .map(|pid| format!(", pid: {pid}"))
                .unwrap_or_default();
            let stale = if age.num_minutes() > stale_minutes {
                ", STALE"
            } else {
                ""
            };

            // Display format: "  3  /docs/report (owner: alice, age: 5m)"
            println!(
                "  {}  {} (owner: {}{pid}, age: {}{stale})",
                record.id,
                record.path,
                record.owner,
                format_age(age)
            );
        }

        println!();
        println!(
            "{} active lock(s); stale after {stale_minutes}m",
            records.len()
        );

        Ok(())
    }
}

fn format_age(age: chrono::Duration) -> String {
    let minutes = age.num_minutes();
    let hours = age.num_hours();
    let days = age.num_days();

    if days > 0 {
        format!("{days}d {}h", hours % 24)
    } else if hours > 0 {
        format!("{hours}h {}m", minutes % 60)
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::TreePath;
    use crate::store::LockStore;
    use tempfile::TempDir;

    #[test]
    fn test_list_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let config = TreeLockConfig::default();

        let command = ListCommand::new(temp_dir.path(), &config).unwrap();
        assert!(command.execute().is_ok());
    }

    #[test]
    fn test_list_with_records() {
        let temp_dir = TempDir::new().unwrap();
        let config = TreeLockConfig::default();

        let store = DirectoryLockStore::new(temp_dir.path());
        store
            .try_acquire(&TreePath::parse("/docs").unwrap())
            .unwrap()
            .unwrap();

        let command = ListCommand::new(temp_dir.path(), &config).unwrap();
        assert!(command.execute().is_ok());
    }

    #[test]
    fn test_format_age_units() {
        assert_eq!(format_age(chrono::Duration::minutes(5)), "5m");
        assert_eq!(format_age(chrono::Duration::minutes(125)), "2h 5m");
        assert_eq!(format_age(chrono::Duration::hours(50)), "2d 2h");
    }
}
