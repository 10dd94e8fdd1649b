// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Durable lock store backed by a directory of JSON record files.
//!
//! One file per active lock (`records/<id>.lock`). The check-and-insert
//! critical section is serialized across processes by an advisory lock on
//! `table.lock`: exclusive for mutations, shared for reads. Record files are
//! written through a staging temp file and persisted into place so a crash
//! never leaves a half-written record.

use crate::conflict::find_conflict;
use crate::error::{Result, TreeLockError};
use crate::path::TreePath;
use crate::store::{LockId, LockStore};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const TABLE_LOCK_FILE: &str = "table.lock";
const RECORDS_DIR: &str = "records";
const RECORD_SUFFIX: &str = ".lock";

/// Durable lock record with operator-facing attribution metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRecord {
    pub id: LockId,
    pub path: TreePath,

    /// Who created the record, for `list` output and stuck-lock triage.
    pub owner: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    pub created_at: DateTime<Utc>,
}

impl LockRecord {
    fn new(id: LockId, path: TreePath) -> Self {
        Self {
            id,
            path,
            owner: current_owner(),
            pid: Some(std::process::id()),
            created_at: Utc::now(),
        }
    }

    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.created_at)
    }
}

fn current_owner() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TableLockKind {
    Shared,
    Exclusive,
}

/// Holds the advisory table lock for the duration of one store operation.
pub(crate) struct TableGuard {
    file: File,
    path: PathBuf,
}

impl Drop for TableGuard {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            warn!(
                "Failed to unlock store table {} during drop: {err}",
                self.path.display()
            );
        }
    }
}

/// File-backed [`LockStore`] rooted at a directory.
pub struct DirectoryLockStore {
    root: PathBuf,
    table_timeout: Duration,
    retry_delay: Duration,
}

impl DirectoryLockStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            table_timeout: Duration::from_secs(5),
            retry_delay: Duration::from_millis(50),
        }
    }

    pub fn with_table_timeout(mut self, timeout: Duration) -> Self {
        self.table_timeout = timeout;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn records_dir(&self) -> PathBuf {
        self.root.join(RECORDS_DIR)
    }

    fn record_path(&self, id: LockId) -> PathBuf {
        self.records_dir().join(format!("{id}{RECORD_SUFFIX}"))
    }

    pub(crate) fn lock_table(&self, kind: TableLockKind) -> Result<TableGuard> {
        let table_path = self.root.join(TABLE_LOCK_FILE);
        fs::create_dir_all(&self.root).map_err(|err| store_err("create store root", &err))?;
        fs::create_dir_all(self.records_dir())
            .map_err(|err| store_err("create records directory", &err))?;

        let file = prepare_table_file(&table_path)
            .map_err(|err| store_err("open store table lock", &err))?;

        let wait_start = Instant::now();
        loop {
            match try_lock_table(&file, kind) {
                Ok(()) => {
                    return Ok(TableGuard {
                        file,
                        path: table_path,
                    });
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    if wait_start.elapsed() >= self.table_timeout {
                        return Err(TreeLockError::StoreUnavailable {
                            details: format!(
                                "timed out after {:.3}s waiting for store table {}",
                                wait_start.elapsed().as_secs_f64(),
                                table_path.display()
                            ),
                        });
                    }
                    thread::sleep(self.retry_delay);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(store_err("lock store table", &err)),
            }
        }
    }

    /// Reads every active record while the table lock is held.
    fn read_records(&self) -> Result<Vec<LockRecord>> {
        let mut records = Vec::new();
        let dir = self.records_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(records),
            Err(err) => return Err(store_err("read records directory", &err)),
        };

        for entry in entries {
            let entry = entry.map_err(|err| store_err("read records directory entry", &err))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("lock") {
                continue;
            }
            match read_record(&path) {
                Ok(record) => records.push(record),
                Err(err) => {
                    // A record we cannot parse cannot be conflict-checked;
                    // surface it loudly instead of silently ignoring a lock.
                    warn!("Skipping unreadable lock record {}: {err}", path.display());
                }
            }
        }
        Ok(records)
    }

    fn write_record(&self, record: &LockRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record)?;
        let staging = tempfile::NamedTempFile::new_in(self.records_dir())
            .map_err(|err| store_err("create staging record", &err))?;
        fs::write(staging.path(), json.as_bytes())
            .map_err(|err| store_err("write staging record", &err))?;
        staging
            .persist(self.record_path(record.id))
            .map_err(|err| store_err("persist lock record", &err.error))?;
        Ok(())
    }
}

impl LockStore for DirectoryLockStore {
    fn try_acquire(&self, path: &TreePath) -> Result<Option<LockId>> {
        let _guard = self.lock_table(TableLockKind::Exclusive)?;
        let records = self.read_records()?;

        let held: Vec<&TreePath> = records.iter().map(|r| &r.path).collect();
        if let Some(conflicting) = find_conflict(path, held.into_iter()) {
            debug!("Rejected lock on {path}: conflicts with held {conflicting}");
            return Ok(None);
        }

        // Ids only need uniqueness among active records; max+1 under the
        // exclusive table lock is race-free and self-healing after crashes.
        let next = records.iter().map(|r| r.id.get()).max().unwrap_or(0) + 1;
        let id = LockId::new(next).ok_or_else(|| TreeLockError::StoreUnavailable {
            details: "lock id allocation wrapped to zero".to_string(),
        })?;

        let record = LockRecord::new(id, path.clone());
        self.write_record(&record)?;
        debug!("Inserted lock record {id} for {path}");
        Ok(Some(id))
    }

    fn release(&self, ids: &[LockId]) -> Result<()> {
        let _guard = self.lock_table(TableLockKind::Exclusive)?;
        // Best effort: a removal failure must not strand the remaining ids,
        // so every id is attempted and the first error reported afterwards.
        let mut first_err = None;
        for id in ids {
            let path = self.record_path(*id);
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed lock record {id}"),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    debug!("Release of lock {id} ignored: record already absent");
                }
                Err(err) => {
                    warn!("Failed to remove lock record {id}: {err}");
                    if first_err.is_none() {
                        first_err = Some(store_err("remove lock record", &err));
                    }
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn is_locked(&self, path: &TreePath) -> Result<bool> {
        let _guard = self.lock_table(TableLockKind::Shared)?;
        let records = self.read_records()?;
        let held: Vec<&TreePath> = records.iter().map(|r| &r.path).collect();
        Ok(find_conflict(path, held.into_iter()).is_some())
    }

    fn dump_all(&self) -> Result<BTreeMap<LockId, TreePath>> {
        let _guard = self.lock_table(TableLockKind::Shared)?;
        let records = self.read_records()?;
        Ok(records.into_iter().map(|r| (r.id, r.path)).collect())
    }
}

impl DirectoryLockStore {
    /// Full records including attribution metadata, for the admin CLI.
    pub fn dump_records(&self) -> Result<Vec<LockRecord>> {
        let _guard = self.lock_table(TableLockKind::Shared)?;
        let mut records = self.read_records()?;
        records.sort_by_key(|r| r.id);
        Ok(records)
    }
}

pub(crate) fn read_record(path: &Path) -> Result<LockRecord> {
    let contents = fs::read_to_string(path).map_err(|err| store_err("read lock record", &err))?;
    Ok(serde_json::from_str(&contents)?)
}

fn prepare_table_file(table_path: &Path) -> io::Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(table_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = fs::Permissions::from_mode(0o600);
        fs::set_permissions(table_path, permissions)?;
    }

    Ok(file)
}

fn try_lock_table(file: &File, kind: TableLockKind) -> io::Result<()> {
    let result = match kind {
        TableLockKind::Shared => file.try_lock_shared(),
        TableLockKind::Exclusive => file.try_lock(),
    };

    match result {
        Ok(()) => Ok(()),
        Err(TryLockError::WouldBlock) => Err(io::Error::new(
            io::ErrorKind::WouldBlock,
            "table lock would block",
        )),
        Err(TryLockError::Error(err)) => Err(err),
    }
}

fn store_err(context: &str, err: &dyn std::fmt::Display) -> TreeLockError {
    TreeLockError::StoreUnavailable {
        details: format!("{context}: {err}"),
    }
}
