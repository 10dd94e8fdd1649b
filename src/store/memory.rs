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

use crate::conflict::find_conflict;
use crate::error::{Result, TreeLockError};
use crate::path::TreePath;
use crate::store::{LockId, LockStore};
use log::debug;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

struct TableState {
    next_id: u64,
    records: BTreeMap<LockId, TreePath>,
}

/// In-process lock store backed by a mutex-guarded table.
///
/// One coarse critical section covers the conflict check and the insert,
/// which is all the atomicity `try_acquire` needs. Contention is expected to
/// be low: tree locks are rare, coarse operations.
pub struct MemoryLockStore {
    state: Mutex<TableState>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TableState {
                next_id: 1,
                records: BTreeMap::new(),
            }),
        }
    }

    fn table(&self) -> Result<MutexGuard<'_, TableState>> {
        self.state
            .lock()
            .map_err(|_| TreeLockError::StoreUnavailable {
                details: "lock table mutex poisoned".to_string(),
            })
    }
}

impl Default for MemoryLockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LockStore for MemoryLockStore {
    fn try_acquire(&self, path: &TreePath) -> Result<Option<LockId>> {
        let mut table = self.table()?;

        if let Some(held) = find_conflict(path, table.records.values()) {
            debug!("Rejected lock on {path}: conflicts with held {held}");
            return Ok(None);
        }

        let id = LockId::new(table.next_id).ok_or_else(|| TreeLockError::StoreUnavailable {
            details: "lock id counter wrapped to zero".to_string(),
        })?;
        table.next_id += 1;
        table.records.insert(id, path.clone());
        debug!("Inserted lock record {id} for {path}");
        Ok(Some(id))
    }

    fn release(&self, ids: &[LockId]) -> Result<()> {
        let mut table = self.table()?;
        for id in ids {
            if table.records.remove(id).is_none() {
                debug!("Release of lock {id} ignored: record already absent");
            }
        }
        Ok(())
    }

    fn is_locked(&self, path: &TreePath) -> Result<bool> {
        let table = self.table()?;
        Ok(find_conflict(path, table.records.values()).is_some())
    }

    fn dump_all(&self) -> Result<BTreeMap<LockId, TreePath>> {
        let table = self.table()?;
        Ok(table.records.clone())
    }
}
