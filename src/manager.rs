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

//! Acquisition, guard checks and enumeration over an injected lock store.

use crate::error::{Result, TreeLockError};
use crate::path::TreePath;
use crate::session::LockSession;
use crate::store::{LockId, LockStore};
use log::{debug, error};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Coordinates tree-lock acquisition against a pluggable [`LockStore`].
///
/// The manager holds no lock state of its own; all mutual exclusion lives in
/// the store's atomic check-and-insert. Paths within one acquire call are
/// attempted in input order and are not de-duplicated or sorted, so a call
/// whose own paths conflict with each other (`/x` then `/x/y`) fails and
/// rolls back like any other conflict. Callers submit mutually unrelated
/// paths per call.
pub struct TreeLockManager {
    store: Arc<dyn LockStore>,
}

impl TreeLockManager {
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self { store }
    }

    /// Acquires every path in `paths`, all-or-nothing.
    ///
    /// On the first conflict or store failure, everything acquired so far in
    /// this call is rolled back before the error surfaces, so the store never
    /// keeps orphaned records from a failed multi-path request. An empty
    /// `paths` is a caller error, not an empty success.
    pub fn acquire(&self, paths: &[TreePath]) -> Result<LockSession> {
        if paths.is_empty() {
            return Err(TreeLockError::InvalidArgument(
                "acquire requires at least one path".to_string(),
            ));
        }

        let start = Instant::now();
        let mut acquired: Vec<LockId> = Vec::with_capacity(paths.len());

        for path in paths {
            match self.store.try_acquire(path) {
                Ok(Some(id)) => acquired.push(id),
                Ok(None) => {
                    self.rollback(&acquired);
                    return Err(TreeLockError::LockedTree {
                        path: path.as_str().to_string(),
                    });
                }
                Err(err) => {
                    self.rollback(&acquired);
                    return Err(err);
                }
            }
        }

        debug!(
            "Acquired {} tree lock(s) in {:.3}s",
            acquired.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(LockSession::new(
            self.store.clone(),
            acquired,
            paths.to_vec(),
        ))
    }

    /// Guard check: verifies no path is itself locked or covered by a locked
    /// ancestor/descendant, without acquiring anything.
    ///
    /// Fails fast with the first offending path. The check is advisory: a
    /// conflicting lock may appear between this call and a later mutation
    /// unless the mutation path holds a session of its own.
    pub fn assert_free(&self, paths: &[TreePath]) -> Result<()> {
        for path in paths {
            if self.store.is_locked(path)? {
                return Err(TreeLockError::LockedTree {
                    path: path.as_str().to_string(),
                });
            }
        }
        Ok(())
    }

    /// One consistent dump of every active record, for diagnostics and
    /// stuck-lock cleanup.
    pub fn list_all(&self) -> Result<BTreeMap<LockId, TreePath>> {
        self.store.dump_all()
    }

    /// Runs `f` while holding a session over `paths`, releasing on every
    /// exit path including an error from `f`.
    ///
    /// A release failure after a successful body surfaces as the call's
    /// error; after a failed body it is logged and the body's error wins.
    pub fn with_locked<R, F>(&self, paths: &[TreePath], f: F) -> Result<R>
    where
        F: FnOnce() -> Result<R>,
    {
        let session = self.acquire(paths)?;
        let result = f();
        match session.release() {
            Ok(()) => result,
            Err(release_err) => match result {
                Ok(_) => Err(release_err),
                Err(err) => {
                    error!("Release failed after protected operation error: {release_err}");
                    Err(err)
                }
            },
        }
    }

    fn rollback(&self, acquired: &[LockId]) {
        if acquired.is_empty() {
            return;
        }
        if let Err(err) = self.store.release(acquired) {
            // The conflict is still the caller-visible signal; the leaked
            // records need operator cleanup via `list`/`clear`.
            error!(
                "Rollback of {} partially acquired lock(s) failed: {err}",
                acquired.len()
            );
        }
    }
}
