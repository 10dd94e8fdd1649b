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

use crate::error::Result;
use crate::path::TreePath;
use crate::store::{LockId, LockStore};
use log::{debug, error};
use std::sync::Arc;
use std::time::Instant;

/// Unit-of-work handle over the lock records one acquire call created.
///
/// Holds either all requested ids or none; the manager never hands out a
/// partial session. Records are released exactly once, through an explicit
/// [`release`](Self::release) or on drop, whichever comes first.
pub struct LockSession {
    store: Arc<dyn LockStore>,
    ids: Vec<LockId>,
    paths: Vec<TreePath>,
    acquired_at: Instant,
    released: bool,
}

impl std::fmt::Debug for LockSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockSession")
            .field("ids", &self.ids)
            .field("paths", &self.paths)
            .field("released", &self.released)
            .finish()
    }
}

impl LockSession {
    pub(crate) fn new(store: Arc<dyn LockStore>, ids: Vec<LockId>, paths: Vec<TreePath>) -> Self {
        Self {
            store,
            ids,
            paths,
            acquired_at: Instant::now(),
            released: false,
        }
    }

    /// Ids in acquisition order.
    pub fn ids(&self) -> &[LockId] {
        &self.ids
    }

    pub fn paths(&self) -> &[TreePath] {
        &self.paths
    }

    /// Releases every record this session owns.
    ///
    /// Prefer this over relying on drop when the caller wants to observe a
    /// release failure instead of having it logged.
    pub fn release(mut self) -> Result<()> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        self.store.release(&self.ids)?;
        debug!(
            "Released session over {} path(s) after {:.3}s",
            self.ids.len(),
            self.acquired_at.elapsed().as_secs_f64()
        );
        Ok(())
    }
}

impl Drop for LockSession {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        if let Err(err) = self.release_inner() {
            // A record left behind blocks its whole subtree until an
            // operator clears it; this must not pass quietly.
            error!(
                "Failed to release lock session over {:?} during drop: {err}",
                self.paths.iter().map(|p| p.as_str()).collect::<Vec<_>>()
            );
        }
    }
}
