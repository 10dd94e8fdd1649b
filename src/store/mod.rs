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

//! Lock store abstraction and backends.
//!
//! The store is the single source of truth for "is path X locked" and the
//! only place mutual exclusion is enforced: `try_acquire` must be an atomic
//! check-and-insert so two concurrent callers cannot both win a contested
//! path. The manager injects a store rather than owning a global table so
//! tests can substitute controllable fakes.

pub mod directory;
pub mod memory;
pub mod sweep;

pub use directory::{DirectoryLockStore, LockRecord};
pub use memory::MemoryLockStore;
pub use sweep::{SweepReport, SweepRunner};

use crate::error::Result;
use crate::path::TreePath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU64;

/// Identifier of one active lock record. Non-zero by construction; the
/// "acquisition failed" sentinel is `Option::None`, never a stored zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockId(NonZeroU64);

impl LockId {
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Durable keyed record set of `LockId -> TreePath`.
///
/// Errors mean the store itself failed and are never conflated with a
/// conflict: a conflict is `Ok(None)` from `try_acquire`, a store failure is
/// `Err(StoreUnavailable)`.
pub trait LockStore: Send + Sync {
    /// Atomically inserts a record for `path` unless it conflicts with an
    /// existing record (equal, ancestor, or descendant). Returns the new id,
    /// or `None` when a conflict rejected the insert.
    fn try_acquire(&self, path: &TreePath) -> Result<Option<LockId>>;

    /// Deletes the given records. Ids already absent are ignored.
    fn release(&self, ids: &[LockId]) -> Result<()>;

    /// True if `path` itself, an ancestor, or a descendant of it holds an
    /// active record.
    fn is_locked(&self, path: &TreePath) -> Result<bool>;

    /// One consistent read of every active record.
    fn dump_all(&self) -> Result<BTreeMap<LockId, TreePath>>;
}
