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

//! Conflict predicate over the active lock-record set.
//!
//! Two paths conflict when they are equal or one is an ancestor of the other:
//! a lock on `/a` already implies exclusivity over everything under `/a`, so
//! neither `/a` nor `/a/b` may be locked while the other is held. The store
//! evaluates this predicate inside its atomic check-and-insert section; this
//! module only describes it.

use crate::path::TreePath;

/// True if locking both paths at once would violate subtree exclusivity.
pub fn paths_conflict(a: &TreePath, b: &TreePath) -> bool {
    a == b || a.is_ancestor_of(b) || b.is_ancestor_of(a)
}

/// Returns the first existing path that conflicts with `candidate`, if any.
pub fn find_conflict<'a, I>(candidate: &TreePath, existing: I) -> Option<&'a TreePath>
where
    I: IntoIterator<Item = &'a TreePath>,
{
    existing
        .into_iter()
        .find(|held| paths_conflict(candidate, held))
}
