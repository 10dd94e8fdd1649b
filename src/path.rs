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

//! Normalized hierarchical paths for the lock manager.
//!
//! A [`TreePath`] addresses a node in the content repository. Ancestry is
//! defined at segment boundaries: `/a/b` is an ancestor of `/a/b/c` but not
//! of `/a/bc`, even though the latter shares a string prefix.

use crate::error::{Result, TreeLockError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A normalized `/`-rooted path into the content hierarchy.
///
/// Stored canonically: leading `/`, no trailing `/` (except the root itself),
/// no empty, `.` or `..` segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreePath(String);

impl TreePath {
    /// Parses and normalizes a raw path string.
    ///
    /// Accepts paths with or without a leading `/` and collapses repeated
    /// separators. Rejects empty input, the bare root `/`, and `.`/`..`
    /// segments (lock targets are always concrete nodes below the root).
    pub fn parse(raw: &str) -> Result<Self> {
        let mut segments = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" => continue,
                "." | ".." => {
                    return Err(TreeLockError::InvalidArgument(format!(
                        "path '{raw}' contains a relative segment"
                    )));
                }
                other => segments.push(other),
            }
        }

        if segments.is_empty() {
            return Err(TreeLockError::InvalidArgument(format!(
                "path '{raw}' does not name a node"
            )));
        }

        Ok(Self(format!("/{}", segments.join("/"))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates the path segments in root-to-leaf order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// True if `self` is a proper ancestor of `other`.
    ///
    /// Comparison is per segment, so a shared string prefix that does not end
    /// at a separator does not count.
    pub fn is_ancestor_of(&self, other: &TreePath) -> bool {
        if self.0.len() >= other.0.len() {
            return false;
        }
        let mut own = self.segments();
        let mut theirs = other.segments();
        loop {
            match (own.next(), theirs.next()) {
                (None, Some(_)) => return true,
                (Some(a), Some(b)) if a == b => continue,
                _ => return false,
            }
        }
    }

    /// True if `self` is a proper descendant of `other`.
    pub fn is_descendant_of(&self, other: &TreePath) -> bool {
        other.is_ancestor_of(self)
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TreePath {
    type Err = TreeLockError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
