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

//! Stale-record sweep for the directory store.
//!
//! A process that crashes while holding a session leaves its record files
//! behind, silently blocking the whole subtree. The sweep removes records
//! older than an age threshold so operators can recover without hand-editing
//! the store. The whole pass runs under the store's exclusive table lock:
//! ids are reallocated from `max(existing)+1`, so without the lock a record
//! observed stale could be released and its id handed to a fresh lock before
//! the removal lands, deleting a live record.

use crate::error::Result;
use crate::store::directory::{DirectoryLockStore, TableLockKind, read_record};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

/// Summary of one sweep pass.
#[derive(Debug, Default, Clone)]
pub struct SweepReport {
    pub removed: usize,
    pub errors: usize,
    pub duration: Duration,
}

/// Removes lock records older than a threshold from a directory store.
pub struct SweepRunner<'a> {
    store: &'a DirectoryLockStore,
    age_threshold: chrono::Duration,
}

impl<'a> SweepRunner<'a> {
    pub fn new(store: &'a DirectoryLockStore, age_threshold: Duration) -> Self {
        let age_threshold =
            chrono::Duration::from_std(age_threshold).unwrap_or(chrono::Duration::MAX);
        Self {
            store,
            age_threshold,
        }
    }

    pub fn run(&self) -> Result<SweepReport> {
        self.run_with_now(Utc::now())
    }

    pub(crate) fn run_with_now(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let start = Instant::now();
        let mut report = SweepReport::default();

        // Excludes acquire/release for the whole pass; see module docs.
        let _guard = self.store.lock_table(TableLockKind::Exclusive)?;

        let records_dir = self.store.records_dir();
        let entries = match fs::read_dir(&records_dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    "Failed to read records directory {}: {err}",
                    records_dir.display()
                );
                report.errors += 1;
                report.duration = start.elapsed();
                return Ok(report);
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Failed to read entry in {}: {err}", records_dir.display());
                    report.errors += 1;
                    continue;
                }
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("lock") {
                continue;
            }
            self.process_record(&path, now, &mut report);
        }

        report.duration = start.elapsed();
        debug!(
            "Sweep removed {} stale record(s) in {:.3}s (errors: {})",
            report.removed,
            report.duration.as_secs_f64(),
            report.errors
        );
        Ok(report)
    }

    fn process_record(&self, path: &Path, now: DateTime<Utc>, report: &mut SweepReport) {
        let record = match read_record(path) {
            Ok(record) => record,
            Err(err) => {
                warn!("Cannot age unreadable record {}: {err}", path.display());
                report.errors += 1;
                return;
            }
        };

        let age = now.signed_duration_since(record.created_at);
        if age < self.age_threshold {
            return;
        }

        match fs::remove_file(path) {
            Ok(()) => {
                warn!(
                    "Swept stale lock {} on {} held by {} (age {}m)",
                    record.id,
                    record.path,
                    record.owner,
                    age.num_minutes()
                );
                report.removed += 1;
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!("Failed to remove stale record {}: {err}", path.display());
                report.errors += 1;
            }
        }
    }
}
