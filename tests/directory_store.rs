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

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use treelock::store::SweepRunner;
use treelock::{DirectoryLockStore, LockStore, TreeLockManager, TreePath};

fn p(raw: &str) -> TreePath {
    TreePath::parse(raw).unwrap()
}

#[test]
fn records_survive_store_instance_recreation() {
    let temp = TempDir::new().unwrap();

    let id = {
        let store = DirectoryLockStore::new(temp.path());
        store.try_acquire(&p("/docs")).unwrap().unwrap()
    };

    // A fresh instance over the same root still sees the record, the way a
    // restarted process would.
    let store = DirectoryLockStore::new(temp.path());
    assert!(store.is_locked(&p("/docs/report")).unwrap());
    let dump = store.dump_all().unwrap();
    assert_eq!(dump.get(&id), Some(&p("/docs")));

    store.release(&[id]).unwrap();
    assert!(!store.is_locked(&p("/docs")).unwrap());
}

#[test]
fn manager_over_directory_store_enforces_hierarchy() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(DirectoryLockStore::new(temp.path()));
    let manager = TreeLockManager::new(store.clone());

    let docs = manager.acquire(&[p("/docs")]).unwrap();
    assert!(manager.acquire(&[p("/docs/report")]).is_err());
    assert!(manager.assert_free(&[p("/docs/report")]).is_err());
    assert!(manager.assert_free(&[p("/notes")]).is_ok());

    docs.release().unwrap();
    let report = manager.acquire(&[p("/docs/report")]).unwrap();
    assert_eq!(report.ids().len(), 1);
}

#[test]
fn sessions_from_different_manager_instances_interoperate() {
    let temp = TempDir::new().unwrap();
    let writer = TreeLockManager::new(Arc::new(DirectoryLockStore::new(temp.path())));
    let reader = TreeLockManager::new(Arc::new(DirectoryLockStore::new(temp.path())));

    let session = writer.acquire(&[p("/a"), p("/b")]).unwrap();
    assert!(reader.assert_free(&[p("/a")]).is_err());
    assert_eq!(reader.list_all().unwrap().len(), 2);

    session.release().unwrap();
    assert!(reader.assert_free(&[p("/a"), p("/b")]).is_ok());
}

#[test]
fn sweep_unblocks_subtree_left_by_stale_record() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(DirectoryLockStore::new(temp.path()));
    let manager = TreeLockManager::new(store.clone());

    // Simulate a crashed holder: record exists, no session to release it.
    let abandoned = manager.acquire(&[p("/docs")]).unwrap();
    std::mem::forget(abandoned);
    assert!(manager.acquire(&[p("/docs/report")]).is_err());

    let runner = SweepRunner::new(&store, Duration::from_secs(0));
    let report = runner.run().unwrap();
    assert_eq!(report.removed, 1);

    let session = manager.acquire(&[p("/docs/report")]).unwrap();
    session.release().unwrap();
}

#[test]
fn sweep_report_is_empty_for_fresh_store() {
    let temp = TempDir::new().unwrap();
    let store = DirectoryLockStore::new(temp.path());
    store.try_acquire(&p("/docs")).unwrap().unwrap();

    let runner = SweepRunner::new(&store, Duration::from_secs(3600));
    let report = runner.run().unwrap();
    assert_eq!(report.removed, 0);
    assert_eq!(report.errors, 0);
    assert_eq!(store.dump_all().unwrap().len(), 1);
}
