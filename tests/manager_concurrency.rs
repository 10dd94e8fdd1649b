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

use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;
use treelock::error::TreeLockError;
use treelock::{DirectoryLockStore, LockStore, MemoryLockStore, TreeLockManager, TreePath};

fn p(raw: &str) -> TreePath {
    TreePath::parse(raw).unwrap()
}

#[test]
fn exactly_one_winner_per_contended_subtree_in_memory() {
    let store = Arc::new(MemoryLockStore::new());
    let manager = Arc::new(TreeLockManager::new(store.clone()));
    let contenders = 8;

    let barrier = Arc::new(Barrier::new(contenders));
    let mut handles = Vec::new();
    for worker in 0..contenders {
        let manager = manager.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            let target = if worker % 2 == 0 {
                p("/shared")
            } else {
                p("/shared/doc")
            };
            barrier.wait();
            // Hold winning sessions until every thread has attempted.
            manager.acquire(std::slice::from_ref(&target)).ok()
        }));
    }

    let sessions: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    let winners = sessions.iter().filter(|s| s.is_some()).count();
    assert_eq!(winners, 1);

    drop(sessions);
    assert!(manager.assert_free(&[p("/shared")]).is_ok());
}

#[test]
fn exactly_one_winner_per_contended_subtree_on_disk() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(DirectoryLockStore::new(temp.path()));
    let manager = Arc::new(TreeLockManager::new(store.clone()));
    let contenders = 4;

    let barrier = Arc::new(Barrier::new(contenders));
    let mut handles = Vec::new();
    for worker in 0..contenders {
        let manager = manager.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            let target = if worker % 2 == 0 {
                p("/shared")
            } else {
                p("/shared/doc")
            };
            barrier.wait();
            manager.acquire(std::slice::from_ref(&target)).ok()
        }));
    }

    let sessions: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    assert_eq!(sessions.iter().filter(|s| s.is_some()).count(), 1);
    assert_eq!(store.dump_all().unwrap().len(), 1);

    drop(sessions);
    assert!(store.dump_all().unwrap().is_empty());
}

#[test]
fn unrelated_subtrees_do_not_contend() {
    let store = Arc::new(MemoryLockStore::new());
    let manager = Arc::new(TreeLockManager::new(store.clone()));
    let workers = 6;

    let barrier = Arc::new(Barrier::new(workers));
    let mut handles = Vec::new();
    for worker in 0..workers {
        let manager = manager.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            let target = p(&format!("/space-{worker}/data"));
            barrier.wait();
            manager.acquire(std::slice::from_ref(&target)).ok()
        }));
    }

    let sessions: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    assert!(sessions.iter().all(|s| s.is_some()));
    assert_eq!(store.dump_all().unwrap().len(), workers);
}

#[test]
fn rollback_of_multi_path_request_is_atomic_under_contention() {
    let store = Arc::new(MemoryLockStore::new());
    let manager = Arc::new(TreeLockManager::new(store.clone()));

    let blocker = manager.acquire(&[p("/b")]).unwrap();

    let err = manager.acquire(&[p("/a"), p("/b"), p("/c")]).unwrap_err();
    match err {
        TreeLockError::LockedTree { path } => assert_eq!(path, "/b"),
        other => panic!("expected LockedTree, got {other:?}"),
    }

    // Nothing from the failed request survived rollback.
    let dump = store.dump_all().unwrap();
    assert_eq!(dump.len(), 1);
    assert_eq!(dump.values().next().unwrap(), &p("/b"));

    blocker.release().unwrap();
    let session = manager.acquire(&[p("/a"), p("/b"), p("/c")]).unwrap();
    assert_eq!(session.ids().len(), 3);
}
