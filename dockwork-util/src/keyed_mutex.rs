// Copyright 2024 The NativeLink Authors. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use core::borrow::Borrow;
use core::fmt;
use core::hash::Hash;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

struct LockEntry {
    mutex: Arc<AsyncMutex<()>>,
    // Holders plus waiters.
    users: usize,
}

/// A set of async mutexes addressed by key.
///
/// Holders of different keys never wait on each other. An entry lives only
/// as long as someone holds or waits for its lock, including waiters that
/// are cancelled before they get it.
pub struct KeyedMutex<K> {
    locks: Mutex<HashMap<K, LockEntry>>,
}

impl<K> Default for KeyedMutex<K> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> fmt::Debug for KeyedMutex<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedMutex")
            .field("len", &self.locks.lock().len())
            .finish()
    }
}

impl<K: Hash + Eq + Clone> KeyedMutex<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no one else holds `key` and returns a guard for it.
    pub async fn lock<Q>(&self, key: &Q) -> KeyedMutexGuard<'_, K>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        let key = key.to_owned();
        let mutex = {
            let mut locks = self.locks.lock();
            let entry = locks.entry(key.clone()).or_insert_with(|| LockEntry {
                mutex: Arc::new(AsyncMutex::new(())),
                users: 0,
            });
            entry.users = entry.users.saturating_add(1);
            Arc::clone(&entry.mutex)
        };
        // Registered before waiting so a dropped future still releases its
        // claim on the entry.
        let user = KeyUser { parent: self, key };
        let guard = mutex.lock_owned().await;
        KeyedMutexGuard {
            _guard: guard,
            _user: user,
        }
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, key: &K) {
        let mut locks = self.locks.lock();
        let unused = locks.get_mut(key).is_some_and(|entry| {
            entry.users = entry.users.saturating_sub(1);
            entry.users == 0
        });
        if unused {
            locks.remove(key);
        }
    }
}

struct KeyUser<'a, K: Hash + Eq + Clone> {
    parent: &'a KeyedMutex<K>,
    key: K,
}

impl<K: Hash + Eq + Clone> Drop for KeyUser<'_, K> {
    fn drop(&mut self) {
        self.parent.release(&self.key);
    }
}

/// Holds the lock for one key until dropped.
pub struct KeyedMutexGuard<'a, K: Hash + Eq + Clone> {
    // Unlocks before the entry is released.
    _guard: OwnedMutexGuard<()>,
    _user: KeyUser<'a, K>,
}

impl<K: Hash + Eq + Clone> fmt::Debug for KeyedMutexGuard<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedMutexGuard").finish_non_exhaustive()
    }
}
