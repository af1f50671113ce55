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


use std::sync::Arc;

use async_trait::async_trait;
use dockwork_config::stores::MemorySpec;
use dockwork_error::Error;
use dockwork_store::memory_worker_store::MemoryWorkerStore;
use dockwork_util::store_trait::{Page, PageRequest, WorkerStore};
use dockwork_util::worker_messages::Worker;
use parking_lot::Mutex;

/// Memory-backed store whose writes and listings can be made to fail.
/// Lookups always succeed.
#[derive(Debug)]
pub struct FailingWorkerStore {
    inner: Arc<MemoryWorkerStore>,
    failure: Mutex<Option<Error>>,
}

impl FailingWorkerStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryWorkerStore::new(&MemorySpec::default()),
            failure: Mutex::new(None),
        })
    }

    /// Every following `save` and `find_all` fails with `err`.
    pub fn fail_with(&self, err: Error) {
        *self.failure.lock() = Some(err);
    }

    fn check(&self) -> Result<(), Error> {
        self.failure.lock().clone().map_or(Ok(()), Err)
    }
}

#[async_trait]
impl WorkerStore for FailingWorkerStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Worker>, Error> {
        self.inner.find_by_name(name).await
    }

    async fn save(&self, worker: Worker) -> Result<Worker, Error> {
        self.check()?;
        self.inner.save(worker).await
    }

    async fn find_all(&self, request: PageRequest) -> Result<Page<Worker>, Error> {
        self.check()?;
        self.inner.find_all(request).await
    }
}
