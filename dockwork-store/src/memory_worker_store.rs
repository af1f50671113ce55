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

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dockwork_error::{Error, error_if};
use dockwork_util::store_trait::{Page, PageRequest, WorkerStore};
use dockwork_util::worker_messages::Worker;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Worker records keyed by name, plus the id sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct WorkerTable {
    next_id: u64,
    workers: BTreeMap<String, Worker>,
}

impl Default for WorkerTable {
    fn default() -> Self {
        // Ids start at 1.
        Self {
            next_id: 1,
            workers: BTreeMap::new(),
        }
    }
}

impl WorkerTable {
    pub(crate) fn get(&self, name: &str) -> Option<Worker> {
        self.workers.get(name).cloned()
    }

    pub(crate) fn upsert(&mut self, mut worker: Worker) -> Result<Worker, Error> {
        error_if!(worker.name.is_empty(), "Worker name must not be empty");

        let id = match (self.workers.get(&worker.name), worker.id) {
            (Some(existing), _) => existing.id,
            (None, Some(id)) => Some(id),
            (None, None) => Some(self.next_id),
        };
        if let Some(id) = id {
            self.next_id = self.next_id.max(id.saturating_add(1));
        }
        worker.id = id;
        self.workers.insert(worker.name.clone(), worker.clone());
        Ok(worker)
    }

    pub(crate) fn page(&self, request: &PageRequest) -> Page<Worker> {
        Page::from_unsorted(self.workers.values().cloned().collect(), request)
    }

    pub(crate) fn len(&self) -> usize {
        self.workers.len()
    }
}

/// Keeps worker records in process memory.
#[derive(Debug, Default)]
pub struct MemoryWorkerStore {
    table: Mutex<WorkerTable>,
}

impl MemoryWorkerStore {
    pub fn new(_spec: &dockwork_config::stores::MemorySpec) -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl WorkerStore for MemoryWorkerStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Worker>, Error> {
        Ok(self.table.lock().get(name))
    }

    async fn save(&self, worker: Worker) -> Result<Worker, Error> {
        let saved = self.table.lock().upsert(worker)?;
        debug!(name = %saved.name, id = ?saved.id, status = %saved.status, "Saved worker");
        Ok(saved)
    }

    async fn find_all(&self, request: PageRequest) -> Result<Page<Worker>, Error> {
        Ok(self.table.lock().page(&request))
    }
}
