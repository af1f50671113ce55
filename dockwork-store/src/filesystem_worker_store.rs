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

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_lock::Mutex;
use async_trait::async_trait;
use dockwork_config::stores::FilesystemSpec;
use dockwork_error::{Error, ResultExt, make_input_err};
use dockwork_util::store_trait::{Page, PageRequest, WorkerStore};
use dockwork_util::worker_messages::Worker;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::memory_worker_store::WorkerTable;

/// Suffix of the file a snapshot is written to before it replaces the
/// previous one.
const TEMP_FILE_SUFFIX: &str = ".tmp";

/// Keeps worker records in memory and mirrors them into a JSON snapshot
/// file after every change.
///
/// Only one process may use a given snapshot file at a time.
#[derive(Debug)]
pub struct FilesystemWorkerStore {
    path: PathBuf,
    temp_path: PathBuf,
    // Held across the snapshot write so snapshots land in save order.
    table: Mutex<WorkerTable>,
}

impl FilesystemWorkerStore {
    pub async fn new(spec: &FilesystemSpec) -> Result<Arc<Self>, Error> {
        if spec.path.is_empty() {
            return Err(make_input_err!(
                "Filesystem worker store requires a non-empty path"
            ));
        }
        let path = PathBuf::from(&spec.path);
        let mut temp_path = path.clone().into_os_string();
        temp_path.push(TEMP_FILE_SUFFIX);

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .err_tip(|| format!("Could not create directory {}", parent.display()))?;
        }

        let table = load_snapshot(&path).await?;
        info!(path = %path.display(), workers = table.len(), "Loaded worker snapshot");
        Ok(Arc::new(Self {
            path,
            temp_path: temp_path.into(),
            table: Mutex::new(table),
        }))
    }

    async fn write_snapshot(&self, table: &WorkerTable) -> Result<(), Error> {
        let contents = serde_json::to_vec_pretty(table)
            .err_tip(|| "Could not serialize worker snapshot")?;
        fs::write(&self.temp_path, contents)
            .await
            .err_tip(|| format!("Could not write {}", self.temp_path.display()))?;
        if let Err(err) = fs::rename(&self.temp_path, &self.path).await {
            warn!(
                from = %self.temp_path.display(),
                to = %self.path.display(),
                ?err,
                "Failed to rename worker snapshot"
            );
            return Err(Error::from(err))
                .err_tip(|| format!("Could not replace {}", self.path.display()));
        }
        Ok(())
    }
}

async fn load_snapshot(path: &Path) -> Result<WorkerTable, Error> {
    match fs::read(path).await {
        Ok(contents) => serde_json::from_slice(&contents)
            .err_tip(|| format!("Could not parse worker snapshot {}", path.display())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(WorkerTable::default()),
        Err(err) => Err(Error::from(err))
            .err_tip(|| format!("Could not read worker snapshot {}", path.display())),
    }
}

#[async_trait]
impl WorkerStore for FilesystemWorkerStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Worker>, Error> {
        Ok(self.table.lock().await.get(name))
    }

    async fn save(&self, worker: Worker) -> Result<Worker, Error> {
        let mut table = self.table.lock().await;
        // Stage the change so a failed write leaves memory and disk in sync.
        let mut staged = table.clone();
        let saved = staged.upsert(worker)?;
        self.write_snapshot(&staged).await?;
        *table = staged;
        debug!(name = %saved.name, id = ?saved.id, status = %saved.status, "Saved worker");
        Ok(saved)
    }

    async fn find_all(&self, request: PageRequest) -> Result<Page<Worker>, Error> {
        Ok(self.table.lock().await.page(&request))
    }
}
