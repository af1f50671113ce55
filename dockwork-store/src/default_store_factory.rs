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

use dockwork_config::stores::WorkerStoreSpec;
use dockwork_error::{Error, ResultExt};
use dockwork_util::store_trait::WorkerStore;

use crate::filesystem_worker_store::FilesystemWorkerStore;
use crate::memory_worker_store::MemoryWorkerStore;

pub async fn store_factory(spec: &WorkerStoreSpec) -> Result<Arc<dyn WorkerStore>, Error> {
    let store: Arc<dyn WorkerStore> = match spec {
        WorkerStoreSpec::Memory(spec) => MemoryWorkerStore::new(spec),
        WorkerStoreSpec::Filesystem(spec) => FilesystemWorkerStore::new(spec)
            .await
            .err_tip(|| "In store_factory for filesystem worker store")?,
    };
    Ok(store)
}
