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

use serde::{Deserialize, Serialize};

use crate::serde_utils::convert_string_with_shellexpand;

/// Backend used to persist worker records.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStoreSpec {
    /// Keeps all worker records in memory. Records are lost when the
    /// process exits.
    ///
    /// **Example JSON Config:**
    /// ```json
    /// "memory": {}
    /// ```
    Memory(MemorySpec),

    /// Keeps all worker records in memory and writes a JSON snapshot of
    /// them to `path` after every change. The snapshot is loaded on
    /// startup, so records survive restarts.
    ///
    /// **Example JSON Config:**
    /// ```json
    /// "filesystem": {
    ///   "path": "/var/lib/dockwork/workers.json"
    /// }
    /// ```
    Filesystem(FilesystemSpec),
}

impl Default for WorkerStoreSpec {
    fn default() -> Self {
        Self::Memory(MemorySpec::default())
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MemorySpec {}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FilesystemSpec {
    /// Path of the snapshot file. Parent directories are created when
    /// missing. A temporary file next to it is used for atomic writes.
    #[serde(deserialize_with = "convert_string_with_shellexpand")]
    pub path: String,
}
