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

use core::fmt;
use core::str::FromStr;

use dockwork_error::{Error, make_input_err};
use serde::{Deserialize, Serialize};

/// Last observed or last requested run-state of a worker container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Active,
    Inactive,
}

impl WorkerStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    /// Whether a container in this state is expected to be running.
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkerStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(make_input_err!("'{s}' is not a worker status")),
        }
    }
}

/// Persisted record of a worker container.
///
/// `status` is only authoritative right after a reconciliation; the
/// container can change state behind the record's back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    /// Surrogate key assigned by the store on first save.
    pub id: Option<u64>,
    /// Container name, unique across workers.
    pub name: String,
    /// Host port of the container's primary published port.
    pub port: String,
    pub status: WorkerStatus,
}

impl Worker {
    /// A record that has not been saved yet.
    pub fn new(name: impl Into<String>, port: impl Into<String>, status: WorkerStatus) -> Self {
        Self {
            id: None,
            name: name.into(),
            port: port.into(),
            status,
        }
    }
}
