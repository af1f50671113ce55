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
use std::sync::Arc;

use dockwork_config::dockwork_server::ListingConfig;
use dockwork_error::{Code, Error, make_input_err};
use dockwork_runtime::{ContainerRuntime, ContainerSummary};
use dockwork_util::keyed_mutex::KeyedMutex;
use dockwork_util::store_trait::{Page, PageRequest, Sort, WorkerStore};
use dockwork_util::worker_messages::{Worker, WorkerStatus};
use tracing::{error, info, warn};

/// Why a reconciliation or listing did not complete.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Container name must not be empty")]
    InvalidName,

    #[error("No container named {name} exists")]
    NotFound { name: String },

    #[error("{count} containers are named {name}")]
    AmbiguousMatch { name: String, count: usize },

    #[error("Container {name} publishes no port, cannot register it")]
    PortUnavailable { name: String },

    #[error("Container runtime is unavailable: {}", .0.message_string())]
    RuntimeUnavailable(Error),

    #[error("Container runtime failed: {}", .0.message_string())]
    Runtime(Error),

    #[error("Worker store failed: {}", .0.message_string())]
    StoreFailure(Error),

    #[error("Invalid listing request: {}", .0.message_string())]
    InvalidRequest(Error),
}

impl ReconcileError {
    fn from_runtime(name: &str, err: Error) -> Self {
        if err.is_unavailable() {
            Self::RuntimeUnavailable(err)
        } else if err.code == Code::NotFound {
            // The container went away between listing and acting on it.
            Self::NotFound {
                name: name.to_string(),
            }
        } else {
            Self::Runtime(err)
        }
    }
}

/// Result of a successful reconciliation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub name: String,
    pub status: WorkerStatus,
    /// The container was already in the requested state, so the runtime was
    /// not asked to change it.
    pub already_in_desired_state: bool,
}

impl ReconcileOutcome {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let already = if self.already_in_desired_state {
            "already "
        } else {
            ""
        };
        write!(f, "{} container is {already}{}...", self.name, self.status)
    }
}

/// Drives worker containers towards a requested run-state and keeps the
/// worker records in step with what was observed.
#[derive(Debug)]
pub struct WorkerReconciler {
    runtime: Arc<dyn ContainerRuntime>,
    store: Arc<dyn WorkerStore>,
    // One reconciliation per container name at a time.
    locks: KeyedMutex<String>,
    max_page_size: usize,
}

impl WorkerReconciler {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        store: Arc<dyn WorkerStore>,
        listing: &ListingConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            runtime,
            store,
            locks: KeyedMutex::new(),
            max_page_size: listing.max_page_size,
        })
    }

    pub async fn start_worker(&self, name: &str) -> Result<ReconcileOutcome, ReconcileError> {
        self.set_desired_state(name, WorkerStatus::Active).await
    }

    pub async fn stop_worker(&self, name: &str) -> Result<ReconcileOutcome, ReconcileError> {
        self.set_desired_state(name, WorkerStatus::Inactive).await
    }

    /// Brings the container called `name` into `desired` and records the
    /// result.
    ///
    /// The runtime is asked to start or stop the container only when its
    /// observed state differs from `desired`. The record is saved either
    /// way. Calls for the same name are serialized.
    pub async fn set_desired_state(
        &self,
        name: &str,
        desired: WorkerStatus,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        if name.is_empty() {
            return Err(ReconcileError::InvalidName);
        }
        let _guard = self.locks.lock(name).await;
        let result = self.reconcile(name, desired).await;
        match &result {
            Ok(outcome) => info!(
                worker = name,
                %desired,
                already_in_desired_state = outcome.already_in_desired_state,
                "Reconciled worker"
            ),
            Err(
                err @ (ReconcileError::RuntimeUnavailable(_)
                | ReconcileError::Runtime(_)
                | ReconcileError::StoreFailure(_)),
            ) => error!(worker = name, %desired, %err, "Failed to reconcile worker"),
            Err(err) => warn!(worker = name, %desired, %err, "Rejected worker reconciliation"),
        }
        result
    }

    async fn reconcile(
        &self,
        name: &str,
        desired: WorkerStatus,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let containers = self
            .runtime
            .list_containers(name)
            .await
            .map_err(|err| ReconcileError::from_runtime(name, err))?;
        let container = single_container(name, &containers)?;

        let state = self
            .runtime
            .inspect_container(&container.id)
            .await
            .map_err(|err| ReconcileError::from_runtime(name, err))?;
        let already_in_desired_state = state.running == desired.is_running();

        let existing = self
            .store
            .find_by_name(name)
            .await
            .map_err(ReconcileError::StoreFailure)?;
        let record = if let Some(mut worker) = existing {
            worker.status = desired;
            worker
        } else {
            let port = state
                .primary_host_port()
                .ok_or_else(|| ReconcileError::PortUnavailable {
                    name: name.to_string(),
                })?;
            Worker::new(name, port, desired)
        };

        if !already_in_desired_state {
            let transition = match desired {
                WorkerStatus::Active => self.runtime.start_container(name).await,
                WorkerStatus::Inactive => self.runtime.stop_container(name).await,
            };
            transition.map_err(|err| ReconcileError::from_runtime(name, err))?;
        }

        let saved = self
            .store
            .save(record)
            .await
            .map_err(ReconcileError::StoreFailure)?;
        Ok(ReconcileOutcome {
            name: saved.name,
            status: saved.status,
            already_in_desired_state,
        })
    }

    /// Returns one page of worker records.
    pub async fn list_workers(
        &self,
        page: usize,
        size: usize,
        sort: Sort,
    ) -> Result<Page<Worker>, ReconcileError> {
        if size > self.max_page_size {
            return Err(ReconcileError::InvalidRequest(make_input_err!(
                "Page size {size} exceeds the maximum of {}",
                self.max_page_size
            )));
        }
        let request =
            PageRequest::try_new(page, size, sort).map_err(ReconcileError::InvalidRequest)?;
        self.store
            .find_all(request)
            .await
            .map_err(ReconcileError::StoreFailure)
    }
}

fn single_container<'a>(
    name: &str,
    containers: &'a [ContainerSummary],
) -> Result<&'a ContainerSummary, ReconcileError> {
    match containers {
        [] => Err(ReconcileError::NotFound {
            name: name.to_string(),
        }),
        [container] => Ok(container),
        _ => Err(ReconcileError::AmbiguousMatch {
            name: name.to_string(),
            count: containers.len(),
        }),
    }
}
