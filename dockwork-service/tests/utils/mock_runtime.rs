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

use core::time::Duration;
use std::sync::Arc;

use async_trait::async_trait;
use dockwork_error::{Code, Error, make_err};
use dockwork_runtime::{ContainerRuntime, ContainerState, ContainerSummary, PublishedPort};
use parking_lot::Mutex;

#[derive(Clone, Debug)]
struct MockContainer {
    id: String,
    name: String,
    running: bool,
    host_port: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuntimeCall {
    List(String),
    Inspect(String),
    Start(String),
    Stop(String),
}

#[derive(Debug, Default)]
struct MockState {
    containers: Vec<MockContainer>,
    calls: Vec<RuntimeCall>,
    failure: Option<Error>,
}

/// In-process stand-in for a Docker daemon.
#[derive(Debug, Default)]
pub struct MockContainerRuntime {
    state: Mutex<MockState>,
    transition_delay: Mutex<Option<Duration>>,
}

impl MockContainerRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_container(&self, name: &str, running: bool, host_port: Option<&str>) {
        let mut state = self.state.lock();
        let id = format!("{name}-{}", state.containers.len());
        state.containers.push(MockContainer {
            id,
            name: name.to_string(),
            running,
            host_port: host_port.map(str::to_string),
        });
    }

    /// Every following call fails with `err`.
    pub fn fail_with(&self, err: Error) {
        self.state.lock().failure = Some(err);
    }

    /// Makes start and stop take `delay` before they change anything.
    pub fn set_transition_delay(&self, delay: Duration) {
        *self.transition_delay.lock() = Some(delay);
    }

    pub fn is_running(&self, name: &str) -> Option<bool> {
        self.state
            .lock()
            .containers
            .iter()
            .find(|container| container.name == name)
            .map(|container| container.running)
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.state.lock().calls.clone()
    }

    pub fn start_calls(&self) -> usize {
        self.count_calls(|call| matches!(call, RuntimeCall::Start(_)))
    }

    pub fn stop_calls(&self) -> usize {
        self.count_calls(|call| matches!(call, RuntimeCall::Stop(_)))
    }

    fn count_calls(&self, predicate: impl Fn(&RuntimeCall) -> bool) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| predicate(call))
            .count()
    }

    fn record(&self, call: RuntimeCall) -> Result<(), Error> {
        let mut state = self.state.lock();
        state.calls.push(call);
        state.failure.clone().map_or(Ok(()), Err)
    }

    async fn transition(&self, name: &str, running: bool) -> Result<(), Error> {
        let delay = *self.transition_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock();
        let container = state
            .containers
            .iter_mut()
            .find(|container| container.name == name)
            .ok_or_else(|| make_err!(Code::NotFound, "No such container: {name}"))?;
        container.running = running;
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for MockContainerRuntime {
    async fn list_containers(&self, name: &str) -> Result<Vec<ContainerSummary>, Error> {
        self.record(RuntimeCall::List(name.to_string()))?;
        Ok(self
            .state
            .lock()
            .containers
            .iter()
            .filter(|container| container.name == name)
            .map(|container| ContainerSummary {
                id: container.id.clone(),
                names: vec![container.name.clone()],
            })
            .collect())
    }

    async fn inspect_container(&self, container_id: &str) -> Result<ContainerState, Error> {
        self.record(RuntimeCall::Inspect(container_id.to_string()))?;
        let state = self.state.lock();
        let container = state
            .containers
            .iter()
            .find(|container| container.id == container_id)
            .ok_or_else(|| make_err!(Code::NotFound, "No such container: {container_id}"))?;
        Ok(ContainerState {
            id: container.id.clone(),
            name: container.name.clone(),
            running: container.running,
            published_ports: container
                .host_port
                .iter()
                .map(|host_port| PublishedPort {
                    container_port: "8080/tcp".to_string(),
                    host_ip: "0.0.0.0".to_string(),
                    host_port: host_port.clone(),
                })
                .collect(),
        })
    }

    async fn start_container(&self, name: &str) -> Result<(), Error> {
        self.record(RuntimeCall::Start(name.to_string()))?;
        self.transition(name, true).await
    }

    async fn stop_container(&self, name: &str) -> Result<(), Error> {
        self.record(RuntimeCall::Stop(name.to_string()))?;
        self.transition(name, false).await
    }
}
