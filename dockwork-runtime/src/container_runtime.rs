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

use core::fmt::Debug;

use async_trait::async_trait;
use dockwork_error::Error;

/// A container as returned by a listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: String,
    /// Runtime names of the container, without the leading `/`.
    pub names: Vec<String>,
}

/// A container port bound to a port on the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishedPort {
    /// Port inside the container, e.g. `8080/tcp`.
    pub container_port: String,
    pub host_ip: String,
    pub host_port: String,
}

/// Result of inspecting a single container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerState {
    pub id: String,
    pub name: String,
    pub running: bool,
    /// Ordered by container port number.
    pub published_ports: Vec<PublishedPort>,
}

impl ContainerState {
    /// Host port of the first published port mapping, if any.
    pub fn primary_host_port(&self) -> Option<&str> {
        self.published_ports
            .first()
            .map(|port| port.host_port.as_str())
    }
}

/// Operations the reconciler needs from a container runtime.
///
/// Errors that mean the runtime could not be reached carry
/// `Code::Unavailable` or `Code::DeadlineExceeded`.
#[async_trait]
pub trait ContainerRuntime: Send + Sync + Debug + 'static {
    /// Lists containers, running or stopped, whose name is exactly `name`.
    async fn list_containers(&self, name: &str) -> Result<Vec<ContainerSummary>, Error>;

    async fn inspect_container(&self, container_id: &str) -> Result<ContainerState, Error>;

    async fn start_container(&self, name: &str) -> Result<(), Error>;

    async fn stop_container(&self, name: &str) -> Result<(), Error>;
}
