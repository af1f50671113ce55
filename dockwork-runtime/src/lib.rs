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

//! Access to the container runtime that hosts worker containers.
//!
//! [`ContainerRuntime`] is the seam the reconciler talks to.
//! [`DockerClient`] implements it on top of the `docker` CLI: each call runs
//! one CLI subprocess, parses its JSON output and is bounded by a response
//! timeout.

mod container_runtime;
mod docker_client;

pub use container_runtime::{ContainerRuntime, ContainerState, ContainerSummary, PublishedPort};
pub use docker_client::DockerClient;
