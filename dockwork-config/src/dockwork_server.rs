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

use crate::serde_utils::{
    convert_numeric_with_shellexpand, convert_optional_numeric_with_shellexpand,
    convert_optional_string_with_shellexpand, convert_string_with_shellexpand,
};
use crate::stores::WorkerStoreSpec;

/// Note: If this changes make sure you update the documentation of
/// `RuntimeConfig::docker_binary`.
pub const DEFAULT_DOCKER_BINARY: &str = "docker";

/// Note: If this changes make sure you update the documentation of
/// `RuntimeConfig::response_timeout_s`.
pub const DEFAULT_RESPONSE_TIMEOUT_S: u64 = 45;

/// Note: If this changes make sure you update the documentation of
/// `ListingConfig::max_page_size`.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 2000;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to listen on. Example: `127.0.0.1:8080` or `0.0.0.0:8080`
    /// to listen on all IPs.
    #[serde(deserialize_with = "convert_string_with_shellexpand")]
    pub socket_address: String,

    /// Prefix for every worker endpoint. If `base_path` is "/api/v1" the
    /// listing is served at `/api/v1/worker/listWorkers`.
    ///
    /// Default: "" (endpoints are served at the root)
    #[serde(default, deserialize_with = "convert_string_with_shellexpand")]
    pub base_path: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Docker CLI used to talk to the daemon.
    ///
    /// Default: "docker"
    #[serde(
        default = "default_docker_binary",
        deserialize_with = "convert_string_with_shellexpand"
    )]
    pub docker_binary: String,

    /// Daemon socket to connect to, passed as `--host`. When unset the CLI
    /// falls back to `DOCKER_HOST` and its own defaults.
    ///
    /// Default: None
    #[serde(default, deserialize_with = "convert_optional_string_with_shellexpand")]
    pub docker_host: Option<String>,

    /// Upper bound for a single call against the daemon, in seconds.
    ///
    /// Default: 45
    #[serde(
        default = "default_response_timeout_s",
        deserialize_with = "convert_numeric_with_shellexpand"
    )]
    pub response_timeout_s: u64,

    /// Seconds the daemon waits for a container to exit on stop before
    /// killing it. When unset the daemon default applies.
    ///
    /// Default: None
    #[serde(default, deserialize_with = "convert_optional_numeric_with_shellexpand")]
    pub stop_timeout_s: Option<u32>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            docker_binary: default_docker_binary(),
            docker_host: None,
            response_timeout_s: DEFAULT_RESPONSE_TIMEOUT_S,
            stop_timeout_s: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ListingConfig {
    /// Largest page size accepted by `listWorkers`.
    ///
    /// Default: 2000
    #[serde(
        default = "default_max_page_size",
        deserialize_with = "convert_numeric_with_shellexpand"
    )]
    pub max_page_size: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DockworkConfig {
    /// HTTP listener serving the worker endpoints.
    pub server: ServerConfig,

    /// How to reach the container runtime.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Where worker records are persisted.
    ///
    /// Default: memory
    #[serde(default)]
    pub store: WorkerStoreSpec,

    /// Limits applied to `listWorkers`.
    #[serde(default)]
    pub listing: ListingConfig,
}

fn default_docker_binary() -> String {
    DEFAULT_DOCKER_BINARY.to_string()
}

const fn default_response_timeout_s() -> u64 {
    DEFAULT_RESPONSE_TIMEOUT_S
}

const fn default_max_page_size() -> usize {
    DEFAULT_MAX_PAGE_SIZE
}
