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
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Output;
use std::sync::Arc;

use async_trait::async_trait;
use dockwork_config::dockwork_server::RuntimeConfig;
use dockwork_error::{Code, Error, ResultExt, make_err};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

use crate::container_runtime::{ContainerRuntime, ContainerState, ContainerSummary, PublishedPort};

/// Stderr fragments the CLI prints when it cannot reach the daemon.
const DAEMON_UNREACHABLE_MARKERS: [&str; 3] = [
    "Cannot connect to the Docker daemon",
    "error during connect",
    "Is the docker daemon running",
];

const NO_SUCH_CONTAINER_MARKER: &str = "No such container";

/// Thin wrapper around the `docker` CLI.
///
/// Cloning is cheap; all clones share one configuration.
#[derive(Clone, Debug)]
pub struct DockerClient {
    inner: Arc<DockerClientInner>,
}

#[derive(Debug)]
struct DockerClientInner {
    binary: PathBuf,
    host: Option<String>,
    response_timeout: Duration,
    stop_timeout_s: Option<u32>,
}

impl DockerClient {
    #[must_use]
    pub fn new(
        binary: impl Into<PathBuf>,
        host: Option<String>,
        response_timeout: Duration,
        stop_timeout_s: Option<u32>,
    ) -> Self {
        Self {
            inner: Arc::new(DockerClientInner {
                binary: binary.into(),
                host,
                response_timeout,
                stop_timeout_s,
            }),
        }
    }

    #[must_use]
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(
            &config.docker_binary,
            config.docker_host.clone(),
            Duration::from_secs(config.response_timeout_s),
            config.stop_timeout_s,
        )
    }

    async fn run_docker(&self, args: Vec<String>) -> Result<String, Error> {
        let output = self.run_docker_raw(args).await?;
        Ok(String::from_utf8(output.stdout)?.trim().to_string())
    }

    async fn run_docker_raw(&self, args: Vec<String>) -> Result<Output, Error> {
        let mut cmd = Command::new(&self.inner.binary);
        if let Some(host) = &self.inner.host {
            cmd.arg("--host").arg(host);
        }
        cmd.args(&args).kill_on_drop(true);

        debug!(binary = %self.inner.binary.display(), ?args, "Running docker");
        let output = tokio::time::timeout(self.inner.response_timeout, cmd.output())
            .await
            .err_tip(|| {
                format!(
                    "docker {args:?} did not finish within {:?}",
                    self.inner.response_timeout
                )
            })?
            .map_err(|err| {
                make_err!(
                    Code::Unavailable,
                    "Could not run {}: {err}",
                    self.inner.binary.display()
                )
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(make_err!(
                classify_failure(&stderr),
                "docker {:?} failed: {}",
                args,
                stderr.trim()
            ));
        }
        Ok(output)
    }
}

fn classify_failure(stderr: &str) -> Code {
    if DAEMON_UNREACHABLE_MARKERS
        .iter()
        .any(|marker| stderr.contains(marker))
    {
        Code::Unavailable
    } else if stderr.contains(NO_SUCH_CONTAINER_MARKER) {
        Code::NotFound
    } else {
        Code::Internal
    }
}

/// One line of `docker ps --format '{{json .}}'`.
#[derive(Deserialize)]
struct PsLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names", default)]
    names: String,
}

type PortMap = BTreeMap<String, Option<Vec<PortBinding>>>;

/// The parts of `docker inspect` output the reconciler needs.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectResponse {
    id: String,
    #[serde(default)]
    name: String,
    state: InspectState,
    #[serde(default)]
    network_settings: Option<NetworkSettings>,
    #[serde(default)]
    host_config: Option<HostConfig>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectState {
    #[serde(default)]
    running: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NetworkSettings {
    #[serde(default)]
    ports: Option<PortMap>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HostConfig {
    #[serde(default)]
    port_bindings: Option<PortMap>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PortBinding {
    #[serde(default)]
    host_ip: String,
    #[serde(default)]
    host_port: String,
}

/// Builds the pattern for `docker ps --filter name=...`, which the daemon
/// treats as a regex against names that carry a leading `/`.
fn name_filter(name: &str) -> String {
    let mut pattern = String::with_capacity(name.len() + 5);
    pattern.push_str("^/?");
    for c in name.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('$');
    pattern
}

fn parse_ps_output(name: &str, stdout: &str) -> Result<Vec<ContainerSummary>, Error> {
    let mut containers = Vec::new();
    for line in stdout.lines().filter(|line| !line.trim().is_empty()) {
        let ps_line: PsLine = serde_json::from_str(line)
            .err_tip(|| format!("Could not parse docker ps line: {line}"))?;
        let names: Vec<String> = ps_line
            .names
            .split(',')
            .map(|n| n.trim().trim_start_matches('/').to_string())
            .filter(|n| !n.is_empty())
            .collect();
        // The daemon's name filter is a regex match; only keep exact names.
        if names.iter().any(|n| n == name) {
            containers.push(ContainerSummary {
                id: ps_line.id,
                names,
            });
        }
    }
    Ok(containers)
}

fn published_ports(ports: Option<PortMap>) -> Vec<PublishedPort> {
    let mut published: Vec<PublishedPort> = ports
        .unwrap_or_default()
        .into_iter()
        .flat_map(|(container_port, bindings)| {
            bindings
                .unwrap_or_default()
                .into_iter()
                .filter(|binding| !binding.host_port.is_empty())
                .map(move |binding| PublishedPort {
                    container_port: container_port.clone(),
                    host_ip: binding.host_ip,
                    host_port: binding.host_port,
                })
        })
        .collect();
    // "8080/tcp" sorts before "9000/tcp" but after "443/tcp".
    published.sort_by_key(|port| {
        let number = port
            .container_port
            .split('/')
            .next()
            .and_then(|n| n.parse::<u32>().ok())
            .unwrap_or(u32::MAX);
        (number, port.container_port.clone())
    });
    published
}

fn parse_inspect_output(stdout: &str) -> Result<ContainerState, Error> {
    let mut responses: Vec<InspectResponse> =
        serde_json::from_str(stdout).err_tip(|| "Could not parse docker inspect output")?;
    let response = responses
        .pop()
        .err_tip_with_code(|_| (Code::NotFound, "docker inspect returned no container"))?;

    // A stopped container reports no live bindings, so fall back to the
    // bindings it was created with.
    let mut ports = published_ports(response.network_settings.and_then(|s| s.ports));
    if ports.is_empty() {
        ports = published_ports(response.host_config.and_then(|c| c.port_bindings));
    }

    Ok(ContainerState {
        id: response.id,
        name: response.name.trim_start_matches('/').to_string(),
        running: response.state.running,
        published_ports: ports,
    })
}

#[async_trait]
impl ContainerRuntime for DockerClient {
    async fn list_containers(&self, name: &str) -> Result<Vec<ContainerSummary>, Error> {
        let stdout = self
            .run_docker(vec![
                "ps".into(),
                "--all".into(),
                "--no-trunc".into(),
                "--filter".into(),
                format!("name={}", name_filter(name)),
                "--format".into(),
                "{{json .}}".into(),
            ])
            .await
            .err_tip(|| format!("while listing containers named {name}"))?;
        parse_ps_output(name, &stdout)
    }

    async fn inspect_container(&self, container_id: &str) -> Result<ContainerState, Error> {
        let stdout = self
            .run_docker(vec![
                "inspect".into(),
                "--type".into(),
                "container".into(),
                container_id.into(),
            ])
            .await
            .err_tip(|| format!("while inspecting container {container_id}"))?;
        parse_inspect_output(&stdout)
    }

    async fn start_container(&self, name: &str) -> Result<(), Error> {
        self.run_docker(vec!["start".into(), name.into()])
            .await
            .err_tip(|| format!("while starting container {name}"))?;
        info!(container = name, "Started container");
        Ok(())
    }

    async fn stop_container(&self, name: &str) -> Result<(), Error> {
        let mut args = vec!["stop".to_string()];
        if let Some(stop_timeout_s) = self.inner.stop_timeout_s {
            args.push("--time".into());
            args.push(stop_timeout_s.to_string());
        }
        args.push(name.into());
        self.run_docker(args)
            .await
            .err_tip(|| format!("while stopping container {name}"))?;
        info!(container = name, "Stopped container");
        Ok(())
    }
}
