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

use core::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use dockwork_config::dockwork_server::DockworkConfig;
use dockwork_error::{Error, ResultExt, make_input_err};
use dockwork_runtime::DockerClient;
use dockwork_service::reconciler::WorkerReconciler;
use dockwork_service::worker_api_server::WorkerApiServer;
use dockwork_store::default_store_factory::store_factory;
use dockwork_util::init_tracing;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
#[cfg(target_family = "unix")]
use tokio::signal::unix::{SignalKind, signal};
use tracing::{Instrument, error, error_span, info, trace_span, warn};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Starts and stops Docker worker containers on request and keeps a record
/// of every worker it has seen.
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Args {
    /// Config file to use.
    #[clap(value_parser)]
    config_file: String,
}

async fn inner_main(cfg: DockworkConfig) -> Result<(), Error> {
    let store = store_factory(&cfg.store)
        .await
        .err_tip(|| "Failed to create worker store")?;
    let runtime = Arc::new(DockerClient::from_config(&cfg.runtime));
    let reconciler = WorkerReconciler::new(runtime, store, &cfg.listing);
    let svc = WorkerApiServer::new(reconciler, &cfg.server).into_router();

    let socket_addr = cfg
        .server
        .socket_address
        .parse::<SocketAddr>()
        .map_err(|e| {
            make_input_err!("Invalid address '{}' - {e:?}", cfg.server.socket_address)
        })?;
    let tcp_listener = TcpListener::bind(&socket_addr)
        .await
        .err_tip(|| format!("Could not listen on {socket_addr}"))?;
    let http = auto::Builder::new(TokioExecutor::new());

    warn!("Ready, listening on {socket_addr}");
    loop {
        let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                error!(?err, "Failed to accept tcp connection");
                continue;
            }
        };
        info!(?remote_addr, ?socket_addr, "Client connected");

        let (http, svc) = (http.clone(), svc.clone());
        tokio::spawn(
            async move {
                if let Err(err) = http
                    .serve_connection(TokioIo::new(tcp_stream), TowerToHyperService::new(svc))
                    .await
                {
                    error!(?err, "Failed running service");
                }
                info!(?remote_addr, "Client disconnected");
            }
            .instrument(error_span!("http_connection", ?remote_addr)),
        );
    }
}

fn get_config() -> Result<DockworkConfig, Error> {
    let args = Args::parse();
    let json_contents = String::from_utf8(
        std::fs::read(&args.config_file)
            .err_tip(|| format!("Could not open config file {}", args.config_file))?,
    )
    .err_tip(|| format!("Config file {} is not UTF-8", args.config_file))?;
    serde_json5::from_str(&json_contents)
        .err_tip(|| format!("Could not parse config file {}", args.config_file))
}

fn main() -> Result<(), Box<dyn core::error::Error>> {
    init_tracing()?;

    let cfg = get_config()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(?err, "Failed to listen to SIGINT");
            return;
        }
        warn!("User terminated process via SIGINT");
        std::process::exit(130);
    });

    #[cfg(target_family = "unix")]
    runtime.spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(err) => {
                error!(?err, "Failed to listen to SIGTERM");
                return;
            }
        };
        sigterm.recv().await;
        warn!("Process terminated via SIGTERM");
        std::process::exit(143);
    });

    runtime
        .block_on(inner_main(cfg).instrument(trace_span!("main")))
        .err_tip(|| "main() function failed")?;
    Ok(())
}
