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

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dockwork_config::dockwork_server::ServerConfig;
use dockwork_error::{Error, ResultExt, make_input_err};
use dockwork_util::store_trait::{Page, Sort};
use dockwork_util::worker_messages::Worker;

use crate::reconciler::{ReconcileError, WorkerReconciler};

impl ReconcileError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidName | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::AmbiguousMatch { .. } => StatusCode::CONFLICT,
            Self::PortUnavailable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RuntimeUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Runtime(_) | Self::StoreFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ReconcileError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

/// Query parameters of `listWorkers`.
#[derive(Debug, PartialEq, Eq)]
struct ListWorkersParams {
    page: usize,
    size: usize,
    sort: Sort,
}

impl ListWorkersParams {
    // Built from raw pairs because `sort` may repeat.
    fn from_pairs(pairs: &[(String, String)]) -> Result<Self, Error> {
        let mut page = None;
        let mut size = None;
        let mut sort_values = Vec::new();
        for (key, value) in pairs {
            match key.as_str() {
                "page" => {
                    page = Some(
                        value
                            .parse::<usize>()
                            .err_tip(|| format!("Invalid page '{value}'"))?,
                    );
                }
                "size" => {
                    size = Some(
                        value
                            .parse::<usize>()
                            .err_tip(|| format!("Invalid size '{value}'"))?,
                    );
                }
                "sort" => sort_values.push(value.as_str()),
                _ => {}
            }
        }
        Ok(Self {
            page: page.ok_or_else(|| make_input_err!("Missing required parameter 'page'"))?,
            size: size.ok_or_else(|| make_input_err!("Missing required parameter 'size'"))?,
            sort: Sort::from_params(&sort_values)?,
        })
    }
}

async fn list_workers(
    State(reconciler): State<Arc<WorkerReconciler>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Page<Worker>>, ReconcileError> {
    let params = ListWorkersParams::from_pairs(&pairs).map_err(ReconcileError::InvalidRequest)?;
    reconciler
        .list_workers(params.page, params.size, params.sort)
        .await
        .map(Json)
}

async fn start_worker(
    State(reconciler): State<Arc<WorkerReconciler>>,
    Path(container_name): Path<String>,
) -> Result<String, ReconcileError> {
    let outcome = reconciler.start_worker(&container_name).await?;
    Ok(outcome.message())
}

async fn stop_worker(
    State(reconciler): State<Arc<WorkerReconciler>>,
    Path(container_name): Path<String>,
) -> Result<String, ReconcileError> {
    let outcome = reconciler.stop_worker(&container_name).await?;
    Ok(outcome.message())
}

/// HTTP front end of the [`WorkerReconciler`].
///
/// Serves `GET {base_path}/worker/listWorkers`,
/// `POST {base_path}/worker/startWorker/{containerName}` and
/// `POST {base_path}/worker/stopWorker/{containerName}`.
#[derive(Debug, Clone)]
pub struct WorkerApiServer {
    reconciler: Arc<WorkerReconciler>,
    base_path: String,
}

impl WorkerApiServer {
    pub fn new(reconciler: Arc<WorkerReconciler>, config: &ServerConfig) -> Self {
        Self {
            reconciler,
            base_path: config.base_path.trim_end_matches('/').to_string(),
        }
    }

    pub fn into_router(self) -> Router {
        let routes = Router::new()
            .route("/worker/listWorkers", get(list_workers))
            .route("/worker/startWorker/{container_name}", post(start_worker))
            .route("/worker/stopWorker/{container_name}", post(stop_worker))
            .with_state(self.reconciler);
        if self.base_path.is_empty() {
            // Nesting at the root is not allowed.
            return routes;
        }
        let base_path = if self.base_path.starts_with('/') {
            self.base_path
        } else {
            format!("/{}", self.base_path)
        };
        Router::new().nest(&base_path, routes)
    }
}
