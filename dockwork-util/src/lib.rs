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

use std::env;
use std::sync::OnceLock;

use dockwork_error::{Code, make_err};
use tracing::metadata::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

pub mod keyed_mutex;
pub mod store_trait;
pub mod worker_messages;

// Re-export tracing mostly for use in macros.
pub use tracing as __tracing;

/// Environment variable selecting the stdout log format.
const LOG_FORMAT_ENV: &str = "DW_LOG";

fn env_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
}

// Create a tracing layer intended for stdout printing.
//
// The output of this layer is configurable via the `DW_LOG` environment
// variable: `pretty` (default), `compact` or `json`.
fn tracing_stdout_layer() -> Box<dyn Layer<Registry> + Send + Sync> {
    let log_fmt = env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| "pretty".to_string());

    match log_fmt.as_str() {
        "compact" => fmt::layer()
            .compact()
            .with_timer(fmt::time::time())
            .with_filter(env_filter())
            .boxed(),
        "json" => fmt::layer()
            .json()
            .with_timer(fmt::time::time())
            .with_filter(env_filter())
            .boxed(),
        _ => fmt::layer()
            .pretty()
            .with_timer(fmt::time::time())
            .with_filter(env_filter())
            .boxed(),
    }
}

/// Initialize tracing.
///
/// # Errors
///
/// Returns `Err` if logging was already initialized.
pub fn init_tracing() -> Result<(), dockwork_error::Error> {
    static INITIALIZED: OnceLock<()> = OnceLock::new();

    if INITIALIZED.set(()).is_err() {
        return Err(make_err!(Code::Internal, "Logging already initialized"));
    }

    tracing_subscriber::registry()
        .with(tracing_stdout_layer())
        .try_init()
        .map_err(|e| make_err!(Code::Internal, "{e}"))
}
