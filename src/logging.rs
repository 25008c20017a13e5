// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logging initialization.
//!
//! Log level is controlled by `RUST_LOG` (default: `info`), settable per
//! module, e.g. `RUST_LOG=matchwire::pipeline=debug`. All diagnostics go to
//! **stderr**: stdout carries the engine's event stream and must stay clean.

use anyhow::Result;
use tracing_subscriber::{
	EnvFilter, fmt, layer::SubscriberExt, registry::Registry, util::SubscriberInitExt,
};

const DEFAULT_LOG_LEVEL: &str = "info";

/// Initialize the tracing subscriber.
pub fn init_logging() -> Result<()> {
	dotenv::dotenv().ok();

	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

	Registry::default()
		.with(filter)
		.with(
			fmt::layer()
				.with_writer(std::io::stderr)
				.with_target(true)
				.with_thread_names(true),
		)
		.try_init()?;

	Ok(())
}
