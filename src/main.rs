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

//! matchwire service entry point.
//!
//! Binds the UDP order-entry socket, starts the pipeline, and waits for
//! SIGINT/SIGTERM. On shutdown the pipeline is drained front to back and
//! the processing totals are logged. Events go to stdout, diagnostics to
//! stderr.

use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use matchwire::config::MatchingConfig;
use matchwire::logging;
use matchwire::pipeline::Pipeline;
use matchwire::udp::UdpSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	logging::init_logging()?;

	let config = match std::env::var("MATCHWIRE_CONFIG") {
		Ok(path) => MatchingConfig::from_file(&path),
		Err(_) => MatchingConfig::from_env(),
	}
	.context("failed to load configuration")?;

	let source = UdpSource::bind(config.bind_addr)
		.with_context(|| format!("failed to bind {}", config.bind_addr))?;
	info!(
		bind_addr = %config.bind_addr,
		queue_capacity = config.queue_capacity,
		batch_size = config.batch_size,
		"matchwire started"
	);

	let pipeline = Pipeline::start(&config, Box::new(source), Box::new(std::io::stdout()));

	let shutdown = Arc::new(AtomicBool::new(false));
	{
		let shutdown = shutdown.clone();
		tokio::spawn(async move {
			wait_for_signal().await;
			shutdown.store(true, Ordering::Relaxed);
		});
	}

	while !shutdown.load(Ordering::Relaxed) {
		tokio::time::sleep(Duration::from_millis(50)).await;
	}

	info!("shutdown requested, draining pipeline");
	let report = pipeline.shutdown();
	info!(
		messages_processed = report.messages_processed,
		events_published = report.events_published,
		"pipeline drained"
	);

	Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
	use tokio::signal::unix::{SignalKind, signal};

	let mut terminate =
		signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
	tokio::select! {
		_ = tokio::signal::ctrl_c() => info!("received SIGINT"),
		_ = terminate.recv() => info!("received SIGTERM"),
	}
}

#[cfg(not(unix))]
async fn wait_for_signal() {
	let _ = tokio::signal::ctrl_c().await;
	info!("received interrupt");
}
