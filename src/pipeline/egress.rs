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

use std::io::{self, Write};
use std::sync::{
	Arc,
	atomic::{AtomicBool, AtomicU64, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::queue::Consumer;
use crate::types::Event;

const IDLE_SLEEP: Duration = Duration::from_micros(10);

/// Stage 3: serializes events to CSV lines and writes them out.
///
/// The sink is flushed after every record so a downstream pipe reader sees
/// each event as it happens. A write failure ends the stage: with the
/// output stream gone there is nobody left to publish to.
pub struct EgressStage {
	handle: Option<JoinHandle<()>>,
	stop: Arc<AtomicBool>,
	published: Arc<AtomicU64>,
}

impl EgressStage {
	pub fn start(consumer: Consumer<Event>, mut sink: Box<dyn Write + Send>) -> Self {
		let stop = Arc::new(AtomicBool::new(false));
		let published = Arc::new(AtomicU64::new(0));
		let stop_flag = stop.clone();
		let published_counter = published.clone();

		let handle = thread::Builder::new()
			.name("egress".to_string())
			.spawn(move || {
				info!(target: "egress", "egress started");
				run_egress_loop(&consumer, sink.as_mut(), &stop_flag, &published_counter);
				info!(target: "egress", "egress stopped");
			})
			.expect("failed to spawn egress thread");

		Self {
			handle: Some(handle),
			stop,
			published,
		}
	}

	/// Signal the stage, wait for it to drain remaining events and exit,
	/// and return the total number of events published.
	pub fn stop(mut self) -> u64 {
		// Release pairs with the acquire in the loop: once the loop sees the
		// flag, every event enqueued before this call is visible to it.
		self.stop.store(true, Ordering::Release);
		if let Some(handle) = self.handle.take()
			&& let Err(e) = handle.join()
		{
			warn!(target: "egress", error = ?e, "egress thread panicked");
		}
		self.published.load(Ordering::Relaxed)
	}
}

impl Drop for EgressStage {
	fn drop(&mut self) {
		self.stop.store(true, Ordering::Release);
		if let Some(handle) = self.handle.take() {
			let _ = handle.join();
		}
	}
}

fn run_egress_loop(
	consumer: &Consumer<Event>,
	sink: &mut dyn Write,
	stop: &AtomicBool,
	published: &AtomicU64,
) {
	'run: loop {
		match consumer.pop() {
			Some(event) => {
				if let Err(e) = write_event(sink, &event) {
					error!(target: "egress", error = %e, "output stream write failed, egress stopping");
					break;
				}
				published.fetch_add(1, Ordering::Relaxed);
			}
			None => {
				// The acquire load makes every event enqueued before the
				// stop flag visible, so the final drain leaves nothing
				// unwritten.
				if stop.load(Ordering::Acquire) {
					while let Some(event) = consumer.pop() {
						if let Err(e) = write_event(sink, &event) {
							error!(target: "egress", error = %e, "output stream write failed, egress stopping");
							break 'run;
						}
						published.fetch_add(1, Ordering::Relaxed);
					}
					break;
				}
				thread::sleep(IDLE_SLEEP);
			}
		}
	}
}

fn write_event(sink: &mut dyn Write, event: &Event) -> io::Result<()> {
	writeln!(sink, "{event}")?;
	sink.flush()
}
