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

//! The three-stage order processing pipeline.
//!
//! ```text
//! [ingress parser] --InQ--> [matcher] --OutQ--> [egress formatter]
//! ```
//!
//! Each stage is one OS thread; the queues are SPSC rings. Ingress is the
//! only producer on InQ, the matcher the only consumer on InQ and the only
//! producer on OutQ, egress the only consumer on OutQ. The controller here
//! owns start/stop sequencing: consumers start first so nothing produced is
//! ever stranded, and shutdown walks the pipeline front to back with drain
//! pauses so in-flight work reaches the output stream.

mod egress;
mod ingress;
mod matcher;

pub use egress::EgressStage;
pub use ingress::{IngressStage, PacketSource};
pub use matcher::MatcherStage;

use std::io::Write;
use std::thread;
use std::time::Duration;

use tracing::info;

use crate::config::MatchingConfig;
use crate::queue::{self, Producer};
use crate::types::{Event, Request};

/// Pause between stage stops, long enough for the downstream stage to
/// drain what the stopped stage already produced.
const DRAIN_PAUSE: Duration = Duration::from_millis(200);

/// Totals reported after a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineReport {
	/// Requests processed by the matcher.
	pub messages_processed: u64,
	/// Events written to the output stream by the formatter.
	pub events_published: u64,
}

/// Handle to a running pipeline.
pub struct Pipeline {
	ingress: IngressStage,
	matcher: MatcherStage,
	egress: EgressStage,
}

impl Pipeline {
	/// Start all three stages, consumers first.
	pub fn start(
		config: &MatchingConfig,
		source: Box<dyn PacketSource>,
		sink: Box<dyn Write + Send>,
	) -> Self {
		let (in_tx, in_rx) = queue::ring::<Request>(config.queue_capacity);
		let (out_tx, out_rx) = queue::ring::<Event>(config.queue_capacity);

		let egress = EgressStage::start(out_rx, sink);
		let matcher = MatcherStage::start(in_rx, out_tx, config.batch_size);
		let ingress = IngressStage::start(source, in_tx);

		Self {
			ingress,
			matcher,
			egress,
		}
	}

	/// Drain and stop, front to back: once ingress is down nothing new
	/// enters InQ, the matcher finishes the residue, and egress flushes the
	/// tail of OutQ before exiting.
	pub fn shutdown(self) -> PipelineReport {
		info!(target: "pipeline", "stopping ingress");
		self.ingress.stop();
		thread::sleep(DRAIN_PAUSE);

		info!(target: "pipeline", "stopping matcher");
		let messages_processed = self.matcher.stop();
		thread::sleep(DRAIN_PAUSE);

		info!(target: "pipeline", "stopping egress");
		let events_published = self.egress.stop();

		PipelineReport {
			messages_processed,
			events_published,
		}
	}
}

/// Retry a push against a full ring with cooperative yields, up to a bound.
/// Returns the item back once the bound is exhausted so the caller can log
/// the drop; nothing is ever discarded silently.
pub(crate) fn push_with_retry<T: Send>(
	producer: &Producer<T>,
	mut item: T,
	attempts: usize,
) -> Result<(), T> {
	for _ in 0..attempts {
		match producer.push(item) {
			Ok(()) => return Ok(()),
			Err(back) => {
				item = back;
				thread::yield_now();
			}
		}
	}
	Err(item)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_push_with_retry_succeeds_once_space_frees() {
		let (tx, rx) = queue::ring::<u32>(2);
		tx.push(1).unwrap();

		let drainer = thread::spawn(move || {
			thread::sleep(Duration::from_millis(5));
			rx.pop()
		});

		// Plenty of attempts: the drainer frees the slot well inside them.
		assert_eq!(push_with_retry(&tx, 2, 1_000_000), Ok(()));
		assert_eq!(drainer.join().unwrap(), Some(1));
	}

	#[test]
	fn test_push_with_retry_gives_item_back() {
		let (tx, _rx) = queue::ring::<u32>(2);
		tx.push(1).unwrap();
		assert_eq!(push_with_retry(&tx, 2, 10), Err(2));
	}
}
