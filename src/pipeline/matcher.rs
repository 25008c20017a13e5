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

use std::sync::{
	Arc,
	atomic::{AtomicBool, AtomicU64, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{info, warn};

use crate::engine::MatchingEngine;
use crate::pipeline::push_with_retry;
use crate::queue::{Consumer, Producer};
use crate::types::{Event, Request};

/// Push attempts against a full egress queue before an event is dropped.
const PUSH_ATTEMPTS: usize = 1000;

/// Idle iterations at the short sleep before backing off to the long one.
const IDLE_FAST_ITERATIONS: u32 = 100;
const IDLE_FAST_SLEEP: Duration = Duration::from_micros(1);
const IDLE_SLOW_SLEEP: Duration = Duration::from_micros(100);

/// Stage 2: the matching loop.
///
/// Drains the ingress queue in batches, runs each request through the
/// engine, and forwards the resulting events. The engine lives entirely on
/// this thread; the queues are the only shared state. When the queue runs
/// dry the loop sleeps on a two-tier schedule so an idle engine does not
/// spin a core, while a loaded one never sleeps at all.
pub struct MatcherStage {
	handle: Option<JoinHandle<()>>,
	stop: Arc<AtomicBool>,
	processed: Arc<AtomicU64>,
}

impl MatcherStage {
	pub fn start(
		consumer: Consumer<Request>,
		producer: Producer<Event>,
		batch_size: usize,
	) -> Self {
		let stop = Arc::new(AtomicBool::new(false));
		let processed = Arc::new(AtomicU64::new(0));
		let stop_flag = stop.clone();
		let processed_counter = processed.clone();

		let handle = thread::Builder::new()
			.name("matcher".to_string())
			.spawn(move || {
				info!(target: "matcher", "matcher started");
				run_matcher_loop(
					&consumer,
					&producer,
					batch_size,
					&stop_flag,
					&processed_counter,
				);
				info!(target: "matcher", "matcher stopped");
			})
			.expect("failed to spawn matcher thread");

		Self {
			handle: Some(handle),
			stop,
			processed,
		}
	}

	/// Signal the stage, wait for it to drain its queue and exit, and
	/// return the total number of requests processed.
	pub fn stop(mut self) -> u64 {
		// Release pairs with the acquire in the loop: once the loop sees the
		// flag, every request enqueued before this call is visible to it.
		self.stop.store(true, Ordering::Release);
		if let Some(handle) = self.handle.take()
			&& let Err(e) = handle.join()
		{
			warn!(target: "matcher", error = ?e, "matcher thread panicked");
		}
		self.processed.load(Ordering::Relaxed)
	}
}

impl Drop for MatcherStage {
	fn drop(&mut self) {
		self.stop.store(true, Ordering::Release);
		if let Some(handle) = self.handle.take() {
			let _ = handle.join();
		}
	}
}

fn run_matcher_loop(
	consumer: &Consumer<Request>,
	producer: &Producer<Event>,
	batch_size: usize,
	stop: &AtomicBool,
	processed: &AtomicU64,
) {
	let mut engine = MatchingEngine::new();
	let mut scratch = Vec::with_capacity(batch_size * 4);
	let mut idle_iterations = 0u32;

	loop {
		let mut drained = 0u64;
		for _ in 0..batch_size {
			let Some(request) = consumer.pop() else {
				break;
			};
			engine.process(request, &mut scratch);
			publish(producer, &mut scratch);
			drained += 1;
		}

		if drained > 0 {
			processed.fetch_add(drained, Ordering::Relaxed);
			idle_iterations = 0;
			continue;
		}

		// Stop is honoured only at an empty batch boundary. The acquire
		// load makes every request enqueued before the flag visible, so the
		// final drain below leaves no residue behind.
		if stop.load(Ordering::Acquire) {
			let mut residue = 0u64;
			while let Some(request) = consumer.pop() {
				engine.process(request, &mut scratch);
				publish(producer, &mut scratch);
				residue += 1;
			}
			if residue > 0 {
				processed.fetch_add(residue, Ordering::Relaxed);
			}
			break;
		}

		idle_iterations = idle_iterations.saturating_add(1);
		thread::sleep(if idle_iterations <= IDLE_FAST_ITERATIONS {
			IDLE_FAST_SLEEP
		} else {
			IDLE_SLOW_SLEEP
		});
	}
}

fn publish(producer: &Producer<Event>, scratch: &mut Vec<Event>) {
	for event in scratch.drain(..) {
		if let Err(dropped) = push_with_retry(producer, event, PUSH_ATTEMPTS) {
			warn!(target: "matcher", event = %dropped, "egress queue full, event dropped");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::queue;
	use crate::types::{NewOrder, Side};
	use std::time::Instant;

	fn new_order(user_id: u32, price: u32, quantity: u32, side: Side, uoid: u32) -> Request {
		Request::New(NewOrder {
			user_id,
			symbol: "IBM".parse().unwrap(),
			price,
			quantity,
			side,
			user_order_id: uoid,
		})
	}

	fn collect(rx: &queue::Consumer<Event>, expected: usize) -> Vec<String> {
		let deadline = Instant::now() + Duration::from_secs(5);
		let mut lines = Vec::new();
		while lines.len() < expected && Instant::now() < deadline {
			match rx.pop() {
				Some(event) => lines.push(event.to_string()),
				None => thread::sleep(Duration::from_millis(1)),
			}
		}
		lines
	}

	#[test]
	fn test_matcher_processes_and_counts() {
		let (in_tx, in_rx) = queue::ring::<Request>(64);
		let (out_tx, out_rx) = queue::ring::<Event>(64);
		let stage = MatcherStage::start(in_rx, out_tx, 32);

		in_tx.push(new_order(1, 100, 50, Side::Sell, 1)).unwrap();
		in_tx.push(new_order(2, 100, 50, Side::Buy, 2)).unwrap();

		let lines = collect(&out_rx, 5);
		assert_eq!(
			lines,
			vec![
				"A, 1, 1, IBM",
				"B, S, 100, 50, IBM",
				"A, 2, 2, IBM",
				"T, 2, 2, 1, 1, 100, 50, IBM",
				"B, S, -, -, IBM",
			]
		);

		assert_eq!(stage.stop(), 2);
	}

	#[test]
	fn test_matcher_drains_residue_on_stop() {
		let (in_tx, in_rx) = queue::ring::<Request>(64);
		let (out_tx, out_rx) = queue::ring::<Event>(256);
		let stage = MatcherStage::start(in_rx, out_tx, 32);

		// Descending asks: every order becomes the new best, so each one
		// produces an ack and a top-of-book event.
		for i in 0..20 {
			in_tx
				.push(new_order(1, 200 - i, 10, Side::Sell, i))
				.unwrap();
		}

		// Stop immediately; every queued request must still be processed.
		assert_eq!(stage.stop(), 20);
		let lines = collect(&out_rx, 40);
		assert_eq!(lines.len(), 40); // one ack + one top-of-book each
	}
}
