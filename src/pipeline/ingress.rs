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

use std::io;
use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};
use std::thread::{self, JoinHandle};

use tracing::{error, info, warn};

use crate::pipeline::push_with_retry;
use crate::queue::Producer;
use crate::types::Request;
use crate::wire;

/// Where ingress gets its datagrams.
///
/// The production implementation wraps a UDP socket; tests inject scripted
/// payloads. `Ok(None)` means no payload arrived within the source's
/// timeout, which is how the stage gets back to its stop-flag check.
pub trait PacketSource: Send {
	fn recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>>;
}

/// Largest datagram the stage will accept.
const MAX_DATAGRAM: usize = 64 * 1024;

/// Push attempts against a full ingress queue before a record is dropped.
const PUSH_ATTEMPTS: usize = 100;

/// Stage 1: splits datagram payloads into records, parses them, and feeds
/// the matcher's queue.
///
/// Malformed records are logged and skipped; they never stop the stage. A
/// full queue is retried with cooperative yields up to a bound, then the
/// record is dropped with a warning, so no record is ever lost silently.
pub struct IngressStage {
	handle: Option<JoinHandle<()>>,
	stop: Arc<AtomicBool>,
}

impl IngressStage {
	pub fn start(mut source: Box<dyn PacketSource>, producer: Producer<Request>) -> Self {
		let stop = Arc::new(AtomicBool::new(false));
		let stop_flag = stop.clone();

		let handle = thread::Builder::new()
			.name("ingress".to_string())
			.spawn(move || {
				info!(target: "ingress", "ingress started");
				run_ingress_loop(source.as_mut(), &producer, &stop_flag);
				info!(target: "ingress", "ingress stopped");
			})
			.expect("failed to spawn ingress thread");

		Self {
			handle: Some(handle),
			stop,
		}
	}

	/// Signal the stage and wait for it to exit. After this returns nothing
	/// new enters the ingress queue.
	pub fn stop(mut self) {
		self.stop.store(true, Ordering::Relaxed);
		if let Some(handle) = self.handle.take()
			&& let Err(e) = handle.join()
		{
			warn!(target: "ingress", error = ?e, "ingress thread panicked");
		}
	}
}

impl Drop for IngressStage {
	fn drop(&mut self) {
		self.stop.store(true, Ordering::Relaxed);
		if let Some(handle) = self.handle.take() {
			let _ = handle.join();
		}
	}
}

fn run_ingress_loop(
	source: &mut dyn PacketSource,
	producer: &Producer<Request>,
	stop: &AtomicBool,
) {
	let mut buf = vec![0u8; MAX_DATAGRAM];
	while !stop.load(Ordering::Relaxed) {
		match source.recv(&mut buf) {
			Ok(Some(len)) => ingest_payload(&buf[..len], producer),
			Ok(None) => {}
			Err(e) => {
				error!(target: "ingress", error = %e, "datagram receive failed");
				break;
			}
		}
	}
}

/// Split a payload into LF/CRLF-delimited records and enqueue each parsed
/// request.
fn ingest_payload(payload: &[u8], producer: &Producer<Request>) {
	for raw in payload.split(|&byte| byte == b'\n') {
		let Ok(record) = std::str::from_utf8(raw) else {
			warn!(target: "ingress", "record is not valid UTF-8, skipped");
			continue;
		};
		match wire::parse_record(record) {
			Ok(Some(request)) => {
				if push_with_retry(producer, request, PUSH_ATTEMPTS).is_err() {
					warn!(
						target: "ingress",
						record = record.trim(),
						"ingress queue full, record dropped"
					);
				}
			}
			Ok(None) => {}
			Err(e) => {
				warn!(
					target: "ingress",
					record = record.trim(),
					error = %e,
					"malformed record skipped"
				);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::queue;
	use crate::types::Side;

	#[test]
	fn test_ingest_payload_parses_and_skips() {
		let (tx, rx) = queue::ring::<Request>(16);

		let payload = b"N, 1, IBM, 100, 50, B, 1\r\n# comment\n\nbogus record\nC, 1, 1\n";
		ingest_payload(payload, &tx);

		match rx.pop() {
			Some(Request::New(new)) => {
				assert_eq!(new.user_id, 1);
				assert_eq!(new.side, Side::Buy);
			}
			other => panic!("expected new order, got {other:?}"),
		}
		assert!(matches!(
			rx.pop(),
			Some(Request::Cancel {
				user_id: 1,
				user_order_id: 1
			})
		));
		assert!(rx.pop().is_none());
	}

	#[test]
	fn test_ingest_drops_when_queue_stays_full() {
		// Capacity 2 holds a single record; the second one must be dropped
		// after the retry bound, not block forever.
		let (tx, rx) = queue::ring::<Request>(2);
		ingest_payload(b"F\nF\n", &tx);

		assert!(matches!(rx.pop(), Some(Request::Flush)));
		assert!(rx.pop().is_none());
	}

	#[test]
	fn test_stage_stops_on_source_exhaustion() {
		struct Idle;
		impl PacketSource for Idle {
			fn recv(&mut self, _buf: &mut [u8]) -> io::Result<Option<usize>> {
				Ok(None)
			}
		}

		let (tx, _rx) = queue::ring::<Request>(16);
		let stage = IngressStage::start(Box::new(Idle), tx);
		stage.stop();
	}
}
