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

//! Bounded lock-free single-producer/single-consumer ring buffer.
//!
//! This is the transport between pipeline stages. Each ring has exactly one
//! writer thread and one reader thread; under that discipline the classic
//! Lamport protocol needs no locks and no read-modify-write atomics:
//!
//! - The writer owns `tail`: it loads it relaxed, loads `head` with acquire
//!   to see the reader's progress, writes the slot, then publishes with a
//!   release store of `tail`.
//! - The reader owns `head` and plays the symmetric role.
//!
//! `head` and `tail` live on their own cache lines so the two threads do not
//! false-share. Capacity must be a power of two; wrap is by masking, and one
//! slot is sacrificed to distinguish full from empty, so a ring of capacity
//! N holds at most N-1 items.
//!
//! Full and empty are ordinary return values, not failures: `push` hands the
//! item back when the ring is full and `pop` returns `None` when empty.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

/// Create a ring with the given capacity and split it into its producer and
/// consumer halves.
///
/// Each half is `Send` but not `Clone`: the single-producer/single-consumer
/// discipline is enforced by ownership.
///
/// # Panics
///
/// Panics if `capacity` is not a power of two or is less than 2.
pub fn ring<T: Send>(capacity: usize) -> (Producer<T>, Consumer<T>) {
	assert!(
		capacity.is_power_of_two() && capacity >= 2,
		"ring capacity must be a power of two >= 2, got {capacity}"
	);

	let slots = (0..capacity)
		.map(|_| UnsafeCell::new(MaybeUninit::uninit()))
		.collect::<Vec<_>>()
		.into_boxed_slice();

	let inner = Arc::new(Inner {
		head: CachePadded::new(AtomicUsize::new(0)),
		tail: CachePadded::new(AtomicUsize::new(0)),
		mask: capacity - 1,
		slots,
	});

	(
		Producer {
			inner: inner.clone(),
		},
		Consumer { inner },
	)
}

struct Inner<T> {
	/// Reader-advanced index of the next slot to pop.
	head: CachePadded<AtomicUsize>,
	/// Writer-advanced index of the next slot to fill.
	tail: CachePadded<AtomicUsize>,
	mask: usize,
	slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// Slots are only touched by the producer before the release store of `tail`
// and by the consumer after the matching acquire load, so sharing Inner
// across the two threads is sound for any Send payload.
unsafe impl<T: Send> Send for Inner<T> {}
unsafe impl<T: Send> Sync for Inner<T> {}

impl<T> Drop for Inner<T> {
	fn drop(&mut self) {
		// Both halves are gone; drop whatever was pushed but never popped.
		let mut head = *self.head.get_mut();
		let tail = *self.tail.get_mut();
		while head != tail {
			unsafe { (*self.slots[head].get()).assume_init_drop() };
			head = (head + 1) & self.mask;
		}
	}
}

/// Writer half of the ring.
pub struct Producer<T> {
	inner: Arc<Inner<T>>,
}

impl<T: Send> Producer<T> {
	/// Non-blocking enqueue. Returns the item back when the ring is full so
	/// the caller can retry or drop it explicitly.
	pub fn push(&self, item: T) -> Result<(), T> {
		let inner = &*self.inner;
		let tail = inner.tail.load(Ordering::Relaxed);
		let next = (tail + 1) & inner.mask;
		if next == inner.head.load(Ordering::Acquire) {
			return Err(item);
		}
		unsafe { (*inner.slots[tail].get()).write(item) };
		inner.tail.store(next, Ordering::Release);
		Ok(())
	}

	/// May be stale by the time the caller acts on it.
	pub fn is_full(&self) -> bool {
		let inner = &*self.inner;
		let tail = inner.tail.load(Ordering::Relaxed);
		(tail + 1) & inner.mask == inner.head.load(Ordering::Acquire)
	}
}

/// Reader half of the ring.
pub struct Consumer<T> {
	inner: Arc<Inner<T>>,
}

impl<T: Send> Consumer<T> {
	/// Non-blocking dequeue; `None` when the ring is empty.
	pub fn pop(&self) -> Option<T> {
		let inner = &*self.inner;
		let head = inner.head.load(Ordering::Relaxed);
		if head == inner.tail.load(Ordering::Acquire) {
			return None;
		}
		let item = unsafe { (*inner.slots[head].get()).assume_init_read() };
		inner.head.store((head + 1) & inner.mask, Ordering::Release);
		Some(item)
	}

	/// Number of queued items. May be stale.
	pub fn len(&self) -> usize {
		let inner = &*self.inner;
		let tail = inner.tail.load(Ordering::Acquire);
		let head = inner.head.load(Ordering::Acquire);
		tail.wrapping_sub(head) & inner.mask
	}

	/// May be stale.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::AtomicUsize as Counter;
	use std::thread;

	#[test]
	fn test_push_pop_fifo() {
		let (tx, rx) = ring::<u32>(8);
		for i in 0..5 {
			tx.push(i).unwrap();
		}
		for i in 0..5 {
			assert_eq!(rx.pop(), Some(i));
		}
		assert_eq!(rx.pop(), None);
	}

	#[test]
	fn test_effective_capacity_is_one_less() {
		let (tx, rx) = ring::<u32>(4);
		tx.push(1).unwrap();
		tx.push(2).unwrap();
		tx.push(3).unwrap();
		assert!(tx.is_full());
		assert_eq!(tx.push(4), Err(4));
		assert_eq!(rx.len(), 3);

		assert_eq!(rx.pop(), Some(1));
		tx.push(4).unwrap();
		assert_eq!(tx.push(5), Err(5));
	}

	#[test]
	fn test_wrap_around() {
		let (tx, rx) = ring::<u32>(4);
		for round in 0..20 {
			tx.push(round).unwrap();
			tx.push(round + 100).unwrap();
			assert_eq!(rx.pop(), Some(round));
			assert_eq!(rx.pop(), Some(round + 100));
		}
		assert!(rx.is_empty());
	}

	#[test]
	#[should_panic(expected = "power of two")]
	fn test_rejects_non_power_of_two() {
		let _ = ring::<u32>(100);
	}

	#[test]
	fn test_drops_undelivered_items() {
		#[derive(Debug)]
		struct Tracked(Arc<Counter>);
		impl Drop for Tracked {
			fn drop(&mut self) {
				self.0.fetch_add(1, Ordering::Relaxed);
			}
		}

		let drops = Arc::new(Counter::new(0));
		let (tx, rx) = ring::<Tracked>(8);
		for _ in 0..3 {
			tx.push(Tracked(drops.clone())).unwrap();
		}
		drop(rx.pop());
		assert_eq!(drops.load(Ordering::Relaxed), 1);

		drop(tx);
		drop(rx);
		assert_eq!(drops.load(Ordering::Relaxed), 3);
	}

	#[test]
	fn test_cross_thread_transfer() {
		const ITEMS: u64 = 100_000;
		let (tx, rx) = ring::<u64>(1024);

		let writer = thread::spawn(move || {
			for i in 0..ITEMS {
				let mut item = i;
				loop {
					match tx.push(item) {
						Ok(()) => break,
						Err(back) => {
							item = back;
							thread::yield_now();
						}
					}
				}
			}
		});

		let mut expected = 0u64;
		while expected < ITEMS {
			match rx.pop() {
				Some(value) => {
					assert_eq!(value, expected);
					expected += 1;
				}
				None => thread::yield_now(),
			}
		}

		writer.join().unwrap();
		assert!(rx.is_empty());
	}
}
