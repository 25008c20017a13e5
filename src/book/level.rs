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

use crate::book::arena::{NodeRef, OrderArena};
use crate::types::Order;

/// All resting orders at one price on one side, in arrival order.
///
/// The level owns only the list endpoints; the nodes live in the book's
/// arena. Head is the oldest order and matches first. The cached
/// `total_quantity` always equals the sum of the member orders' remaining
/// quantities. A level exists only while it has orders; the ladder removes
/// it as soon as it empties.
#[derive(Debug)]
pub(crate) struct PriceLevel {
	price: u32,
	head: Option<NodeRef>,
	tail: Option<NodeRef>,
	total_quantity: u64,
	order_count: usize,
}

impl PriceLevel {
	pub fn new(price: u32) -> Self {
		Self {
			price,
			head: None,
			tail: None,
			total_quantity: 0,
			order_count: 0,
		}
	}

	pub fn price(&self) -> u32 {
		self.price
	}

	pub fn total_quantity(&self) -> u64 {
		self.total_quantity
	}

	pub fn order_count(&self) -> usize {
		self.order_count
	}

	pub fn is_empty(&self) -> bool {
		self.head.is_none()
	}

	/// Oldest order at this price.
	pub fn front(&self) -> Option<NodeRef> {
		self.head
	}

	/// Append at the tail, preserving time priority.
	pub fn push_back(&mut self, arena: &mut OrderArena, order: Order) -> NodeRef {
		let remaining = u64::from(order.remaining);
		let node = arena.insert(order);

		if let Some(tail) = self.tail {
			arena
				.get_mut(tail)
				.expect("level tail refers to a live node")
				.next = Some(node);
			arena
				.get_mut(node)
				.expect("freshly inserted node is live")
				.prev = Some(tail);
		} else {
			self.head = Some(node);
		}
		self.tail = Some(node);

		self.total_quantity += remaining;
		self.order_count += 1;
		node
	}

	/// Unlink a node and free it, returning the order. O(1); no other node
	/// moves, so index handles to the rest of the level stay valid.
	pub fn unlink(&mut self, arena: &mut OrderArena, node: NodeRef) -> Option<Order> {
		let (prev, next, remaining) = {
			let n = arena.get(node)?;
			(n.prev, n.next, u64::from(n.order.remaining))
		};

		match prev {
			Some(prev) => {
				arena
					.get_mut(prev)
					.expect("linked predecessor is live")
					.next = next;
			}
			None => self.head = next,
		}
		match next {
			Some(next) => {
				arena.get_mut(next).expect("linked successor is live").prev = prev;
			}
			None => self.tail = prev,
		}

		self.total_quantity -= remaining;
		self.order_count -= 1;
		arena.remove(node)
	}

	pub fn pop_front(&mut self, arena: &mut OrderArena) -> Option<Order> {
		let head = self.head?;
		self.unlink(arena, head)
	}

	/// Account for a partial fill of a member order. The caller has already
	/// decremented the order's own remaining quantity.
	pub fn reduce(&mut self, quantity: u32) {
		self.total_quantity -= u64::from(quantity);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::{OrderKey, OrderKind, Side};

	fn order(user_order_id: u32, remaining: u32) -> Order {
		Order {
			key: OrderKey::new(1, user_order_id),
			symbol: "IBM".parse().unwrap(),
			price: 100,
			quantity: remaining,
			remaining,
			side: Side::Sell,
			kind: OrderKind::Limit,
			sequence: u64::from(user_order_id),
		}
	}

	#[test]
	fn test_fifo_order_preserved() {
		let mut arena = OrderArena::new();
		let mut level = PriceLevel::new(100);

		level.push_back(&mut arena, order(1, 10));
		level.push_back(&mut arena, order(2, 20));
		level.push_back(&mut arena, order(3, 30));

		assert_eq!(level.total_quantity(), 60);
		assert_eq!(level.order_count(), 3);

		assert_eq!(level.pop_front(&mut arena).unwrap().key.user_order_id, 1);
		assert_eq!(level.pop_front(&mut arena).unwrap().key.user_order_id, 2);
		assert_eq!(level.pop_front(&mut arena).unwrap().key.user_order_id, 3);
		assert!(level.is_empty());
		assert_eq!(level.total_quantity(), 0);
	}

	#[test]
	fn test_unlink_middle_keeps_links() {
		let mut arena = OrderArena::new();
		let mut level = PriceLevel::new(100);

		level.push_back(&mut arena, order(1, 10));
		let middle = level.push_back(&mut arena, order(2, 20));
		level.push_back(&mut arena, order(3, 30));

		let removed = level.unlink(&mut arena, middle).unwrap();
		assert_eq!(removed.key.user_order_id, 2);
		assert_eq!(level.total_quantity(), 40);
		assert_eq!(level.order_count(), 2);

		assert_eq!(level.pop_front(&mut arena).unwrap().key.user_order_id, 1);
		assert_eq!(level.pop_front(&mut arena).unwrap().key.user_order_id, 3);
	}

	#[test]
	fn test_unlink_tail_updates_tail() {
		let mut arena = OrderArena::new();
		let mut level = PriceLevel::new(100);

		level.push_back(&mut arena, order(1, 10));
		let tail = level.push_back(&mut arena, order(2, 20));
		level.unlink(&mut arena, tail).unwrap();

		// Appending after a tail removal must link behind order 1.
		level.push_back(&mut arena, order(3, 30));
		assert_eq!(level.pop_front(&mut arena).unwrap().key.user_order_id, 1);
		assert_eq!(level.pop_front(&mut arena).unwrap().key.user_order_id, 3);
	}

	#[test]
	fn test_reduce_tracks_partial_fill() {
		let mut arena = OrderArena::new();
		let mut level = PriceLevel::new(100);
		let node = level.push_back(&mut arena, order(1, 50));

		arena.get_mut(node).unwrap().order.remaining -= 30;
		level.reduce(30);
		assert_eq!(level.total_quantity(), 20);
	}
}
