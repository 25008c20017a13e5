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

//! Per-symbol limit order book.
//!
//! Price-time priority: an incoming order matches the best opposite level
//! first and walks each level's orders oldest first. Trades print at the
//! resting order's price. Limit residuals rest; market residuals are
//! discarded. After every mutation the book compares each side's top
//! against the last emitted snapshot and appends change events, Buy side
//! first.

mod arena;
mod ladder;
mod level;

use std::collections::HashMap;

use crate::book::arena::{NodeRef, OrderArena};
use crate::book::ladder::SideLadder;
use crate::types::{Event, Order, OrderKey, OrderKind, Side, Symbol, TopLevel};

/// Sentinel snapshot for an empty side.
const EMPTY_TOP: (u32, u64) = (0, 0);

pub struct OrderBook {
	symbol: Symbol,
	bids: SideLadder,
	asks: SideLadder,
	arena: OrderArena,
	/// Resting orders only: exactly the keys currently in some level.
	index: HashMap<OrderKey, NodeRef>,
	/// Last emitted `(price, total_quantity)` per side, `Side::index()`-keyed.
	last_top: [(u32, u64); 2],
}

impl OrderBook {
	pub fn new(symbol: Symbol) -> Self {
		Self {
			symbol,
			bids: SideLadder::new(Side::Buy),
			asks: SideLadder::new(Side::Sell),
			arena: OrderArena::new(),
			index: HashMap::new(),
			last_top: [EMPTY_TOP; 2],
		}
	}

	pub fn symbol(&self) -> Symbol {
		self.symbol
	}

	/// Acknowledge, match, rest the residual, then report top changes.
	pub fn add_order(&mut self, mut order: Order, events: &mut Vec<Event>) {
		events.push(Event::Acknowledged {
			key: order.key,
			symbol: self.symbol,
		});

		self.match_incoming(&mut order, events);

		if order.remaining > 0 && order.kind == OrderKind::Limit {
			self.rest(order);
		}

		self.emit_top_changes(events);
	}

	/// Cancel by participant key. The Cancel-Ack is emitted whether or not
	/// the order is resting; only a real removal can move the top of book.
	pub fn cancel_order(&mut self, key: OrderKey, events: &mut Vec<Event>) {
		if let Some(node) = self.index.remove(&key) {
			let (side, price) = {
				let node = self
					.arena
					.get(node)
					.expect("indexed order refers to a live node");
				(node.order.side, node.order.price)
			};

			let Self {
				bids, asks, arena, ..
			} = self;
			let ladder = match side {
				Side::Buy => bids,
				Side::Sell => asks,
			};
			if let Some(level) = ladder.level_mut(price) {
				level.unlink(arena, node);
				if level.is_empty() {
					ladder.remove_level(price);
				}
			}
		}

		events.push(Event::Cancelled {
			key,
			symbol: Some(self.symbol),
		});
		self.emit_top_changes(events);
	}

	fn match_incoming(&mut self, order: &mut Order, events: &mut Vec<Event>) {
		let Self {
			symbol,
			bids,
			asks,
			arena,
			index,
			..
		} = self;
		let opposite = match order.side {
			Side::Buy => asks,
			Side::Sell => bids,
		};

		while order.remaining > 0 {
			let Some(level) = opposite.best_mut() else {
				break;
			};
			let level_price = level.price();
			let crosses = match order.kind {
				OrderKind::Market => true,
				OrderKind::Limit => match order.side {
					Side::Buy => order.price >= level_price,
					Side::Sell => order.price <= level_price,
				},
			};
			if !crosses {
				break;
			}

			while order.remaining > 0 {
				let Some(head) = level.front() else {
					break;
				};
				let resting = arena
					.get_mut(head)
					.expect("level head refers to a live node");

				let traded = order.remaining.min(resting.order.remaining);
				events.push(trade_event(order, &resting.order, level_price, traded, *symbol));

				order.remaining -= traded;
				resting.order.remaining -= traded;
				let filled = resting.order.is_filled().then_some(resting.order.key);

				level.reduce(traded);
				if let Some(key) = filled {
					level.pop_front(arena);
					index.remove(&key);
				}
			}

			if level.is_empty() {
				opposite.remove_best();
			}
		}
	}

	fn rest(&mut self, order: Order) {
		let Self {
			bids,
			asks,
			arena,
			index,
			..
		} = self;
		let ladder = match order.side {
			Side::Buy => bids,
			Side::Sell => asks,
		};
		let key = order.key;
		let node = ladder.get_or_insert(order.price).push_back(arena, order);
		index.insert(key, node);
	}

	fn emit_top_changes(&mut self, events: &mut Vec<Event>) {
		let Self {
			symbol,
			bids,
			asks,
			last_top,
			..
		} = self;

		// Buy before Sell, always.
		for side in [Side::Buy, Side::Sell] {
			let current = match side {
				Side::Buy => bids.top(),
				Side::Sell => asks.top(),
			}
			.unwrap_or(EMPTY_TOP);

			let snapshot = &mut last_top[side.index()];
			if *snapshot == current {
				continue;
			}
			*snapshot = current;

			let level = (current != EMPTY_TOP).then(|| TopLevel {
				price: current.0,
				quantity: current.1,
			});
			events.push(Event::TopOfBook {
				side,
				level,
				symbol: *symbol,
			});
		}
	}

	/// Whether `key` is currently resting in this book.
	pub fn contains(&self, key: &OrderKey) -> bool {
		self.index.contains_key(key)
	}

	pub fn best_bid(&self) -> Option<u32> {
		self.bids.top().map(|(price, _)| price)
	}

	pub fn best_ask(&self) -> Option<u32> {
		self.asks.top().map(|(price, _)| price)
	}

	/// Total resting quantity at a price, if the level exists.
	pub fn level_quantity(&self, side: Side, price: u32) -> Option<u64> {
		let ladder = match side {
			Side::Buy => &self.bids,
			Side::Sell => &self.asks,
		};
		ladder.level(price).map(|level| level.total_quantity())
	}

	pub fn depth(&self, side: Side) -> usize {
		match side {
			Side::Buy => self.bids.depth(),
			Side::Sell => self.asks.depth(),
		}
	}

	pub fn order_count(&self) -> usize {
		self.arena.len()
	}

	pub fn is_empty(&self) -> bool {
		self.arena.is_empty()
	}

	/// Panic if a structural invariant is violated: a crossed book, an empty
	/// or mis-totalled price level, or an order index out of step with the
	/// resting orders. The matching paths maintain these by construction;
	/// tests call this after every mutation.
	pub fn assert_invariants(&self) {
		if let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask()) {
			assert!(bid < ask, "crossed book: bid {bid} >= ask {ask}");
		}
		let mut resting = 0;
		for ladder in [&self.bids, &self.asks] {
			for level in ladder.iter() {
				assert!(level.order_count() > 0, "empty level at {}", level.price());
				assert!(level.total_quantity() > 0);
				resting += level.order_count();
			}
		}
		assert_eq!(resting, self.index.len());
		assert_eq!(resting, self.arena.len());
	}
}

fn trade_event(
	aggressor: &Order,
	passive: &Order,
	price: u32,
	quantity: u32,
	symbol: Symbol,
) -> Event {
	let (buy, sell) = match aggressor.side {
		Side::Buy => (aggressor.key, passive.key),
		Side::Sell => (passive.key, aggressor.key),
	};
	Event::Traded {
		buy,
		sell,
		price,
		quantity,
		symbol,
	}
}
