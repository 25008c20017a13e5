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

//! Multi-symbol matching engine.
//!
//! Owns one [`OrderBook`] per symbol (created on first use) plus a global
//! participant-key → symbol route map; cancel requests carry no symbol, so
//! the route map is what finds the right book. The engine is single-threaded
//! by design: it is driven only by the matcher stage, so no internal locking
//! is needed and event order is total per symbol.

use std::collections::HashMap;

use tracing::warn;

use crate::book::OrderBook;
use crate::types::{Event, NewOrder, Order, OrderKey, Request, Symbol};

pub struct MatchingEngine {
	books: HashMap<Symbol, OrderBook>,
	/// Routes cancels to the book that accepted the key. Entries persist
	/// until a cancel or flush removes them, even after the order fills.
	routes: HashMap<OrderKey, Symbol>,
	next_sequence: u64,
}

impl MatchingEngine {
	pub fn new() -> Self {
		Self {
			books: HashMap::new(),
			routes: HashMap::new(),
			next_sequence: 0,
		}
	}

	/// Process one request, appending response events to `events`.
	pub fn process(&mut self, request: Request, events: &mut Vec<Event>) {
		match request {
			Request::New(new) => self.process_new_order(new, events),
			Request::Cancel {
				user_id,
				user_order_id,
			} => self.process_cancel(OrderKey::new(user_id, user_order_id), events),
			Request::Flush => self.process_flush(),
		}
	}

	fn process_new_order(&mut self, new: NewOrder, events: &mut Vec<Event>) {
		let key = new.key();

		// A key that is still resting is rejected outright: silently keeping
		// both orders would leave one of them uncancellable.
		if let Some(symbol) = self.routes.get(&key)
			&& let Some(book) = self.books.get(symbol)
			&& book.contains(&key)
		{
			warn!(
				user_id = key.user_id,
				user_order_id = key.user_order_id,
				symbol = %new.symbol,
				"duplicate order id still resting, request dropped"
			);
			return;
		}

		self.routes.insert(key, new.symbol);
		self.next_sequence += 1;

		let order = Order {
			key,
			symbol: new.symbol,
			price: new.price,
			quantity: new.quantity,
			remaining: new.quantity,
			side: new.side,
			kind: new.kind(),
			sequence: self.next_sequence,
		};
		self.books
			.entry(new.symbol)
			.or_insert_with(|| OrderBook::new(new.symbol))
			.add_order(order, events);
	}

	fn process_cancel(&mut self, key: OrderKey, events: &mut Vec<Event>) {
		match self.routes.remove(&key) {
			Some(symbol) => match self.books.get_mut(&symbol) {
				Some(book) => book.cancel_order(key, events),
				None => events.push(Event::Cancelled {
					key,
					symbol: Some(symbol),
				}),
			},
			// Unknown key: the Cancel-Ack is still owed to the client. With
			// no book involved there is nothing to check for top-of-book
			// movement.
			None => events.push(Event::Cancelled { key, symbol: None }),
		}
	}

	fn process_flush(&mut self) {
		self.books.clear();
		self.routes.clear();
	}

	pub fn book(&self, symbol: Symbol) -> Option<&OrderBook> {
		self.books.get(&symbol)
	}

	pub fn book_count(&self) -> usize {
		self.books.len()
	}
}

impl Default for MatchingEngine {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::Side;

	fn sym(s: &str) -> Symbol {
		s.parse().unwrap()
	}

	fn new_order(
		user_id: u32,
		symbol: &str,
		price: u32,
		quantity: u32,
		side: Side,
		user_order_id: u32,
	) -> Request {
		Request::New(NewOrder {
			user_id,
			symbol: sym(symbol),
			price,
			quantity,
			side,
			user_order_id,
		})
	}

	fn run(engine: &mut MatchingEngine, request: Request) -> Vec<String> {
		let mut events = Vec::new();
		engine.process(request, &mut events);
		events.iter().map(|event| event.to_string()).collect()
	}

	#[test]
	fn test_cross_symbol_isolation() {
		let mut engine = MatchingEngine::new();
		run(&mut engine, new_order(1, "IBM", 100, 50, Side::Buy, 1));
		let events = run(&mut engine, new_order(2, "AAPL", 100, 50, Side::Sell, 2));

		// Same price, different symbols: no trade.
		assert_eq!(events, vec!["A, 2, 2, AAPL", "B, S, 100, 50, AAPL"]);
		assert_eq!(engine.book_count(), 2);
		assert_eq!(engine.book(sym("IBM")).unwrap().best_bid(), Some(100));
		assert_eq!(engine.book(sym("AAPL")).unwrap().best_ask(), Some(100));
	}

	#[test]
	fn test_cancel_routes_without_symbol() {
		let mut engine = MatchingEngine::new();
		run(&mut engine, new_order(1, "IBM", 100, 50, Side::Buy, 1));

		let events = run(
			&mut engine,
			Request::Cancel {
				user_id: 1,
				user_order_id: 1,
			},
		);
		assert_eq!(events, vec!["C, 1, 1, IBM", "B, B, -, -, IBM"]);
		assert!(engine.book(sym("IBM")).unwrap().is_empty());
	}

	#[test]
	fn test_cancel_unknown_order_still_acks() {
		let mut engine = MatchingEngine::new();
		let events = run(
			&mut engine,
			Request::Cancel {
				user_id: 9,
				user_order_id: 9,
			},
		);
		assert_eq!(events, vec!["C, 9, 9, -"]);
	}

	#[test]
	fn test_cancel_after_fill_acks_without_book_change() {
		let mut engine = MatchingEngine::new();
		run(&mut engine, new_order(1, "IBM", 100, 50, Side::Sell, 1));
		run(&mut engine, new_order(2, "IBM", 100, 50, Side::Buy, 2));

		// Order 1 fully traded; its route entry is still present, so the
		// cancel finds the book but not a resting order.
		let events = run(
			&mut engine,
			Request::Cancel {
				user_id: 1,
				user_order_id: 1,
			},
		);
		assert_eq!(events, vec!["C, 1, 1, IBM"]);
	}

	#[test]
	fn test_duplicate_resting_key_rejected() {
		let mut engine = MatchingEngine::new();
		run(&mut engine, new_order(1, "IBM", 100, 50, Side::Buy, 1));
		let events = run(&mut engine, new_order(1, "IBM", 101, 10, Side::Buy, 1));

		assert!(events.is_empty());
		assert_eq!(engine.book(sym("IBM")).unwrap().best_bid(), Some(100));
	}

	#[test]
	fn test_key_reusable_after_cancel() {
		let mut engine = MatchingEngine::new();
		run(&mut engine, new_order(1, "IBM", 100, 50, Side::Buy, 1));
		run(
			&mut engine,
			Request::Cancel {
				user_id: 1,
				user_order_id: 1,
			},
		);

		let events = run(&mut engine, new_order(1, "IBM", 101, 10, Side::Buy, 1));
		assert_eq!(events, vec!["A, 1, 1, IBM", "B, B, 101, 10, IBM"]);
	}

	#[test]
	fn test_flush_clears_all_state() {
		let mut engine = MatchingEngine::new();
		run(&mut engine, new_order(1, "IBM", 100, 50, Side::Buy, 1));
		run(&mut engine, new_order(2, "AAPL", 100, 50, Side::Sell, 2));

		assert!(run(&mut engine, Request::Flush).is_empty());
		assert_eq!(engine.book_count(), 0);

		// A fresh order after flush sees a clean book and a clean route map.
		let events = run(&mut engine, new_order(1, "IBM", 100, 50, Side::Buy, 3));
		assert_eq!(events, vec!["A, 1, 3, IBM", "B, B, 100, 50, IBM"]);

		let events = run(
			&mut engine,
			Request::Cancel {
				user_id: 2,
				user_order_id: 2,
			},
		);
		assert_eq!(events, vec!["C, 2, 2, -"]);
	}

	#[test]
	fn test_flush_twice_is_flush() {
		let mut engine = MatchingEngine::new();
		run(&mut engine, new_order(1, "IBM", 100, 50, Side::Buy, 1));
		run(&mut engine, Request::Flush);
		assert!(run(&mut engine, Request::Flush).is_empty());
		assert_eq!(engine.book_count(), 0);
	}
}
