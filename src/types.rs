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

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Order book side.
///
/// `#[repr(u8)]` keeps the discriminant at one byte and lets the book index
/// per-side state by casting to 0 (Buy) or 1 (Sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
	Buy = 0,
	Sell = 1,
}

impl Side {
	pub fn opposite(self) -> Self {
		match self {
			Side::Buy => Side::Sell,
			Side::Sell => Side::Buy,
		}
	}

	pub(crate) fn index(self) -> usize {
		self as usize
	}
}

impl fmt::Display for Side {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Side::Buy => f.write_str("B"),
			Side::Sell => f.write_str("S"),
		}
	}
}

/// Order kind. Market orders carry price 0 on the wire and never rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
	Limit,
	Market,
}

/// Maximum symbol length in bytes.
pub const MAX_SYMBOL_LEN: usize = 16;

/// Instrument symbol stored inline.
///
/// Symbols are short ASCII tokens; storing them in a fixed buffer avoids a
/// heap allocation per order and makes the type `Copy`, so orders and events
/// can carry it by value.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol {
	len: u8,
	bytes: [u8; MAX_SYMBOL_LEN],
}

/// Errors raised when constructing a [`Symbol`] from an input field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
	#[error("symbol is empty")]
	Empty,
	#[error("symbol exceeds {MAX_SYMBOL_LEN} bytes")]
	TooLong,
	#[error("symbol contains non-ASCII bytes")]
	NotAscii,
}

impl Symbol {
	pub fn as_str(&self) -> &str {
		// Construction rejects non-ASCII input, so the stored bytes are
		// always valid UTF-8.
		unsafe { std::str::from_utf8_unchecked(&self.bytes[..self.len as usize]) }
	}

	pub fn len(&self) -> usize {
		self.len as usize
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}
}

impl FromStr for Symbol {
	type Err = SymbolError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Err(SymbolError::Empty);
		}
		if s.len() > MAX_SYMBOL_LEN {
			return Err(SymbolError::TooLong);
		}
		if !s.is_ascii() {
			return Err(SymbolError::NotAscii);
		}
		let mut bytes = [0u8; MAX_SYMBOL_LEN];
		bytes[..s.len()].copy_from_slice(s.as_bytes());
		Ok(Self {
			len: s.len() as u8,
			bytes,
		})
	}
}

impl fmt::Display for Symbol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl fmt::Debug for Symbol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Symbol({})", self.as_str())
	}
}

/// Participant key identifying an order: `(user_id, user_order_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderKey {
	pub user_id: u32,
	pub user_order_id: u32,
}

impl OrderKey {
	pub fn new(user_id: u32, user_order_id: u32) -> Self {
		Self {
			user_id,
			user_order_id,
		}
	}
}

/// An order inside the matching engine.
///
/// `remaining` is decremented by fills until it reaches zero (terminal) or
/// the order is cancelled. A limit order with residual quantity after
/// matching rests in the book; market residuals are discarded.
#[derive(Debug, Clone)]
pub struct Order {
	pub key: OrderKey,
	pub symbol: Symbol,
	/// Limit price; 0 for market orders.
	pub price: u32,
	/// Original quantity.
	pub quantity: u32,
	/// Unfilled quantity.
	pub remaining: u32,
	pub side: Side,
	pub kind: OrderKind,
	/// Monotonic arrival number assigned by the matcher. Ties at a price are
	/// broken by arrival, never by wall-clock time.
	pub sequence: u64,
}

impl Order {
	pub fn is_filled(&self) -> bool {
		self.remaining == 0
	}
}

/// New-order request as parsed off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
	pub user_id: u32,
	pub symbol: Symbol,
	pub price: u32,
	pub quantity: u32,
	pub side: Side,
	pub user_order_id: u32,
}

impl NewOrder {
	pub fn key(&self) -> OrderKey {
		OrderKey::new(self.user_id, self.user_order_id)
	}

	pub fn kind(&self) -> OrderKind {
		if self.price == 0 {
			OrderKind::Market
		} else {
			OrderKind::Limit
		}
	}
}

/// Order-entry request. Closed set: the wire protocol has exactly these
/// three record types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
	New(NewOrder),
	Cancel { user_id: u32, user_order_id: u32 },
	Flush,
}

/// Best price and total resting quantity on one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopLevel {
	pub price: u32,
	pub quantity: u64,
}

/// Response event emitted by the matching engine.
///
/// Events for one request are appended in a fixed order: acknowledgement,
/// trades (best level first, FIFO within a level), then top-of-book changes
/// (Buy before Sell).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
	/// New order accepted.
	Acknowledged { key: OrderKey, symbol: Symbol },
	/// Aggressor matched a resting order. The price is the resting order's
	/// level price, market aggressors included.
	Traded {
		buy: OrderKey,
		sell: OrderKey,
		price: u32,
		quantity: u32,
		symbol: Symbol,
	},
	/// Top of book changed on one side; `None` means the side emptied.
	TopOfBook {
		side: Side,
		level: Option<TopLevel>,
		symbol: Symbol,
	},
	/// Cancel acknowledged. Emitted for every cancel request, including
	/// cancels of unknown orders, where no symbol is known.
	Cancelled {
		key: OrderKey,
		symbol: Option<Symbol>,
	},
}
