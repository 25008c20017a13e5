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

//! matchwire
//!
//! A multi-symbol limit order matching engine. CSV order-entry records
//! arrive over a UDP socket, a single-threaded matcher applies price-time
//! priority per symbol, and acknowledgements, trades and top-of-book
//! updates stream out as CSV lines in real time.
//!
//! Architecture:
//! - Three pipeline stages on dedicated threads: ingress parser, matcher,
//!   egress formatter
//! - Two bounded lock-free SPSC rings linking the stages
//! - Single-threaded matching core for deterministic, totally ordered
//!   output per symbol
//! - Sorted flat ladders with an intrusive-list order arena for O(1)
//!   cancellation

pub mod book;
pub mod config;
pub mod engine;
pub mod logging;
pub mod pipeline;
pub mod queue;
pub mod types;
pub mod udp;
pub mod wire;

pub use book::OrderBook;
pub use config::MatchingConfig;
pub use engine::MatchingEngine;
pub use pipeline::{PacketSource, Pipeline, PipelineReport};
pub use types::{
	Event, NewOrder, Order, OrderKey, OrderKind, Request, Side, Symbol, SymbolError, TopLevel,
};
pub use wire::{ParseError, parse_record};
