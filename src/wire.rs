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

//! CSV wire codec.
//!
//! Input records (one per line, `#` starts a comment):
//!
//! - `N, user_id, symbol, price, quantity, side, user_order_id`
//! - `C, user_id, user_order_id`
//! - `F`
//!
//! Output lines (single space after each comma, LF-terminated by the
//! egress writer):
//!
//! - `A, user_id, user_order_id, symbol`
//! - `T, buy_uid, buy_uoid, sell_uid, sell_uoid, price, quantity, symbol`
//! - `B, B|S, price, total_quantity, symbol` (or `-, -` when the side is empty)
//! - `C, user_id, user_order_id, symbol`

use std::fmt;

use thiserror::Error;

use crate::types::{Event, NewOrder, Request, Side, SymbolError};

/// Errors raised while parsing an input record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
	#[error("unknown record type `{0}`")]
	UnknownType(String),
	#[error("missing field `{0}`")]
	MissingField(&'static str),
	#[error("field `{0}` is not an unsigned integer")]
	InvalidNumber(&'static str),
	#[error("side must be `B` or `S`, got `{0}`")]
	InvalidSide(String),
	#[error("quantity must be greater than zero")]
	ZeroQuantity,
	#[error(transparent)]
	Symbol(#[from] SymbolError),
}

/// Parse one input record.
///
/// Returns `Ok(None)` for blank lines and comments; those are skipped
/// without logging. Surrounding whitespace (including a trailing CR from
/// CRLF payloads) is ignored, as is whitespace around individual fields.
pub fn parse_record(line: &str) -> Result<Option<Request>, ParseError> {
	let line = line.trim();
	if line.is_empty() || line.starts_with('#') {
		return Ok(None);
	}

	let mut fields = line.split(',').map(str::trim);
	let tag = fields.next().unwrap_or("");
	match tag {
		"N" => {
			let user_id = number(&mut fields, "user_id")?;
			let symbol = text(&mut fields, "symbol")?.parse()?;
			let price = number(&mut fields, "price")?;
			let quantity = number(&mut fields, "quantity")?;
			if quantity == 0 {
				return Err(ParseError::ZeroQuantity);
			}
			let side = side(&mut fields)?;
			let user_order_id = number(&mut fields, "user_order_id")?;
			Ok(Some(Request::New(NewOrder {
				user_id,
				symbol,
				price,
				quantity,
				side,
				user_order_id,
			})))
		}
		"C" => {
			let user_id = number(&mut fields, "user_id")?;
			let user_order_id = number(&mut fields, "user_order_id")?;
			Ok(Some(Request::Cancel {
				user_id,
				user_order_id,
			}))
		}
		"F" => Ok(Some(Request::Flush)),
		other => Err(ParseError::UnknownType(other.to_string())),
	}
}

fn text<'a>(
	fields: &mut impl Iterator<Item = &'a str>,
	name: &'static str,
) -> Result<&'a str, ParseError> {
	match fields.next() {
		Some(value) if !value.is_empty() => Ok(value),
		_ => Err(ParseError::MissingField(name)),
	}
}

fn number<'a>(
	fields: &mut impl Iterator<Item = &'a str>,
	name: &'static str,
) -> Result<u32, ParseError> {
	text(fields, name)?
		.parse()
		.map_err(|_| ParseError::InvalidNumber(name))
}

fn side<'a>(fields: &mut impl Iterator<Item = &'a str>) -> Result<Side, ParseError> {
	match text(fields, "side")? {
		"B" => Ok(Side::Buy),
		"S" => Ok(Side::Sell),
		other => Err(ParseError::InvalidSide(other.to_string())),
	}
}

impl fmt::Display for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Event::Acknowledged { key, symbol } => {
				write!(f, "A, {}, {}, {}", key.user_id, key.user_order_id, symbol)
			}
			Event::Traded {
				buy,
				sell,
				price,
				quantity,
				symbol,
			} => write!(
				f,
				"T, {}, {}, {}, {}, {}, {}, {}",
				buy.user_id,
				buy.user_order_id,
				sell.user_id,
				sell.user_order_id,
				price,
				quantity,
				symbol
			),
			Event::TopOfBook {
				side,
				level: Some(level),
				symbol,
			} => write!(f, "B, {}, {}, {}, {}", side, level.price, level.quantity, symbol),
			Event::TopOfBook {
				side,
				level: None,
				symbol,
			} => write!(f, "B, {}, -, -, {}", side, symbol),
			Event::Cancelled { key, symbol } => {
				write!(f, "C, {}, {}, ", key.user_id, key.user_order_id)?;
				match symbol {
					Some(symbol) => write!(f, "{}", symbol),
					None => f.write_str("-"),
				}
			}
		}
	}
}
