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

use crate::book::level::PriceLevel;
use crate::types::Side;

/// Price levels for one side, best first.
///
/// Stored as a sorted contiguous vector rather than a tree: at the typical
/// depth of 100-150 levels, binary search plus an occasional shift insert
/// beats pointer chasing. Bids sort descending, asks ascending, so index 0
/// is always the best price on either side. No two levels share a price.
#[derive(Debug)]
pub(crate) struct SideLadder {
	side: Side,
	levels: Vec<PriceLevel>,
}

impl SideLadder {
	pub fn new(side: Side) -> Self {
		Self {
			side,
			levels: Vec::new(),
		}
	}

	pub fn depth(&self) -> usize {
		self.levels.len()
	}

	pub fn best(&self) -> Option<&PriceLevel> {
		self.levels.first()
	}

	pub fn best_mut(&mut self) -> Option<&mut PriceLevel> {
		self.levels.first_mut()
	}

	pub fn remove_best(&mut self) {
		if !self.levels.is_empty() {
			self.levels.remove(0);
		}
	}

	/// Best price and its total resting quantity.
	pub fn top(&self) -> Option<(u32, u64)> {
		self.best().map(|level| (level.price(), level.total_quantity()))
	}

	/// Binary search in side order: `Ok` holds the level's position, `Err`
	/// the insertion point that keeps the ladder sorted.
	fn position(&self, price: u32) -> Result<usize, usize> {
		let side = self.side;
		self.levels.binary_search_by(|level| match side {
			Side::Buy => price.cmp(&level.price()),
			Side::Sell => level.price().cmp(&price),
		})
	}

	pub fn level_mut(&mut self, price: u32) -> Option<&mut PriceLevel> {
		match self.position(price) {
			Ok(index) => Some(&mut self.levels[index]),
			Err(_) => None,
		}
	}

	pub fn level(&self, price: u32) -> Option<&PriceLevel> {
		match self.position(price) {
			Ok(index) => Some(&self.levels[index]),
			Err(_) => None,
		}
	}

	pub fn get_or_insert(&mut self, price: u32) -> &mut PriceLevel {
		let index = match self.position(price) {
			Ok(index) => index,
			Err(index) => {
				self.levels.insert(index, PriceLevel::new(price));
				index
			}
		};
		&mut self.levels[index]
	}

	pub fn remove_level(&mut self, price: u32) {
		if let Ok(index) = self.position(price) {
			self.levels.remove(index);
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = &PriceLevel> {
		self.levels.iter()
	}
}
