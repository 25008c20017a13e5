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

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Matching engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
	/// UDP order-entry bind address
	pub bind_addr: SocketAddr,
	/// Capacity of each inter-stage queue; must be a power of two
	pub queue_capacity: usize,
	/// Requests the matcher drains per batch
	pub batch_size: usize,
}

impl Default for MatchingConfig {
	fn default() -> Self {
		Self {
			bind_addr: "0.0.0.0:4000".parse().unwrap(),
			queue_capacity: 16384,
			batch_size: 32,
		}
	}
}

impl MatchingConfig {
	/// Load configuration from environment variables
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let base = Self::default();
		let cfg = config::Config::builder()
			.set_default("bind_addr", base.bind_addr.to_string())?
			.set_default("queue_capacity", base.queue_capacity as i64)?
			.set_default("batch_size", base.batch_size as i64)?
			.add_source(config::Environment::with_prefix("MATCHWIRE"))
			.build()?;

		let cfg: Self = cfg.try_deserialize()?;
		cfg.validate()?;
		Ok(cfg)
	}

	/// Load configuration from file, with environment overrides
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let base = Self::default();
		let cfg = config::Config::builder()
			.set_default("bind_addr", base.bind_addr.to_string())?
			.set_default("queue_capacity", base.queue_capacity as i64)?
			.set_default("batch_size", base.batch_size as i64)?
			.add_source(config::File::with_name(path))
			.add_source(config::Environment::with_prefix("MATCHWIRE"))
			.build()?;

		let cfg: Self = cfg.try_deserialize()?;
		cfg.validate()?;
		Ok(cfg)
	}

	fn validate(&self) -> Result<(), config::ConfigError> {
		if !self.queue_capacity.is_power_of_two() || self.queue_capacity < 2 {
			return Err(config::ConfigError::Message(format!(
				"queue_capacity must be a power of two >= 2, got {}",
				self.queue_capacity
			)));
		}
		if self.batch_size == 0 {
			return Err(config::ConfigError::Message(
				"batch_size must be greater than zero".to_string(),
			));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let cfg = MatchingConfig::default();
		assert_eq!(cfg.bind_addr.port(), 4000);
		assert_eq!(cfg.queue_capacity, 16384);
		assert_eq!(cfg.batch_size, 32);
		assert!(cfg.validate().is_ok());
	}

	#[test]
	fn test_validate_rejects_bad_capacity() {
		let cfg = MatchingConfig {
			queue_capacity: 1000,
			..MatchingConfig::default()
		};
		assert!(cfg.validate().is_err());

		let cfg = MatchingConfig {
			batch_size: 0,
			..MatchingConfig::default()
		};
		assert!(cfg.validate().is_err());
	}
}
