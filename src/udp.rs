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

//! UDP order-entry socket.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use crate::pipeline::PacketSource;

/// How long a receive blocks before handing control back to the ingress
/// loop so it can observe its stop flag.
const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Datagram source backed by a bound UDP socket.
pub struct UdpSource {
	socket: UdpSocket,
}

impl UdpSource {
	pub fn bind(addr: SocketAddr) -> io::Result<Self> {
		let socket = UdpSocket::bind(addr)?;
		socket.set_read_timeout(Some(READ_TIMEOUT))?;
		Ok(Self { socket })
	}

	pub fn local_addr(&self) -> io::Result<SocketAddr> {
		self.socket.local_addr()
	}
}

impl PacketSource for UdpSource {
	fn recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
		match self.socket.recv_from(buf) {
			Ok((len, _peer)) => Ok(Some(len)),
			// Timeout surfaces as WouldBlock or TimedOut depending on the
			// platform; both just mean "nothing arrived".
			Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
				Ok(None)
			}
			Err(e) => Err(e),
		}
	}
}
