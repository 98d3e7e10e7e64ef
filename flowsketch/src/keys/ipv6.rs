// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! IPv6 five-tuple flow key.
//!
//! 37 bytes of key material do not fit a 128-bit carrier, so this codec is
//! deliberately lossy: the four 64-bit address limbs are projected through
//! the ring and the carrier keeps the full first projection of each address
//! plus 12 bits of the second, while ports and protocol fold into the
//! fingerprint only. Counting behaviour (`insert`/`query`) is unaffected;
//! keys reported by heavy-flow enumeration are approximate reconstructions.

use crate::error::Error;
use crate::keys::SketchKey;
use crate::keys::MASK_26BITS;
use crate::keys::MI_MASK;
use crate::keys::ring_forward;
use crate::keys::ring_inverse;

/// An IPv6 five-tuple. Addresses are stored as two little-endian 64-bit
/// limbs each; 37 bytes of key material in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv6Flow {
    pub src_ip: [u64; 2],
    pub dst_ip: [u64; 2],
    pub src_port: u16,
    pub dst_port: u16,
    pub protocol: u8,
}

impl Ipv6Flow {
    /// Size of the key material in bytes.
    pub const SIZE: usize = 37;

    /// Serializes the flow into its 37-byte wire layout:
    /// `src_ip, dst_ip, src_port, dst_port, protocol`, all little-endian.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..8].copy_from_slice(&self.src_ip[0].to_le_bytes());
        bytes[8..16].copy_from_slice(&self.src_ip[1].to_le_bytes());
        bytes[16..24].copy_from_slice(&self.dst_ip[0].to_le_bytes());
        bytes[24..32].copy_from_slice(&self.dst_ip[1].to_le_bytes());
        bytes[32..34].copy_from_slice(&self.src_port.to_le_bytes());
        bytes[34..36].copy_from_slice(&self.dst_port.to_le_bytes());
        bytes[36] = self.protocol;
        bytes
    }

    /// Deserializes a flow from its 37-byte wire layout.
    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        let limb = |offset: usize| {
            u64::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
                bytes[offset + 4],
                bytes[offset + 5],
                bytes[offset + 6],
                bytes[offset + 7],
            ])
        };
        Self {
            src_ip: [limb(0), limb(8)],
            dst_ip: [limb(16), limb(24)],
            src_port: u16::from_le_bytes([bytes[32], bytes[33]]),
            dst_port: u16::from_le_bytes([bytes[34], bytes[35]]),
            protocol: bytes[36],
        }
    }
}

impl TryFrom<&[u8]> for Ipv6Flow {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != Self::SIZE {
            return Err(Error::invalid_key_length(Self::SIZE, bytes.len()));
        }
        let mut fixed = [0u8; Self::SIZE];
        fixed.copy_from_slice(bytes);
        Ok(Self::from_bytes(fixed))
    }
}

impl SketchKey for Ipv6Flow {
    fn divide(&self, num_buckets: u32) -> (u32, u16, u128) {
        let h1 = ring_forward(self.src_ip[0]);
        let h2 = ring_forward(self.src_ip[1]);
        let h3 = ring_forward(self.dst_ip[0]);
        let h4 = ring_forward(self.dst_ip[1]);

        // Ports and protocol share one projected limb.
        let h5 = ring_forward(
            (self.src_port as u64) << 24 | (self.dst_port as u64) << 8 | self.protocol as u64,
        );

        let temp = (h1 as u32 & MASK_26BITS)
            ^ (h2 >> 13) as u32
            ^ (h3 as u32 & MASK_26BITS)
            ^ (h4 >> 13) as u32
            ^ (h5 as u32 & MASK_26BITS);

        let bucket_idx = temp % num_buckets;
        let fingerprint = temp as u16;

        let word0 = (h1 & MI_MASK) | h2 << 52;
        let word1 = (h3 & MI_MASK) | h4 << 52;
        let left_part = word0 as u128 | (word1 as u128) << 64;
        (bucket_idx, fingerprint, left_part)
    }

    /// Rebuilds what the carrier holds: the first limb of each address is
    /// recovered in full 52-bit width, the second limb from its 12 carried
    /// bits. Ports and protocol are not recoverable: `dst_port` and
    /// `protocol` are filled from the fingerprint's two low bytes, and
    /// `src_port` is reported as zero.
    fn combine(_bucket_idx: u32, fingerprint: u16, left_part: u128) -> Self {
        let word0 = left_part as u64;
        let word1 = (left_part >> 64) as u64;
        Self {
            src_ip: [ring_inverse(word0 & MI_MASK), ring_inverse(word0 >> 52)],
            dst_ip: [ring_inverse(word1 & MI_MASK), ring_inverse(word1 >> 52)],
            src_port: 0,
            dst_port: fingerprint >> 8,
            protocol: fingerprint as u8,
        }
    }
}
