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

//! IPv4 five-tuple flow key with a bit-exact reversible codec.

use crate::error::Error;
use crate::keys::SketchKey;
use crate::keys::MI_MASK;
use crate::keys::fold26;
use crate::keys::ring_forward;
use crate::keys::ring_inverse;

/// An IPv4 five-tuple: source/destination address, source/destination port
/// and transport protocol. 13 bytes of key material.
///
/// The codec interprets the key as two little-endian limbs, repacks them into
/// two 52-bit values and projects each through the multiplicative ring. The
/// full 104 bits of key material survive the projection, so reconstruction
/// from the sketch is bit-exact whenever the configured left-part width is at
/// least 104 bits. Narrower widths truncate the carrier and reconstruction
/// becomes approximate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Flow {
    pub src_ip: u32,
    pub dst_ip: u32,
    pub src_port: u16,
    pub dst_port: u16,
    pub protocol: u8,
}

impl Ipv4Flow {
    /// Size of the key material in bytes.
    pub const SIZE: usize = 13;

    /// Serializes the flow into its 13-byte wire layout:
    /// `src_ip, dst_ip, src_port, dst_port, protocol`, all little-endian.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.src_ip.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.dst_ip.to_le_bytes());
        bytes[8..10].copy_from_slice(&self.src_port.to_le_bytes());
        bytes[10..12].copy_from_slice(&self.dst_port.to_le_bytes());
        bytes[12] = self.protocol;
        bytes
    }

    /// Deserializes a flow from its 13-byte wire layout.
    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self {
            src_ip: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            dst_ip: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            src_port: u16::from_le_bytes([bytes[8], bytes[9]]),
            dst_port: u16::from_le_bytes([bytes[10], bytes[11]]),
            protocol: bytes[12],
        }
    }

    /// Packs the key material into two limbs: `k0` holds bytes 0-7 and `k1`
    /// holds bytes 8-12 with the high bits zero.
    #[inline]
    fn limbs(&self) -> (u64, u64) {
        let k0 = self.src_ip as u64 | (self.dst_ip as u64) << 32;
        let k1 =
            self.src_port as u64 | (self.dst_port as u64) << 16 | (self.protocol as u64) << 32;
        (k0, k1)
    }
}

impl TryFrom<&[u8]> for Ipv4Flow {
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

impl SketchKey for Ipv4Flow {
    fn divide(&self, num_buckets: u32) -> (u32, u16, u128) {
        let (k0, k1) = self.limbs();
        let h0 = ring_forward(k0);
        let h1 = ring_forward((k1 << 12) | (k0 >> 52));

        let temp = fold26(h0) ^ fold26(h1);
        let bucket_idx = temp % num_buckets;
        let fingerprint = ((temp >> 13) & 0xFFFF) as u16;
        let left_part = (h1 as u128) << 64 | h0 as u128;
        (bucket_idx, fingerprint, left_part)
    }

    fn combine(_bucket_idx: u32, fingerprint: u16, left_part: u128) -> Self {
        let h0 = left_part as u64 & MI_MASK;
        let h1 = (left_part >> 64) as u64 & MI_MASK;
        let h1 = repair_high_bits(h0, h1, fingerprint);

        let u = ring_inverse(h0);
        let v = ring_inverse(h1);
        let k0 = u | (v & 0xFFF) << 52;
        let k1 = v >> 12;
        Self {
            src_ip: k0 as u32,
            dst_ip: (k0 >> 32) as u32,
            src_port: k1 as u16,
            dst_port: (k1 >> 16) as u16,
            protocol: (k1 >> 32) as u8,
        }
    }
}

/// Recomputes bits 40-51 of `h1` from the fingerprint.
///
/// A 104-bit carrier holds all of `h0` but truncates the top 12 bits of
/// `h1`. Those bits also participate in the fingerprint fold
/// (`temp[j] = h0[j] ^ h0[j+26] ^ h1[j] ^ h1[j+26]` for the bits the
/// fingerprint covers), so each one can be recovered from the fingerprint,
/// `h0` and a stored low bit of `h1`. When the carrier arrives untruncated
/// the recomputation reproduces the bits it already holds.
fn repair_high_bits(h0: u64, h1: u64, fingerprint: u16) -> u64 {
    let fold0 = fold26(h0);
    let low = h1 & ((1 << 40) - 1);
    let mut high = 0u64;
    for j in 14..26 {
        let t = (fingerprint as u32 >> (j - 13)) & 1;
        let f = (fold0 >> j) & 1;
        let l = (low >> j) as u32 & 1;
        high |= ((t ^ f ^ l) as u64) << (j + 26);
    }
    low | high
}
