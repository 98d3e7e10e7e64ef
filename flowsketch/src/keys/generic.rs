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

//! Fallback codec for arbitrary fixed-width keys.
//!
//! Keys without a structure-aware codec are run through a SPECK-shaped
//! block cipher: `divide` encrypts the zero-padded 16-byte block and derives
//! the bucket index and fingerprint from the ciphertext, `combine` decrypts
//! it. Encryption is a bijection on the block, so reconstruction is
//! bit-exact — but the bucket index and fingerprint carry no independent
//! information, so the full 128-bit ciphertext must survive in the carrier.
//! Configure the sketch with a left-part width of 128 bits for exact
//! heavy-key recovery under this schema.

use crate::error::Error;
use crate::keys::SketchKey;

const SPECK_ROUNDS: usize = 34;
const SPECK_KEY: u64 = 0x0706_0504_0302_0100;

/// An opaque fixed-width key of `N` bytes, `N <= 16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenericKey<const N: usize> {
    data: [u8; N],
}

impl<const N: usize> GenericKey<N> {
    const FITS_BLOCK: () = assert!(N <= 16, "GenericKey is limited to 16 bytes");

    /// Wraps `N` bytes of key material.
    pub fn new(data: [u8; N]) -> Self {
        let () = Self::FITS_BLOCK;
        Self { data }
    }

    /// Returns the key material.
    pub fn bytes(&self) -> &[u8; N] {
        &self.data
    }

    /// Splits the zero-padded key into two little-endian cipher limbs.
    fn block(&self) -> (u64, u64) {
        let mut block = [0u8; 16];
        block[..N].copy_from_slice(&self.data);
        let limb = |offset: usize| {
            u64::from_le_bytes([
                block[offset],
                block[offset + 1],
                block[offset + 2],
                block[offset + 3],
                block[offset + 4],
                block[offset + 5],
                block[offset + 6],
                block[offset + 7],
            ])
        };
        (limb(0), limb(8))
    }
}

impl<const N: usize> TryFrom<&[u8]> for GenericKey<N> {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != N {
            return Err(Error::invalid_key_length(N, bytes.len()));
        }
        let mut fixed = [0u8; N];
        fixed.copy_from_slice(bytes);
        Ok(Self::new(fixed))
    }
}

impl<const N: usize> SketchKey for GenericKey<N> {
    fn divide(&self, num_buckets: u32) -> (u32, u16, u128) {
        let (x, y) = self.block();
        let (cx, cy) = encrypt(x, y);
        let bucket_idx = (cx % num_buckets as u64) as u32;
        let fingerprint = cy as u16;
        let left_part = (cy as u128) << 64 | cx as u128;
        (bucket_idx, fingerprint, left_part)
    }

    fn combine(_bucket_idx: u32, _fingerprint: u16, left_part: u128) -> Self {
        let (x, y) = decrypt(left_part as u64, (left_part >> 64) as u64);
        let mut block = [0u8; 16];
        block[..8].copy_from_slice(&x.to_le_bytes());
        block[8..].copy_from_slice(&y.to_le_bytes());
        let mut data = [0u8; N];
        data.copy_from_slice(&block[..N]);
        Self { data }
    }
}

fn encrypt(mut x: u64, mut y: u64) -> (u64, u64) {
    for _ in 0..SPECK_ROUNDS {
        x = x.rotate_right(8).wrapping_add(y) ^ SPECK_KEY;
        y = y.rotate_left(3) ^ x;
    }
    (x, y)
}

fn decrypt(mut x: u64, mut y: u64) -> (u64, u64) {
    for _ in 0..SPECK_ROUNDS {
        y = (y ^ x).rotate_right(3);
        x = (x ^ SPECK_KEY).wrapping_sub(y).rotate_left(8);
    }
    (x, y)
}
