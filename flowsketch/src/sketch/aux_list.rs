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

//! Bit-packed auxiliary storage for heavy-cell left parts.
//!
//! Each heavy cell owns one slot of `L + 2` bits in a flat array of 64-bit
//! words: the low `L` bits hold the left part of the tracked key, the top 2
//! bits hold a saturating confirmation counter. Slot `s` belongs to bucket
//! `s / H`, heavy cell `s % H`. Light cells have no auxiliary storage.

/// Width of the confirmation counter in bits.
pub(crate) const EXTRA_BITS: u32 = 2;

/// Saturation value of the confirmation counter.
pub(crate) const EXTRA_MAX: u8 = (1 << EXTRA_BITS) - 1;

/// Returns a mask covering the low `bits` bits of a 128-bit value.
#[inline]
pub(crate) fn low_bits_mask(bits: u32) -> u128 {
    if bits >= 128 {
        u128::MAX
    } else {
        (1u128 << bits) - 1
    }
}

/// Flat bit-packed list of `(left_part, extra_counter)` slots.
///
/// Reads and writes walk the overlap between a slot's bit range and the
/// word array, moving `min(bits left in slot, bits left in source limb,
/// bits left in destination word)` bits per step. Writes clear the target
/// range before OR-masking the new bits in, so neighbouring slots are never
/// disturbed.
#[derive(Debug, Clone)]
pub(crate) struct AuxiliaryList {
    words: Box<[u64]>,
    left_part_bits: u32,
    slot_bits: u64,
}

impl AuxiliaryList {
    /// Creates a zeroed list of `num_slots` slots of `left_part_bits + 2`
    /// bits each.
    ///
    /// # Panics
    ///
    /// Panics if `left_part_bits` is zero or exceeds 128.
    pub fn new(num_slots: usize, left_part_bits: u32) -> Self {
        assert!(
            (1..=128).contains(&left_part_bits),
            "left_part_bits must be in [1, 128], got {left_part_bits}"
        );
        let slot_bits = left_part_bits as u64 + EXTRA_BITS as u64;
        let num_words = (num_slots as u64 * slot_bits).div_ceil(64) as usize;
        Self {
            words: vec![0u64; num_words].into_boxed_slice(),
            left_part_bits,
            slot_bits,
        }
    }

    /// Returns the mask covering a stored left part.
    #[inline]
    pub fn left_part_mask(&self) -> u128 {
        low_bits_mask(self.left_part_bits)
    }

    /// Reads a slot. A never-written slot reads as `(0, 0)`.
    pub fn read_slot(&self, slot: usize) -> (u128, u8) {
        let base = slot as u64 * self.slot_bits;
        let limbs = self.read_bits(base, self.left_part_bits);
        let left_part = limbs[0] as u128 | (limbs[1] as u128) << 64;
        let extra = self.read_bits(base + self.left_part_bits as u64, EXTRA_BITS)[0] as u8;
        (left_part, extra)
    }

    /// Writes the low `L` bits of a slot, preserving its extra counter.
    pub fn write_left_part(&mut self, slot: usize, left_part: u128) {
        let base = slot as u64 * self.slot_bits;
        let left_part = left_part & self.left_part_mask();
        self.write_bits(
            base,
            self.left_part_bits,
            [left_part as u64, (left_part >> 64) as u64],
        );
    }

    /// Writes the extra counter of a slot, preserving its left part.
    pub fn write_extra_counter(&mut self, slot: usize, value: u8) {
        debug_assert!(value <= EXTRA_MAX);
        let base = slot as u64 * self.slot_bits + self.left_part_bits as u64;
        self.write_bits(base, EXTRA_BITS, [(value & EXTRA_MAX) as u64, 0]);
    }

    pub fn memory_bytes(&self) -> usize {
        self.words.len() * 8
    }

    fn read_bits(&self, start: u64, num_bits: u32) -> [u64; 2] {
        let mut out = [0u64; 2];
        let mut bit_idx = start;
        let mut extracted = 0u32;
        while extracted < num_bits {
            let word_idx = (bit_idx / 64) as usize;
            let bit_in_word = (bit_idx % 64) as u32;
            let out_idx = (extracted / 64) as usize;
            let bit_in_out = extracted % 64;
            let take = (num_bits - extracted)
                .min(64 - bit_in_out)
                .min(64 - bit_in_word);
            let chunk = if take == 64 {
                self.words[word_idx]
            } else {
                (self.words[word_idx] >> bit_in_word) & ((1u64 << take) - 1)
            };
            out[out_idx] |= chunk << bit_in_out;
            bit_idx += take as u64;
            extracted += take;
        }
        out
    }

    fn write_bits(&mut self, start: u64, num_bits: u32, src: [u64; 2]) {
        let mut bit_idx = start;
        let mut written = 0u32;
        while written < num_bits {
            let word_idx = (bit_idx / 64) as usize;
            let bit_in_word = (bit_idx % 64) as u32;
            let src_idx = (written / 64) as usize;
            let bit_in_src = written % 64;
            let take = (num_bits - written)
                .min(64 - bit_in_src)
                .min(64 - bit_in_word);
            if take == 64 {
                self.words[word_idx] = src[src_idx];
            } else {
                let mask = (1u64 << take) - 1;
                let chunk = (src[src_idx] >> bit_in_src) & mask;
                self.words[word_idx] &= !(mask << bit_in_word);
                self.words[word_idx] |= chunk << bit_in_word;
            }
            bit_idx += take as u64;
            written += take;
        }
    }
}
