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

//! Sketch core: construction, insertion, query and heavy-flow enumeration.

use std::marker::PhantomData;

use rand::Rng;
use rand::RngCore;
use rand::SeedableRng;
use rand::rngs::OsRng;
use rand::rngs::StdRng;

use crate::keys::SketchKey;
use crate::sketch::aux_list::AuxiliaryList;
use crate::sketch::aux_list::EXTRA_MAX;
use crate::sketch::aux_list::low_bits_mask;
use crate::sketch::cell::Cell;
use crate::sketch::cell::CellArray;

/// Counter value at which heavy-cell identity confirmation starts.
const CONFIRM_THRESHOLD: u32 = 512;

/// Number of carrier bytes compared during identity confirmation.
const COM_BYTES: u32 = 10;

/// Dimensions of a sketch: bucket count, carrier width and the heavy/light
/// split of each bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SketchConfig {
    /// Number of buckets. A power of two is recommended but not required.
    pub num_buckets: u32,
    /// Bits of left-part carrier stored per heavy cell, at most 128.
    pub left_part_bits: u32,
    /// Heavy cells per bucket. Heavy cells pair with auxiliary slots and are
    /// the cells reported by heavy-flow enumeration.
    pub heavy_cells: u32,
    /// Light cells per bucket. Light cells count but carry no auxiliary
    /// slot, so their keys cannot be reconstructed.
    pub light_cells: u32,
}

impl SketchConfig {
    /// Roughly 16 KiB of tracking state for network flows.
    pub fn small() -> Self {
        Self {
            num_buckets: 1024,
            left_part_bits: 79,
            heavy_cells: 8,
            light_cells: 8,
        }
    }

    /// Roughly 128 KiB of tracking state for network flows.
    pub fn medium() -> Self {
        Self {
            num_buckets: 4096,
            left_part_bits: 79,
            heavy_cells: 16,
            light_cells: 16,
        }
    }

    /// Roughly 1 MiB of tracking state for network flows.
    pub fn large() -> Self {
        Self {
            num_buckets: 16384,
            left_part_bits: 79,
            heavy_cells: 32,
            light_cells: 32,
        }
    }

    /// Word-counting configuration; the 104-bit carrier holds a full
    /// [`crate::CompactStringKey`] or IPv4 flow.
    pub fn word_count() -> Self {
        Self {
            num_buckets: 1024,
            left_part_bits: 104,
            heavy_cells: 8,
            light_cells: 8,
        }
    }

    /// Larger word-counting configuration.
    pub fn large_word_count() -> Self {
        Self {
            num_buckets: 4096,
            left_part_bits: 104,
            heavy_cells: 16,
            light_cells: 16,
        }
    }
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self::small()
    }
}

/// Builder for [`Sketch`].
///
/// # Examples
///
/// ```
/// # use flowsketch::Ipv4Flow;
/// # use flowsketch::Sketch;
/// let sketch = Sketch::<Ipv4Flow>::builder()
///     .num_buckets(2048)
///     .left_part_bits(104)
///     .seed(42)
///     .build();
/// assert_eq!(sketch.num_buckets(), 2048);
/// ```
#[derive(Debug, Clone)]
pub struct SketchBuilder<K> {
    config: SketchConfig,
    seed: Option<u64>,
    _key: PhantomData<K>,
}

impl<K> Default for SketchBuilder<K> {
    fn default() -> Self {
        Self {
            config: SketchConfig::default(),
            seed: None,
            _key: PhantomData,
        }
    }
}

impl<K: SketchKey> SketchBuilder<K> {
    /// Replaces the whole configuration.
    pub fn config(mut self, config: SketchConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the number of buckets.
    pub fn num_buckets(mut self, num_buckets: u32) -> Self {
        self.config.num_buckets = num_buckets;
        self
    }

    /// Sets the per-slot carrier width in bits.
    pub fn left_part_bits(mut self, left_part_bits: u32) -> Self {
        self.config.left_part_bits = left_part_bits;
        self
    }

    /// Sets the number of heavy cells per bucket.
    pub fn heavy_cells(mut self, heavy_cells: u32) -> Self {
        self.config.heavy_cells = heavy_cells;
        self
    }

    /// Sets the number of light cells per bucket.
    pub fn light_cells(mut self, light_cells: u32) -> Self {
        self.config.light_cells = light_cells;
        self
    }

    /// Seeds the sketch PRNG. Sketches with the same seed and input stream
    /// behave identically; unseeded sketches draw a seed from OS entropy.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the sketch.
    ///
    /// # Panics
    ///
    /// Panics if the configuration has no buckets, no heavy cells, or a
    /// carrier width outside `[1, 128]`.
    pub fn build(self) -> Sketch<K> {
        let config = self.config;
        assert!(config.num_buckets >= 1, "num_buckets must be at least 1");
        assert!(config.heavy_cells >= 1, "heavy_cells must be at least 1");
        assert!(
            (1..=128).contains(&config.left_part_bits),
            "left_part_bits must be in [1, 128], got {}",
            config.left_part_bits
        );
        let cells_per_bucket = (config.heavy_cells + config.light_cells) as usize;
        let num_slots = config.num_buckets as usize * config.heavy_cells as usize;
        let com_mask = low_bits_mask((8 * COM_BYTES).min(config.left_part_bits));
        let seed = self.seed.unwrap_or_else(|| OsRng.next_u64());
        Sketch {
            config,
            cells: CellArray::new(config.num_buckets as usize, cells_per_bucket),
            aux: AuxiliaryList::new(num_slots, config.left_part_bits),
            rng: StdRng::seed_from_u64(seed),
            seed,
            com_mask,
            total_items: 0,
            _key: PhantomData,
        }
    }
}

/// A key reconstructed from a heavy cell, with its counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeavyFlow<K> {
    key: K,
    count: u32,
}

impl<K> HeavyFlow<K> {
    /// Returns the reconstructed key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Returns the counter of the cell tracking this key.
    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Probabilistic frequency sketch with reconstructible heavy keys.
///
/// See [`crate::sketch`] for an overview of the data layout and the
/// insertion policy.
#[derive(Debug, Clone)]
pub struct Sketch<K: SketchKey> {
    config: SketchConfig,
    cells: CellArray,
    aux: AuxiliaryList,
    rng: StdRng,
    seed: u64,
    com_mask: u128,
    total_items: u64,
    _key: PhantomData<K>,
}

impl<K: SketchKey> Sketch<K> {
    /// Creates a builder with the default (small) configuration.
    pub fn builder() -> SketchBuilder<K> {
        SketchBuilder::default()
    }

    /// Creates a sketch with the given configuration and an entropy-drawn
    /// seed.
    pub fn new(config: SketchConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Returns the number of buckets.
    pub fn num_buckets(&self) -> u32 {
        self.config.num_buckets
    }

    /// Returns the number of heavy cells per bucket.
    pub fn heavy_cells(&self) -> u32 {
        self.config.heavy_cells
    }

    /// Returns the number of light cells per bucket.
    pub fn light_cells(&self) -> u32 {
        self.config.light_cells
    }

    /// Returns the per-slot carrier width in bits.
    pub fn left_part_bits(&self) -> u32 {
        self.config.left_part_bits
    }

    /// Returns the PRNG seed the sketch was built with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the number of keys inserted so far.
    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    /// Returns true if nothing has been inserted.
    pub fn is_empty(&self) -> bool {
        self.total_items == 0
    }

    /// Returns the fixed memory footprint of the cell matrix and the
    /// auxiliary list in bytes. No further allocation happens after
    /// construction.
    pub fn memory_bytes(&self) -> usize {
        self.cells.memory_bytes() + self.aux.memory_bytes()
    }

    /// Records one occurrence of `key`.
    pub fn insert(&mut self, key: K) {
        let (bucket_idx, fingerprint, left_part) = key.divide(self.config.num_buckets);
        let bucket = bucket_idx as usize;
        let heavy = self.config.heavy_cells as usize;
        let total = heavy + self.config.light_cells as usize;
        self.total_items += 1;

        let mut matched: Option<(usize, u32)> = None;
        let mut min_heavy_idx = 0usize;
        let mut min_heavy_fp = 0u16;
        let mut min_heavy_counter = u32::MAX;

        for i in 0..heavy {
            let cell = self.cells.get(bucket, i);
            if cell.is_empty() {
                self.cells.set(
                    bucket,
                    i,
                    Cell {
                        fingerprint,
                        counter: 1,
                    },
                );
                let slot = self.slot(bucket, i);
                self.aux.write_left_part(slot, left_part);
                return;
            }
            if cell.fingerprint == fingerprint {
                matched = Some((i, cell.counter));
                break;
            }
            if cell.counter < min_heavy_counter {
                min_heavy_idx = i;
                min_heavy_fp = cell.fingerprint;
                min_heavy_counter = cell.counter;
            }
        }

        let mut min_idx = min_heavy_idx;
        let mut min_counter = min_heavy_counter;

        if matched.is_none() {
            for i in heavy..total {
                let cell = self.cells.get(bucket, i);
                if cell.is_empty() {
                    self.cells.set(
                        bucket,
                        i,
                        Cell {
                            fingerprint,
                            counter: 1,
                        },
                    );
                    return;
                }
                if cell.fingerprint == fingerprint {
                    matched = Some((i, cell.counter));
                    break;
                }
                if cell.counter < min_counter {
                    min_idx = i;
                    min_counter = cell.counter;
                }
            }
        }

        let Some((matched_idx, matched_counter)) = matched else {
            // Reservoir-style identity replacement at the smallest cell: the
            // counter is preserved, only the tracked identity changes.
            if self.rng.gen_range(0..min_counter) == 0 {
                let mut cell = self.cells.get(bucket, min_idx);
                cell.fingerprint = fingerprint;
                self.cells.set(bucket, min_idx, cell);
                if min_idx < heavy {
                    let slot = self.slot(bucket, min_idx);
                    self.aux.write_left_part(slot, left_part);
                    self.aux.write_extra_counter(slot, 0);
                }
            }
            return;
        };

        // Light-to-heavy promotion: a light key that caught up with the
        // smallest heavy cell swaps places with it.
        if matched_idx >= heavy && matched_counter >= min_heavy_counter {
            self.cells.set(
                bucket,
                matched_idx,
                Cell {
                    fingerprint: min_heavy_fp,
                    counter: min_heavy_counter,
                },
            );
            self.cells.set(
                bucket,
                min_heavy_idx,
                Cell {
                    fingerprint,
                    counter: matched_counter.saturating_add(1),
                },
            );
            let slot = self.slot(bucket, min_heavy_idx);
            self.aux.write_left_part(slot, left_part);
            self.aux.write_extra_counter(slot, 0);
            return;
        }

        let new_counter = matched_counter.saturating_add(1);
        let mut cell = self.cells.get(bucket, matched_idx);
        cell.counter = new_counter;
        self.cells.set(bucket, matched_idx, cell);

        // Sub-sampled confirmation that the auxiliary slot still describes
        // the key feeding this cell. Sustained disagreement drains the
        // confirmation counter and eventually rewrites the stored identity.
        if matched_idx < heavy
            && (new_counter == CONFIRM_THRESHOLD
                || (new_counter > CONFIRM_THRESHOLD
                    && self.rng.gen_range(0..CONFIRM_THRESHOLD) == 0))
        {
            let slot = self.slot(bucket, matched_idx);
            let (stored, extra) = self.aux.read_slot(slot);
            if stored & self.com_mask != left_part & self.com_mask {
                if extra > 0 {
                    self.aux.write_extra_counter(slot, extra - 1);
                } else {
                    self.aux.write_left_part(slot, left_part);
                }
            } else if extra < EXTRA_MAX {
                self.aux.write_extra_counter(slot, extra + 1);
            }
        }
    }

    /// Returns the estimated occurrence count of `key`, or 0 if the key is
    /// not tracked.
    ///
    /// A heavy cell only answers for a key whose carrier prefix matches its
    /// auxiliary slot; its counter is scaled by the confirmation factor
    /// `extra_counter + 1`.
    pub fn query(&self, key: K) -> u32 {
        let (bucket_idx, fingerprint, left_part) = key.divide(self.config.num_buckets);
        let bucket = bucket_idx as usize;
        let heavy = self.config.heavy_cells as usize;
        let total = heavy + self.config.light_cells as usize;

        for i in 0..heavy {
            let cell = self.cells.get(bucket, i);
            if cell.is_empty() || cell.fingerprint != fingerprint {
                continue;
            }
            let (stored, extra) = self.aux.read_slot(self.slot(bucket, i));
            if stored & self.com_mask == left_part & self.com_mask {
                return cell.counter.saturating_mul(extra as u32 + 1);
            }
        }

        for i in heavy..total {
            let cell = self.cells.get(bucket, i);
            if !cell.is_empty() && cell.fingerprint == fingerprint {
                return cell.counter;
            }
        }

        0
    }

    /// Reconstructs every key currently held in a heavy cell, with its
    /// counter, sorted by counter descending.
    ///
    /// Light cells are not reported: without an auxiliary slot their keys
    /// cannot be rebuilt.
    pub fn heavy_flows(&self) -> Vec<HeavyFlow<K>> {
        let heavy = self.config.heavy_cells as usize;
        let mut flows = Vec::new();
        for bucket in 0..self.config.num_buckets as usize {
            for i in 0..heavy {
                let cell = self.cells.get(bucket, i);
                if cell.is_empty() {
                    continue;
                }
                let (stored, _) = self.aux.read_slot(self.slot(bucket, i));
                flows.push(HeavyFlow {
                    key: K::combine(bucket as u32, cell.fingerprint, stored),
                    count: cell.counter,
                });
            }
        }
        flows.sort_by(|a, b| b.count.cmp(&a.count));
        flows
    }

    #[inline]
    fn slot(&self, bucket: usize, cell: usize) -> usize {
        bucket * self.config.heavy_cells as usize + cell
    }
}
