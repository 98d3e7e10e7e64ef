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

//! Frequency sketch with reconstructible heavy keys.
//!
//! # Overview
//!
//! The sketch tracks approximate occurrence counts for keys in an unbounded
//! stream using fixed memory, and can enumerate its current heavy keys
//! *without ever storing the keys*: a reversible codec splits each key into
//! a bucket index, a 16-bit fingerprint and a left-part carrier, and the
//! carrier of each heavy key is kept in a bit-packed auxiliary list so the
//! key can be rebuilt at report time.
//!
//! Each of the `B` buckets holds `H` **heavy** cells followed by `Lc`
//! **light** cells; every cell is a `(fingerprint, counter)` pair. Only
//! heavy cells own an auxiliary slot of `L + 2` bits: `L` bits of carrier
//! plus a 2-bit saturating confirmation counter.
//!
//! Insertion first scans the bucket for an empty cell or a fingerprint
//! match. A matched light key that has caught up with the smallest heavy
//! counter is promoted into the heavy zone by swapping cells. A key that
//! matches nothing replaces the identity of the bucket's smallest cell with
//! probability `1 / smallest_counter`, preserving the counter — a
//! reservoir-style eviction that needs no global event count. Once a heavy
//! counter passes 512, the cell's identity is re-checked against the stored
//! carrier on a 1-in-512 subsample, nudging the confirmation counter up on
//! agreement and draining it (eventually rewriting the carrier) under
//! sustained disagreement.
//!
//! # Accuracy
//!
//! Counts are estimates: fingerprint collisions inflate them, eviction races
//! deflate rarely-seen keys, and the confirmation factor scales a confirmed
//! heavy cell's answer by up to 4x. There is no hard error bound; accuracy
//! is empirical and tuned by `B`, `H`, `Lc` and `L`. Keys tracked
//! continuously are never under-counted.
//!
//! # Memory
//!
//! Memory is fixed at construction: `B * (H + Lc)` cells plus
//! `ceil(B * H * (L + 2) / 64)` words of auxiliary storage. `insert` and
//! `query` allocate nothing.
//!
//! # Concurrency
//!
//! A sketch is a single-writer structure. `insert`, `query` and
//! `heavy_flows` never block or suspend; read-only concurrent queries are
//! safe only while no writer is active.
//!
//! # Examples
//!
//! ```
//! # use flowsketch::CompactStringKey;
//! # use flowsketch::Sketch;
//! # use flowsketch::SketchConfig;
//! let mut sketch = Sketch::<CompactStringKey>::new(SketchConfig::word_count());
//! for _ in 0..600 {
//!     sketch.insert(CompactStringKey::from("hello"));
//! }
//! sketch.insert(CompactStringKey::from("world"));
//!
//! assert!(sketch.query(CompactStringKey::from("hello")) >= 600);
//! let flows = sketch.heavy_flows();
//! assert_eq!(flows[0].key().to_string(), "hello");
//! ```

mod aux_list;
mod cell;
mod sketch;

pub use self::sketch::HeavyFlow;
pub use self::sketch::Sketch;
pub use self::sketch::SketchBuilder;
pub use self::sketch::SketchConfig;
