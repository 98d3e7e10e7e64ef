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

//! Probabilistic frequency sketch for identifying heavy hitters in keyed
//! event streams — IP flows, words, arbitrary fixed-size records.
//!
//! A sketch of a few tens of KiB estimates per-key occurrence counts across
//! tens of millions of events, and can enumerate its top keys without ever
//! storing them: keys travel through a reversible codec and heavy keys are
//! rebuilt from the sketch at report time. See [`sketch`] for the data
//! layout and [`keys`] for the codec contract.
//!
//! # Examples
//!
//! ```
//! use flowsketch::Ipv4Flow;
//! use flowsketch::Sketch;
//! use flowsketch::SketchConfig;
//!
//! let mut sketch = Sketch::<Ipv4Flow>::new(SketchConfig::word_count());
//! let flow = Ipv4Flow {
//!     src_ip: 0xC0A8_0001,
//!     dst_ip: 0x0808_0808,
//!     src_port: 53124,
//!     dst_port: 53,
//!     protocol: 17,
//! };
//! for _ in 0..1000 {
//!     sketch.insert(flow);
//! }
//!
//! assert!(sketch.query(flow) >= 1000);
//! assert_eq!(*sketch.heavy_flows()[0].key(), flow);
//! ```

mod error;
pub mod keys;
pub mod sketch;

pub use self::error::Error;
pub use self::keys::CompactStringKey;
pub use self::keys::GenericKey;
pub use self::keys::Ipv4Flow;
pub use self::keys::Ipv6Flow;
pub use self::keys::SketchKey;
pub use self::sketch::HeavyFlow;
pub use self::sketch::Sketch;
pub use self::sketch::SketchBuilder;
pub use self::sketch::SketchConfig;
