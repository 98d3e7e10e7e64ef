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

use flowsketch::CompactStringKey;
use flowsketch::GenericKey;
use flowsketch::Ipv4Flow;
use flowsketch::Ipv6Flow;
use flowsketch::Sketch;
use flowsketch::SketchConfig;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn test_flow() -> Ipv4Flow {
    Ipv4Flow {
        src_ip: 0x1234_5678,
        dst_ip: 0x8765_4321,
        src_port: 80,
        dst_port: 443,
        protocol: 6,
    }
}

fn random_flow(rng: &mut StdRng) -> Ipv4Flow {
    Ipv4Flow {
        src_ip: rng.gen(),
        dst_ip: rng.gen(),
        src_port: rng.gen(),
        dst_port: rng.gen(),
        protocol: rng.gen(),
    }
}

#[test]
fn fresh_sketch_answers_zero() {
    let sketch = Sketch::<Ipv4Flow>::new(SketchConfig::small());
    let mut rng = StdRng::seed_from_u64(5);
    assert_eq!(sketch.query(test_flow()), 0);
    for _ in 0..100 {
        assert_eq!(sketch.query(random_flow(&mut rng)), 0);
    }
    assert!(sketch.heavy_flows().is_empty());
}

#[test]
fn single_flow_is_counted_and_reconstructed() {
    let mut sketch = Sketch::<Ipv4Flow>::builder()
        .config(SketchConfig::word_count())
        .seed(1)
        .build();
    let flow = test_flow();
    for _ in 0..1000 {
        sketch.insert(flow);
    }

    assert!(sketch.query(flow) >= 1000);

    let flows = sketch.heavy_flows();
    assert_eq!(flows.len(), 1);
    assert_eq!(*flows[0].key(), flow);
    assert!(flows[0].count() >= 1000);
}

#[test]
fn missing_flow_answers_zero() {
    let mut sketch = Sketch::<Ipv4Flow>::new(SketchConfig::small());
    sketch.insert(test_flow());

    let unrelated = Ipv4Flow {
        src_ip: 0x0101_0101,
        dst_ip: 0x0202_0202,
        src_port: 1,
        dst_port: 2,
        protocol: 17,
    };
    assert_eq!(sketch.query(unrelated), 0);
}

#[test]
fn heavy_flow_survives_noise() {
    let mut sketch = Sketch::<Ipv4Flow>::builder()
        .config(SketchConfig::word_count())
        .seed(2)
        .build();
    let heavy = test_flow();
    let mut rng = StdRng::seed_from_u64(2);

    for _ in 0..10_000 {
        sketch.insert(heavy);
        sketch.insert(random_flow(&mut rng));
    }

    assert!(sketch.query(heavy) >= 9_500);

    let flows = sketch.heavy_flows();
    assert_eq!(*flows[0].key(), heavy);
    assert!(flows[0].count() >= 9_500);
}

#[test]
fn word_counting_reconstructs_the_word() {
    let mut sketch = Sketch::<CompactStringKey>::builder()
        .config(SketchConfig::word_count())
        .seed(3)
        .build();
    for _ in 0..100 {
        sketch.insert(CompactStringKey::from("hello"));
    }

    assert!(sketch.query(CompactStringKey::from("hello")) >= 100);

    let flows = sketch.heavy_flows();
    assert_eq!(flows[0].key().to_string(), "hello");
}

#[test]
fn reported_count_is_monotonic_and_never_undercounts() {
    let mut sketch = Sketch::<Ipv4Flow>::builder()
        .config(SketchConfig::word_count())
        .seed(4)
        .build();
    let flow = test_flow();

    let mut previous = 0;
    for n in 1..=2000u32 {
        sketch.insert(flow);
        let reported = sketch.query(flow);
        assert!(reported >= n, "reported {reported} after {n} insertions");
        assert!(reported >= previous, "count regressed at {n}");
        previous = reported;
    }
}

#[test]
fn heavy_key_is_recovered_after_confirmation_threshold() {
    let mut sketch = Sketch::<Ipv4Flow>::builder()
        .config(SketchConfig::word_count())
        .seed(5)
        .build();
    let flow = test_flow();
    for _ in 0..512 {
        sketch.insert(flow);
    }

    let flows = sketch.heavy_flows();
    assert!(flows.iter().any(|f| *f.key() == flow && f.count() >= 512));
}

#[test]
fn reservoir_replacement_keeps_the_cell_occupied() {
    // One bucket with a single heavy cell and no light cells: every
    // non-matching insertion gambles for the cell's identity.
    let mut sketch = Sketch::<Ipv4Flow>::builder()
        .num_buckets(1)
        .left_part_bits(104)
        .heavy_cells(1)
        .light_cells(0)
        .seed(6)
        .build();
    let mut rng = StdRng::seed_from_u64(6);

    for i in 0..10_000 {
        sketch.insert(random_flow(&mut rng));
        if i % 1000 == 0 {
            assert_eq!(sketch.heavy_flows().len(), 1);
        }
    }

    let flows = sketch.heavy_flows();
    assert_eq!(flows.len(), 1);
    assert!(flows[0].count() >= 1);
    // The surviving identity is a real key: querying it hits the cell.
    assert!(sketch.query(*flows[0].key()) > 0);
}

#[test]
fn light_key_is_promoted_into_the_heavy_zone() {
    let mut sketch = Sketch::<Ipv4Flow>::builder()
        .num_buckets(1)
        .left_part_bits(104)
        .heavy_cells(1)
        .light_cells(1)
        .seed(7)
        .build();
    let key_a = Ipv4Flow {
        src_ip: 0x0A00_0001,
        dst_ip: 0x0A00_0002,
        src_port: 1000,
        dst_port: 2000,
        protocol: 6,
    };
    let key_b = Ipv4Flow {
        src_ip: 0x0A00_0003,
        dst_ip: 0x0A00_0004,
        src_port: 3000,
        dst_port: 4000,
        protocol: 17,
    };

    sketch.insert(key_a); // occupies the heavy cell
    sketch.insert(key_b); // occupies the light cell
    sketch.insert(key_b); // catches up with the heavy counter and swaps in

    assert_eq!(sketch.query(key_b), 2);
    assert_eq!(sketch.query(key_a), 1);

    let flows = sketch.heavy_flows();
    assert_eq!(flows.len(), 1);
    assert_eq!(*flows[0].key(), key_b);
    assert_eq!(flows[0].count(), 2);
}

#[test]
fn generic_keys_are_recovered_with_a_full_width_carrier() {
    let mut sketch = Sketch::<GenericKey<13>>::builder()
        .num_buckets(64)
        .left_part_bits(128)
        .heavy_cells(4)
        .light_cells(4)
        .seed(8)
        .build();
    let key = GenericKey::new([9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 11, 12, 13]);
    for _ in 0..600 {
        sketch.insert(key);
    }

    assert!(sketch.query(key) >= 600);
    let flows = sketch.heavy_flows();
    assert_eq!(*flows[0].key(), key);
}

#[test]
fn ipv6_flows_are_counted() {
    let mut sketch = Sketch::<Ipv6Flow>::builder().seed(9).build();
    let flow = Ipv6Flow {
        src_ip: [u64::from_le_bytes([0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0]), 1],
        dst_ip: [u64::from_le_bytes([0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0]), 2],
        src_port: 80,
        dst_port: 443,
        protocol: 6,
    };
    for _ in 0..100 {
        sketch.insert(flow);
    }
    assert!(sketch.query(flow) >= 100);
}

#[test]
fn distinct_keys_are_tracked_independently() {
    let mut sketch = Sketch::<CompactStringKey>::builder()
        .config(SketchConfig::word_count())
        .seed(10)
        .build();
    let words = ["alpha", "beta", "gamma", "delta"];
    for (i, word) in words.iter().enumerate() {
        for _ in 0..=(i * 10) {
            sketch.insert(CompactStringKey::from(*word));
        }
    }

    for (i, word) in words.iter().enumerate() {
        assert!(sketch.query(CompactStringKey::from(*word)) >= (i as u32 * 10) + 1);
    }

    let flows = sketch.heavy_flows();
    assert_eq!(flows.len(), words.len());
    assert_eq!(flows[0].key().to_string(), "delta");
}
