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

//! Streams a skewed random workload into the sketch and an exact hash-map
//! oracle, then prints the sketch's top flows next to their true counts.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use flowsketch::Ipv4Flow;
use flowsketch::Sketch;
use flowsketch::SketchConfig;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

const EVENTS: usize = 2_000_000;
const HOT_FLOWS: usize = 12;

fn main() {
    let mut rng = StdRng::seed_from_u64(42);

    let hot: Vec<Ipv4Flow> = (0..HOT_FLOWS).map(|_| random_flow(&mut rng)).collect();

    let mut sketch = Sketch::<Ipv4Flow>::new(SketchConfig::word_count());
    let mut oracle: HashMap<Ipv4Flow, u64> = HashMap::new();

    for _ in 0..EVENTS {
        // Roughly half the stream concentrates on the hot flows.
        let flow = if rng.gen_bool(0.5) {
            hot[rng.gen_range(0..HOT_FLOWS)]
        } else {
            random_flow(&mut rng)
        };
        sketch.insert(flow);
        *oracle.entry(flow).or_insert(0) += 1;
    }

    println!(
        "processed {EVENTS} events into {} bytes of sketch state\n",
        sketch.memory_bytes()
    );
    println!(
        "{:<24}{:<24}{:>7}{:>10}{:>10}",
        "source", "destination", "proto", "sketch", "actual"
    );
    println!("{}", "-".repeat(75));

    for flow in sketch.heavy_flows().iter().take(10) {
        let key = flow.key();
        let actual = oracle.get(key).copied().unwrap_or(0);
        println!(
            "{:<24}{:<24}{:>7}{:>10}{:>10}",
            format!("{}:{}", Ipv4Addr::from(key.src_ip.to_be_bytes()), key.src_port),
            format!("{}:{}", Ipv4Addr::from(key.dst_ip.to_be_bytes()), key.dst_port),
            key.protocol,
            flow.count(),
            actual
        );
    }
}

fn random_flow(rng: &mut StdRng) -> Ipv4Flow {
    Ipv4Flow {
        src_ip: rng.gen(),
        dst_ip: rng.gen(),
        src_port: rng.gen_range(1..=65535),
        dst_port: rng.gen_range(1..=65535),
        protocol: if rng.gen_bool(0.8) { 6 } else { 17 },
    }
}
