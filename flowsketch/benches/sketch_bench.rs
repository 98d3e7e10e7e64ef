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

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::Throughput;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use flowsketch::Ipv4Flow;
use flowsketch::Sketch;
use flowsketch::SketchConfig;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

const FLOW_COUNT: usize = 100_000;

fn generate_flows(seed: u64) -> Vec<Ipv4Flow> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..FLOW_COUNT)
        .map(|_| Ipv4Flow {
            src_ip: rng.gen(),
            dst_ip: rng.gen(),
            src_port: rng.gen_range(1..=65535),
            dst_port: rng.gen_range(1..=65535),
            protocol: rng.gen_range(1..=255),
        })
        .collect()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("sketch_insert");
    group.throughput(Throughput::Elements(1));

    let flows = generate_flows(42);
    for (name, config) in [
        ("small", SketchConfig::small()),
        ("medium", SketchConfig::medium()),
        ("large", SketchConfig::large()),
    ] {
        let mut sketch = Sketch::<Ipv4Flow>::new(config);
        let mut i = 0usize;
        group.bench_with_input(BenchmarkId::new("insert", name), &flows, |b, flows| {
            b.iter(|| {
                sketch.insert(black_box(flows[i % FLOW_COUNT]));
                i += 1;
            });
        });
    }
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("sketch_query");
    group.throughput(Throughput::Elements(1));

    let flows = generate_flows(42);
    let mut sketch = Sketch::<Ipv4Flow>::new(SketchConfig::medium());
    for flow in &flows {
        sketch.insert(*flow);
    }

    let mut i = 0usize;
    group.bench_function("query/medium", |b| {
        b.iter(|| {
            let count = sketch.query(black_box(flows[i % FLOW_COUNT]));
            i += 1;
            black_box(count)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_insert, bench_query);
criterion_main!(benches);
