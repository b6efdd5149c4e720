// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `rewind_graph` walks.

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rewind_graph::OwnershipGraph;

#[derive(Clone)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u32(&mut self) -> u32 {
        // Numerical Recipes LCG parameters.
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 32) as u32
    }

    fn gen_range_usize(&mut self, upper_exclusive: usize) -> usize {
        if upper_exclusive == 0 {
            return 0;
        }
        (self.next_u32() as usize) % upper_exclusive
    }
}

/// Every key `k > 0` gets `parents_per_node` owners among the keys below it.
fn build_graph(n: u32, parents_per_node: u32, seed: u64) -> OwnershipGraph<u32> {
    let mut graph = OwnershipGraph::new();
    let mut rng = Lcg::new(seed);
    for child in 1..n {
        for _ in 0..parents_per_node.min(child) {
            let parent = rng.gen_range_usize(child as usize) as u32;
            graph.add_edge(parent, child);
        }
    }
    graph
}

/// Same as [`build_graph`] plus back edges from leaves to the root.
fn build_cyclic_graph(n: u32, parents_per_node: u32, seed: u64) -> OwnershipGraph<u32> {
    let mut graph = build_graph(n, parents_per_node, seed);
    for leaf in (n / 2)..n {
        graph.add_edge(leaf, 0);
    }
    graph
}

fn bench_ownership(c: &mut Criterion) {
    let mut group = c.benchmark_group("rewind_graph");
    group.sample_size(50);

    for &(n, parents) in &[(256_u32, 1_u32), (256_u32, 4_u32), (4_096_u32, 1_u32), (4_096_u32, 4_u32)] {
        let graph = build_graph(n, parents, 0x5EED_0000_0000_0001);
        let cyclic = build_cyclic_graph(n, parents, 0x5EED_0000_0000_0002);

        group.bench_function(format!("ancestors_of_last(n={n},p={parents})"), |b| {
            b.iter(|| black_box(graph.ancestors(n - 1).count()));
        });

        group.bench_function(format!("descendants_of_root(n={n},p={parents})"), |b| {
            b.iter(|| black_box(graph.descendants(0).count()));
        });

        group.bench_function(format!("cyclic_descendants(n={n},p={parents})"), |b| {
            b.iter(|| black_box(cyclic.descendants(n - 1).count()));
        });

        group.bench_function(format!("build_and_remove_keys(n={n},p={parents})"), |b| {
            b.iter_batched(
                || build_graph(n, parents, 0x5EED_0000_0000_0003),
                |mut graph| {
                    for k in (0..n).step_by(3) {
                        graph.remove_key(k);
                    }
                    black_box(graph.edge_count());
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ownership);
criterion_main!(benches);
