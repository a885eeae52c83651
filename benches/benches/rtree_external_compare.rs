// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![cfg(feature = "compare_rstar")]

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use drape_index::{CullTree, Mbr};

use rstar::primitives::Rectangle;
use rstar::{AABB, RTree};

fn gen_grid_rects(n: usize, cell: f64) -> Vec<Mbr<f64>> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            let x0 = x as f64 * cell;
            let y0 = y as f64 * cell;
            out.push(Mbr::<f64>::from_xywh(x0, y0, cell, cell));
        }
    }
    out
}

fn to_rstar_rects(v: &[Mbr<f64>]) -> Vec<Rectangle<[f64; 2]>> {
    v.iter()
        .map(|r| Rectangle::from_corners([r.min_x, r.min_y], [r.max_x, r.max_y]))
        .collect()
}

fn bench_cull_tree_vs_rstar(c: &mut Criterion) {
    let mut group = c.benchmark_group("cull_tree_vs_rstar");
    for &n in &[64usize, 128] {
        let rects = gen_grid_rects(n, 10.0);
        let root = Mbr::<f64>::from_xywh(0.0, 0.0, n as f64 * 10.0, n as f64 * 10.0);
        let query = Mbr::<f64>::from_xywh(100.0, 100.0, 400.0, 400.0);
        group.throughput(Throughput::Elements((n * n) as u64));

        group.bench_function(format!("cull_tree_build_query_n{n}"), |b| {
            b.iter(|| {
                let mut tree: CullTree<f64, u32> = CullTree::new(root);
                for (i, r) in rects.iter().copied().enumerate() {
                    tree.insert(r, i as u32);
                }
                black_box(tree.query_rect(&query).len())
            });
        });

        group.bench_function(format!("rstar_build_query_bulk_n{n}"), |b| {
            b.iter_batched(
                || to_rstar_rects(&rects),
                |rectangles| {
                    let tree = RTree::bulk_load(rectangles);
                    let aabb = AABB::from_corners(
                        [query.min_x, query.min_y],
                        [query.max_x, query.max_y],
                    );
                    black_box(tree.locate_in_envelope_intersecting(&aabb).count())
                },
                BatchSize::SmallInput,
            );
        });

        let mut tree: CullTree<f64, u32> = CullTree::new(root);
        for (i, r) in rects.iter().copied().enumerate() {
            tree.insert(r, i as u32);
        }
        let rtree = RTree::bulk_load(to_rstar_rects(&rects));
        let aabb = AABB::from_corners([query.min_x, query.min_y], [query.max_x, query.max_y]);
        group.bench_function(format!("cull_tree_query_n{n}"), |b| {
            b.iter(|| black_box(tree.query_rect(&query).len()));
        });
        group.bench_function(format!("rstar_query_n{n}"), |b| {
            b.iter(|| black_box(rtree.locate_in_envelope_intersecting(&aabb).count()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cull_tree_vs_rstar);
criterion_main!(benches);
