// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use drape_index::{CullTree, CullTreeConfig, Mbr};
use drape_screen::{FlatDisplay, ViewState, classify_mbr};
use glam::DVec3;
use kurbo::Size;

const WORLD: f64 = 2048.0;

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

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

fn gen_random_rects(count: usize, max_side: f64) -> Vec<Mbr<f64>> {
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    (0..count)
        .map(|_| {
            let w = 1.0 + rng.next_f64() * max_side;
            let h = 1.0 + rng.next_f64() * max_side;
            let x0 = rng.next_f64() * (WORLD - w);
            let y0 = rng.next_f64() * (WORLD - h);
            Mbr::<f64>::from_xywh(x0, y0, w, h)
        })
        .collect()
}

fn gen_clustered_rects(n_clusters: usize, per_cluster: usize, spread: f64) -> Vec<Mbr<f64>> {
    let mut rng = Rng::new(0xC1A5_7E55_9999_ABCD);
    let centers: Vec<(f64, f64)> = (0..n_clusters)
        .map(|_| (rng.next_f64() * WORLD, rng.next_f64() * WORLD))
        .collect();
    let mut out = Vec::with_capacity(n_clusters * per_cluster);
    for (cx, cy) in centers {
        for _ in 0..per_cluster {
            let dx = (rng.next_f64() - 0.5) * spread;
            let dy = (rng.next_f64() - 0.5) * spread;
            out.push(Mbr::<f64>::from_xywh(cx + dx, cy + dy, 4.0, 4.0));
        }
    }
    out
}

fn build(rects: &[Mbr<f64>]) -> CullTree<f64, u32> {
    let mut tree = CullTree::new(Mbr::new(0.0, 0.0, WORLD, WORLD));
    for (i, r) in rects.iter().copied().enumerate() {
        tree.insert(r, i as u32);
    }
    tree
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("cull_tree_insert");
    for &n in &[32usize, 64, 128] {
        let rects = gen_grid_rects(n, WORLD / n as f64);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_function(format!("grid_n{n}"), |b| {
            b.iter(|| black_box(build(&rects).len()));
        });
    }
    let rects = gen_clustered_rects(32, 256, 60.0);
    group.throughput(Throughput::Elements(rects.len() as u64));
    group.bench_function("clustered", |b| {
        b.iter(|| black_box(build(&rects).len()));
    });
    for &depth in &[4_u32, 12] {
        group.bench_function(format!("clustered_max_depth{depth}"), |b| {
            b.iter(|| {
                let mut tree = CullTree::with_config(
                    Mbr::new(0.0, 0.0, WORLD, WORLD),
                    CullTreeConfig {
                        max_per_node: 8,
                        max_depth: depth,
                    },
                );
                for (i, r) in rects.iter().copied().enumerate() {
                    tree.insert(r, i as u32);
                }
                black_box(tree.len())
            });
        });
    }
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("cull_tree_query");
    let rects = gen_random_rects(16_384, 24.0);
    let tree = build(&rects);
    for &side in &[64.0, 256.0, 1024.0] {
        let q = Mbr::<f64>::from_xywh(512.0, 512.0, side, side);
        group.bench_function(format!("rect_{side}"), |b| {
            b.iter(|| black_box(tree.query_rect(&q).len()));
        });
    }
    group.bench_function("everything", |b| {
        b.iter(|| black_box(tree.query_rect(&tree.root_bounds()).len()));
    });

    let view = ViewState::look_at_perspective(
        DVec3::new(1024.0, 700.0, 400.0),
        DVec3::new(1024.0, 1024.0, 0.0),
        DVec3::Z,
        1.0,
        Size::new(1280.0, 720.0),
        1.0,
        5000.0,
    );
    group.bench_function("frustum", |b| {
        b.iter(|| {
            let hits = tree.query_with(|m| classify_mbr(&view, &FlatDisplay, m, (0.0, 0.0)));
            black_box(hits.len())
        });
    });
    group.finish();
}

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("cull_tree_churn");
    let rects = gen_random_rects(8192, 16.0);
    group.throughput(Throughput::Elements(rects.len() as u64));
    group.bench_function("remove_all", |b| {
        b.iter_batched(
            || build(&rects),
            |mut tree| {
                for i in 0..rects.len() {
                    tree.remove(i as u32);
                }
                black_box(tree.stats().nodes)
            },
            BatchSize::SmallInput,
        );
    });
    group.bench_function("move_half", |b| {
        b.iter_batched(
            || build(&rects),
            |mut tree| {
                for (i, r) in rects.iter().enumerate().step_by(2) {
                    let (x, y) = (WORLD - r.max_x, WORLD - r.max_y);
                    let moved = Mbr::<f64>::from_xywh(x, y, r.width(), r.height());
                    tree.insert(moved, i as u32);
                }
                black_box(tree.len())
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_insert, bench_query, bench_churn);
criterion_main!(benches);
