// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use drape_layout::{
    AnyCategory, Footprint, LayoutConfig, LayoutObject, LayoutPass, OverlapGrid, SameCategory,
};
use kurbo::{Point, Rect, Size, Vec2};

const SCREEN: Rect = Rect::new(0.0, 0.0, 1920.0, 1080.0);

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

/// `count` markers scattered over the screen, a quarter of them off screen.
fn gen_markers(count: usize, groups: Option<u32>) -> Vec<LayoutObject<u32>> {
    let mut rng = Rng::new(0xFACE_FEED_CAFE_BABE);
    (0..count)
        .map(|i| {
            let x = rng.next_f64() * SCREEN.width() * 1.25;
            let y = rng.next_f64() * SCREEN.height();
            let importance = rng.next_f64() * 10.0;
            let size = Size::new(16.0 + rng.next_f64() * 48.0, 16.0);
            let footprint = Footprint::rect(Point::new(x, y), size, Vec2::ZERO, importance);
            LayoutObject {
                cluster_group: groups.map(|g| i as u32 % g),
                order: i as u64,
                ..LayoutObject::new(i as u32, footprint)
            }
        })
        .collect()
}

fn bench_overlap_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlap_grid");
    let objects = gen_markers(4096, None);
    group.throughput(Throughput::Elements(objects.len() as u64));
    for &cell in &[16.0, 32.0, 128.0] {
        group.bench_function(format!("try_add_cell{cell}"), |b| {
            b.iter_batched(
                || OverlapGrid::with_cell_size(SCREEN, Size::new(cell, cell)),
                |mut grid| {
                    let placed = objects
                        .iter()
                        .filter(|o| grid.try_add(&o.footprint.points))
                        .count();
                    black_box(placed)
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_pass");
    for &n in &[256usize, 1024, 4096] {
        let hidden = gen_markers(n, None);
        let clustered = gen_markers(n, Some(4));
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("no_groups_n{n}"), |b| {
            b.iter(|| {
                let r = LayoutPass::run(SCREEN, &hidden, &LayoutConfig::default(), &AnyCategory);
                black_box(r.visible_count())
            });
        });
        group.bench_function(format!("four_groups_n{n}"), |b| {
            b.iter(|| {
                let r = LayoutPass::run(SCREEN, &clustered, &LayoutConfig::default(), &AnyCategory);
                black_box(r.clusters.len())
            });
        });
        group.bench_function(format!("four_groups_same_category_n{n}"), |b| {
            b.iter(|| {
                let r =
                    LayoutPass::run(SCREEN, &clustered, &LayoutConfig::default(), &SameCategory);
                black_box(r.clusters.len())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_overlap_grid, bench_layout);
criterion_main!(benches);
