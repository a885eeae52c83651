// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frustum culling of vector features and importance ranking of tiles and
//! shapes from a tilted camera over a flat map.
//!
//! Run with `RUST_LOG=trace cargo run -p drape_demos --bin culling`.

use drape_index::{CullTree, Mbr};
use drape_scene::{
    SceneContext, SceneState, Shape, ShapeManager, ShapeStyle, VectorFeature, VectorManager,
    VectorStyle,
};
use drape_screen::{FlatDisplay, ImportanceOptions, ViewState, rank_tree_nodes};
use glam::DVec3;
use kurbo::{Point, Size};

const WORLD: f64 = 1024.0;
const BLOCKS: u32 = 16;

/// A road through the middle of every block in both directions, split into
/// one segment per block.
fn road_grid() -> Vec<VectorFeature> {
    let block = WORLD / f64::from(BLOCKS);
    let mut roads = Vec::new();
    for i in 0..BLOCKS {
        let at = (f64::from(i) + 0.5) * block;
        for j in 0..BLOCKS {
            let from = f64::from(j) * block;
            let to = from + block;
            roads.push(VectorFeature::line(vec![
                Point::new(from, at),
                Point::new(to, at),
            ]));
            roads.push(VectorFeature::line(vec![
                Point::new(at, from),
                Point::new(at, to),
            ]));
        }
    }
    roads
}

fn main() {
    env_logger::init();

    let context = SceneContext::new();
    let root = Mbr::new(0.0, 0.0, WORLD, WORLD);
    let vectors = VectorManager::new(context.clone(), root);
    let shapes = ShapeManager::new(context.clone());

    let roads = road_grid();
    if let Err(err) = vectors.add(&roads, &VectorStyle::default()) {
        log::error!("adding roads failed: {err}");
        return;
    }
    let stats = vectors.tree_stats();
    println!(
        "{} road segments in {} nodes ({} leaves, depth {})",
        stats.drawables, stats.nodes, stats.leaves, stats.max_depth
    );

    let towers = [
        Shape::Sphere {
            center: DVec3::new(300.0, 260.0, 20.0),
            radius: 20.0,
        },
        Shape::Circle {
            center: DVec3::new(520.0, 300.0, 0.0),
            radius: 40.0,
        },
        Shape::Rectangle {
            bounds: Mbr::new(100.0, 900.0, 160.0, 960.0),
            z: 0.0,
        },
        Shape::Sphere {
            center: DVec3::new(900.0, 100.0, 10.0),
            radius: 10.0,
        },
    ];
    let style = ShapeStyle {
        sample_count: 32,
        ..ShapeStyle::default()
    };
    if let Err(err) = shapes.add(&towers, &style) {
        log::error!("adding shapes failed: {err}");
        return;
    }

    let mut scene = SceneState::new();
    context.queue.apply_pending(&mut scene);

    let view = ViewState::look_at_perspective(
        DVec3::new(300.0, 0.0, 200.0),
        DVec3::new(300.0, 300.0, 0.0),
        DVec3::Z,
        1.0,
        Size::new(1280.0, 720.0),
        1.0,
        2000.0,
    );

    let visible = vectors.visible_from(&view, &FlatDisplay, (0.0, 0.0));
    println!(
        "{} of {} drawables in the view volume",
        visible.len(),
        scene.drawable_count()
    );

    // Page tiles nearest the camera first.
    let mut tiles: CullTree<f64, u32> = CullTree::new(root);
    for y in 0..8 {
        for x in 0..8 {
            let tile =
                Mbr::<f64>::from_xywh(f64::from(x) * 128.0, f64::from(y) * 128.0, 128.0, 128.0);
            tiles.insert(tile, y * 8 + x);
        }
    }
    let options = ImportanceOptions::default();
    let ranked = rank_tree_nodes(&view, &FlatDisplay, &tiles, (0.0, 0.0), &options);
    println!("top tree nodes by importance:");
    for t in ranked.iter().filter(|t| t.on_screen).take(5) {
        println!("  node {:3}: {:10.1}", t.key, t.importance);
    }

    println!("shapes by importance:");
    for t in shapes.rank_visible(&view, &FlatDisplay, &options) {
        println!(
            "  {:?}: {:10.1}{}",
            t.key,
            t.importance,
            if t.on_screen { "" } else { " (off screen)" }
        );
    }
}
