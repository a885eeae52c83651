// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Markers and labels on a globe, laid out while the camera orbits.
//!
//! Run with `RUST_LOG=debug cargo run -p drape_demos --bin layout_loop`.

use std::sync::Arc;

use drape_layout::{LayoutConfig, SameCategory};
use drape_scene::{
    Label, LabelManager, LabelStyle, LayoutManager, Marker, MarkerManager, MarkerStyle,
    SceneContext, SceneManager, SceneState,
};
use drape_screen::{GlobeDisplay, ViewState};
use glam::DVec3;
use kurbo::Size;

const CITIES: &[(&str, f64, f64)] = &[
    ("Lisbon", -9.14, 38.72),
    ("Madrid", -3.70, 40.42),
    ("Paris", 2.35, 48.86),
    ("Brussels", 4.35, 50.85),
    ("Amsterdam", 4.90, 52.37),
    ("Berlin", 13.40, 52.52),
    ("Rome", 12.50, 41.90),
    ("Cairo", 31.24, 30.04),
    ("Nairobi", 36.82, -1.29),
    ("Mumbai", 72.88, 19.08),
    ("Tokyo", 139.69, 35.69),
    ("Sydney", 151.21, -33.87),
    ("Lima", -77.04, -12.05),
    ("New York", -74.01, 40.71),
];

fn anchor(lon: f64, lat: f64) -> DVec3 {
    DVec3::new(lon.to_radians(), lat.to_radians(), 0.0)
}

fn main() {
    env_logger::init();

    let context = SceneContext::new();
    let layout = Arc::new(LayoutManager::new(
        context.clone(),
        LayoutConfig::default(),
        SameCategory,
    ));
    let markers = MarkerManager::new(context.clone(), Arc::clone(&layout));
    let labels = LabelManager::new(context.clone(), Arc::clone(&layout));

    let pins: Vec<Marker> = CITIES
        .iter()
        .map(|&(_, lon, lat)| Marker::at(anchor(lon, lat)))
        .collect();
    let names: Vec<Label> = CITIES
        .iter()
        .map(|&(name, lon, lat)| Label::new(name, anchor(lon, lat)))
        .collect();
    let marker_style = MarkerStyle {
        width: 20.0,
        height: 20.0,
        cluster_group: Some(0),
        ..MarkerStyle::default()
    };
    let label_style = LabelStyle {
        offset: [0.0, -18.0],
        ..LabelStyle::default()
    };
    let pin_rep = match markers.add(&pins, &marker_style) {
        Ok(id) => id,
        Err(err) => {
            log::error!("adding markers failed: {err}");
            return;
        }
    };
    let label_rep = match labels.add(&names, &label_style) {
        Ok(id) => id,
        Err(err) => {
            log::error!("adding labels failed: {err}");
            return;
        }
    };

    let globe = GlobeDisplay::default();
    let mut scene = SceneState::new();
    context.queue.apply_pending(&mut scene);
    println!("{} drawables, none shown before layout", scene.drawable_count());

    for step in 0..12 {
        let generation = context.generation.bump();
        let angle = f64::from(step) * 30_f64.to_radians();
        let distance = if step < 6 { 4.0 } else { 2.2 };
        let eye = DVec3::new(angle.cos(), angle.sin(), 0.6).normalize() * distance;
        let view = ViewState::look_at_perspective(
            eye,
            DVec3::ZERO,
            DVec3::Z,
            0.9,
            Size::new(1280.0, 720.0),
            0.01,
            20.0,
        )
        .with_generation(generation);

        let sequence = layout.run(&view, &globe);
        let applied = context.queue.apply_pending(&mut scene);
        let clustered: usize = layout
            .cluster_markers()
            .iter()
            .map(|c| c.children.len())
            .sum();
        println!(
            "step {step:2}: batch {sequence:?}, applied {applied}, shown {}, clusters {} ({clustered} members)",
            scene.enabled_drawables().count(),
            layout.cluster_markers().len(),
        );
    }

    // A pass started before the camera moves again never reaches the scene.
    let view = ViewState::look_at_perspective(
        DVec3::new(0.0, 0.0, 4.0),
        DVec3::ZERO,
        DVec3::Y,
        0.9,
        Size::new(1280.0, 720.0),
        0.01,
        20.0,
    )
    .with_generation(context.generation.current());
    let frame = layout.compute(&view, &globe);
    context.generation.bump();
    println!(
        "stale frame {} committed: {:?}",
        frame.generation(),
        layout.commit(frame)
    );

    let view = view.with_generation(context.generation.current());
    labels.enable(&[label_rep], false);
    layout.run(&view, &globe);
    context.queue.apply_pending(&mut scene);
    println!("labels off: {} shown", scene.enabled_drawables().count());

    markers.remove(&[pin_rep]);
    labels.remove(&[label_rep]);
    // The next pass drops the cluster markers that stood in for removed pins.
    layout.run(&view, &globe);
    context.queue.apply_pending(&mut scene);
    println!(
        "removed everything: {} drawables, {} representations released",
        scene.drawable_count(),
        scene.released()
    );
}
