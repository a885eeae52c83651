// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame overlap layout for markers and labels.
//!
//! Marker and label managers register one [`LayoutEntry`] per drawable and add
//! the drawable disabled. Each time the view changes, [`LayoutManager::run`]
//! projects the entries, runs a [`LayoutPass`], and turns the difference from
//! the previous frame into change requests: drawables that became visible are
//! enabled, drawables that lost their place are disabled, and cluster markers
//! are replaced.
//!
//! The pass works on a snapshot, so it can run on a worker thread while
//! managers keep adding and removing. A pass whose view generation has moved
//! on by the time it finishes is dropped unsubmitted.

use std::collections::{BTreeMap, BTreeSet};

use drape_index::Mbr;
use drape_layout::{
    Category, ClusterPolicy, Decision, Footprint, LayoutConfig, LayoutObject, LayoutPass,
    LayoutResult,
};
use drape_screen::{LocalToDisplay, ViewState};
use glam::DVec3;
use kurbo::{Point, Size, Vec2};
use parking_lot::Mutex;

use crate::change::{ChangeRequest, ChangeSet, Drawable, DrawableKind};
use crate::generation::GenerationTicket;
use crate::identity::Identity;
use crate::manager::SceneContext;

/// A drawable that competes for screen space.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutEntry {
    /// The drawable shown or hidden by layout.
    pub drawable: Identity,
    /// Anchor in local coordinates.
    pub anchor: DVec3,
    /// Box size in pixels.
    pub size: Size,
    /// Pixel offset of the box center from the projected anchor.
    pub offset: Vec2,
    /// Screen rotation of the box, radians.
    pub rotation: f64,
    /// Higher claims space first.
    pub importance: f64,
    /// Kind of object, for the cluster policy.
    pub category: Category,
    /// Objects only cluster within a group; `None` never clusters.
    pub cluster_group: Option<u32>,
    /// Shown without an overlap test.
    pub always_place: bool,
}

impl LayoutEntry {
    /// An unrotated, unclustered box of `size` at `anchor`.
    pub fn new(drawable: Identity, anchor: DVec3, size: Size) -> Self {
        Self {
            drawable,
            anchor,
            size,
            offset: Vec2::ZERO,
            rotation: 0.0,
            importance: 1.0,
            category: Category::MARKER,
            cluster_group: None,
            always_place: false,
        }
    }

    fn footprint(&self, screen: Point) -> Footprint {
        let mut footprint = Footprint::rotated_rect(
            screen + self.offset,
            self.size,
            (self.rotation.cos(), self.rotation.sin()),
            self.importance,
        );
        footprint.center = screen;
        footprint
    }
}

/// A cluster marker currently in the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterMarker {
    /// Drawable standing in for the cluster.
    pub drawable: Identity,
    /// Cluster group.
    pub group: u32,
    /// Member drawables, ascending.
    pub children: Vec<Identity>,
    /// Screen position of the marker.
    pub position: Point,
}

/// A computed but not yet committed layout.
#[derive(Debug)]
pub struct LayoutFrame {
    ticket: GenerationTicket,
    result: LayoutResult<Identity>,
    anchors: BTreeMap<Identity, DVec3>,
}

impl LayoutFrame {
    /// The view generation this frame was computed for.
    pub fn generation(&self) -> u64 {
        self.ticket.generation()
    }

    /// Whether the view has not moved on since.
    pub fn is_current(&self) -> bool {
        self.ticket.is_current()
    }

    /// The raw layout decisions.
    pub fn result(&self) -> &LayoutResult<Identity> {
        &self.result
    }
}

#[derive(Clone, Debug)]
struct Slot {
    entry: LayoutEntry,
    order: u64,
    enabled: bool,
}

#[derive(Debug, Default)]
struct LayoutState {
    slots: BTreeMap<Identity, Slot>,
    next_order: u64,
    shown: BTreeSet<Identity>,
    clusters: Vec<ClusterMarker>,
}

impl LayoutState {
    /// Whether `drawable` is registered and enabled.
    fn is_live(&self, drawable: Identity) -> bool {
        self.slots.get(&drawable).is_some_and(|s| s.enabled)
    }
}

/// Runs layout for every registered marker and label of a scene.
pub struct LayoutManager {
    context: SceneContext,
    config: LayoutConfig,
    policy: Box<dyn ClusterPolicy + Send + Sync>,
    state: Mutex<LayoutState>,
}

impl core::fmt::Debug for LayoutManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("LayoutManager")
            .field("config", &self.config)
            .field("entries", &state.slots.len())
            .field("shown", &state.shown.len())
            .field("clusters", &state.clusters.len())
            .finish_non_exhaustive()
    }
}

impl LayoutManager {
    /// A layout manager clustering with `policy`.
    pub fn new(
        context: SceneContext,
        config: LayoutConfig,
        policy: impl ClusterPolicy + Send + Sync + 'static,
    ) -> Self {
        Self {
            context,
            config,
            policy: Box::new(policy),
            state: Mutex::new(LayoutState::default()),
        }
    }

    /// Layout settings.
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Register entries. Re-registering a drawable replaces its entry.
    pub fn add_entries(&self, entries: impl IntoIterator<Item = LayoutEntry>) {
        let mut state = self.state.lock();
        for entry in entries {
            let order = state.next_order;
            state.next_order += 1;
            state.slots.insert(
                entry.drawable,
                Slot {
                    entry,
                    order,
                    enabled: true,
                },
            );
        }
    }

    /// Forget entries. Returns how many were registered.
    ///
    /// The drawables themselves belong to the caller, which removes them.
    /// Cluster markers standing for any of them are removed at once.
    pub fn remove_entries(&self, drawables: &[Identity]) -> usize {
        let mut state = self.state.lock();
        let mut removed = 0;
        for d in drawables {
            if state.slots.remove(d).is_some() {
                removed += 1;
            }
            state.shown.remove(d);
        }
        self.drop_clusters_of(&mut state, drawables);
        removed
    }

    /// Include or exclude entries from future passes.
    ///
    /// Returns the drawables that were on screen and are now excluded; the
    /// caller disables them. Cluster markers standing for excluded entries
    /// are removed at once; their other members show again on the next pass.
    pub fn set_enabled(&self, drawables: &[Identity], enabled: bool) -> Vec<Identity> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let mut hidden = Vec::new();
        for d in drawables {
            if let Some(slot) = state.slots.get_mut(d) {
                slot.enabled = enabled;
                if !enabled && state.shown.remove(d) {
                    hidden.push(*d);
                }
            }
        }
        if !enabled {
            self.drop_clusters_of(state, drawables);
        }
        hidden
    }

    /// Whether `drawable` has a layout entry.
    pub fn tracks(&self, drawable: Identity) -> bool {
        self.state.lock().slots.contains_key(&drawable)
    }

    /// Number of registered entries.
    pub fn entry_count(&self) -> usize {
        self.state.lock().slots.len()
    }

    /// Whether `drawable` was shown by the last committed pass.
    pub fn is_shown(&self, drawable: Identity) -> bool {
        self.state.lock().shown.contains(&drawable)
    }

    /// Cluster markers from the last committed pass.
    pub fn cluster_markers(&self) -> Vec<ClusterMarker> {
        self.state.lock().clusters.clone()
    }

    /// Members of the cluster drawn by `marker`; empty if it is not a cluster marker.
    pub fn objects_for_cluster(&self, marker: Identity) -> Vec<Identity> {
        self.state
            .lock()
            .clusters
            .iter()
            .find(|c| c.drawable == marker)
            .map(|c| c.children.clone())
            .unwrap_or_default()
    }

    /// Lay out a snapshot of the enabled entries for `view`.
    ///
    /// Does not touch the scene. Entries whose anchor does not project into
    /// the view volume, or sits beyond the horizon of a curved display, are
    /// left out of the pass and end up hidden.
    pub fn compute<L: LocalToDisplay + ?Sized>(&self, view: &ViewState, display: &L) -> LayoutFrame {
        let ticket = self.context.generation.ticket_at(view.generation);
        let snapshot: Vec<Slot> = self
            .state
            .lock()
            .slots
            .values()
            .filter(|s| s.enabled)
            .cloned()
            .collect();

        let mut anchors = BTreeMap::new();
        let objects: Vec<LayoutObject<Identity>> = snapshot
            .iter()
            .filter_map(|slot| {
                let e = &slot.entry;
                anchors.insert(e.drawable, e.anchor);
                let shown = display.local_to_display(e.anchor);
                if let Some(normal) = display.surface_normal(e.anchor)
                    && normal.dot(view.eye - shown) <= 0.0
                {
                    return None;
                }
                let screen = view.project_point(shown)?;
                Some(LayoutObject {
                    id: e.drawable,
                    footprint: e.footprint(screen),
                    category: e.category,
                    cluster_group: e.cluster_group,
                    always_place: e.always_place,
                    order: slot.order,
                })
            })
            .collect();

        let result = LayoutPass::run(view.viewport_rect(), &objects, &self.config, &*self.policy);
        LayoutFrame {
            ticket,
            result,
            anchors,
        }
    }

    /// Turn `frame` into change requests and submit them.
    ///
    /// Returns the batch's sequence number, or `None` if the frame was stale
    /// or nothing changed.
    pub fn commit(&self, frame: LayoutFrame) -> Option<u64> {
        let mut state = self.state.lock();
        if !frame.ticket.is_current() {
            log::debug!(
                "dropping layout for stale generation {}",
                frame.ticket.generation()
            );
            return None;
        }

        let visible: BTreeSet<Identity> = frame
            .result
            .decisions
            .iter()
            .filter(|(id, d)| matches!(d, Decision::Visible(_)) && state.is_live(*id))
            .map(|(id, _)| *id)
            .collect();

        let mut changes = ChangeSet::new();
        for &d in state.shown.difference(&visible) {
            changes.push(ChangeRequest::EnableDrawable(d, false));
        }
        for &d in visible.difference(&state.shown) {
            changes.push(ChangeRequest::EnableDrawable(d, true));
        }

        let wanted = self.wanted_clusters(&state, &frame);
        let mut kept = Vec::new();
        for old in &state.clusters {
            let still = wanted.iter().any(|(group, children, position)| {
                *group == old.group && *children == old.children && near(*position, old.position)
            });
            if still {
                kept.push(old.clone());
            } else {
                changes.push(ChangeRequest::RemoveDrawable(old.drawable));
            }
        }
        for (group, children, position) in wanted {
            if kept.iter().any(|k| k.group == group && k.children == children) {
                continue;
            }
            let drawable = self.context.registry.allocate();
            let mut bounds = Mbr::empty();
            for c in &children {
                if let Some(a) = frame.anchors.get(c) {
                    bounds.add_point(a.x, a.y);
                }
            }
            let mut marker = Drawable::new(
                drawable,
                DrawableKind::Cluster {
                    count: children.len(),
                    size: [
                        self.config.cluster.marker_size.width,
                        self.config.cluster.marker_size.height,
                    ],
                },
                bounds,
            );
            marker.screen_position = Some(position);
            changes.push(ChangeRequest::AddDrawable(marker));
            kept.push(ClusterMarker {
                drawable,
                group,
                children,
                position,
            });
        }

        let sequence = self
            .context
            .queue
            .submit_if_current(&frame.ticket, changes)?;
        log::debug!(
            "layout generation {}: {} shown, {} clusters",
            frame.ticket.generation(),
            visible.len(),
            kept.len()
        );
        state.shown = visible;
        state.clusters = kept;
        Some(sequence)
    }

    /// [`compute`](Self::compute) then [`commit`](Self::commit).
    pub fn run<L: LocalToDisplay + ?Sized>(&self, view: &ViewState, display: &L) -> Option<u64> {
        let frame = self.compute(view, display);
        self.commit(frame)
    }

    /// Take down every cluster marker with a member in `drawables`.
    fn drop_clusters_of(&self, state: &mut LayoutState, drawables: &[Identity]) {
        let mut changes = ChangeSet::new();
        state.clusters.retain(|c| {
            let stale = c.children.iter().any(|m| drawables.contains(m));
            if stale {
                changes.push(ChangeRequest::RemoveDrawable(c.drawable));
            }
            !stale
        });
        if !changes.is_empty() {
            log::debug!("removing {} cluster markers with departed members", changes.len());
            self.context.queue.submit(changes);
        }
    }

    /// Clusters in `frame`, restricted to members still registered and enabled.
    fn wanted_clusters(
        &self,
        state: &LayoutState,
        frame: &LayoutFrame,
    ) -> Vec<(u32, Vec<Identity>, Point)> {
        frame
            .result
            .clusters
            .iter()
            .filter_map(|c| {
                let mut children: Vec<Identity> = c
                    .children
                    .iter()
                    .copied()
                    .filter(|id| state.is_live(*id))
                    .collect();
                if children.is_empty() {
                    return None;
                }
                children.sort_unstable();
                Some((c.group, children, c.footprint.center))
            })
            .collect()
    }
}

fn near(a: Point, b: Point) -> bool {
    (a - b).hypot2() < 0.25
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::{ChangeApplier, SceneState};
    use drape_layout::{AnyCategory, ClusterConfig};
    use drape_screen::{FlatDisplay, GlobeDisplay};
    use glam::DMat4;

    /// Local x/y map straight to pixels: an orthographic view of a
    /// 200×100 region with y flipped so local y grows down the screen.
    fn pixel_view(generation: u64) -> ViewState {
        let projection = DMat4::orthographic_rh(0.0, 200.0, 100.0, 0.0, -1.0, 1.0);
        ViewState::new(DMat4::IDENTITY, projection, Size::new(200.0, 100.0))
            .with_generation(generation)
    }

    fn manager(context: &SceneContext) -> LayoutManager {
        let config = LayoutConfig {
            cluster: ClusterConfig {
                marker_size: Size::new(10.0, 10.0),
                ..ClusterConfig::default()
            },
            ..LayoutConfig::default()
        };
        LayoutManager::new(context.clone(), config, AnyCategory)
    }

    fn add_disabled(scene: &mut SceneState, id: Identity) {
        let mut d = Drawable::new(id, DrawableKind::Marker { size: [10.0, 10.0] }, Mbr::empty());
        d.enabled = false;
        scene.apply(ChangeRequest::AddDrawable(d));
    }

    fn entry(id: Identity, x: f64, y: f64, group: Option<u32>) -> LayoutEntry {
        LayoutEntry {
            cluster_group: group,
            ..LayoutEntry::new(id, DVec3::new(x, y, 0.0), Size::new(10.0, 10.0))
        }
    }

    #[test]
    fn visible_entries_get_enabled() {
        let context = SceneContext::new();
        let layout = manager(&context);
        let mut scene = SceneState::new();
        let (a, b) = (context.registry.allocate(), context.registry.allocate());
        for id in [a, b] {
            add_disabled(&mut scene, id);
        }
        layout.add_entries([entry(a, 20.0, 20.0, None), entry(b, 100.0, 50.0, None)]);

        assert!(layout.run(&pixel_view(0), &FlatDisplay).is_some());
        context.queue.apply_pending(&mut scene);
        assert!(scene.drawable(a).unwrap().enabled);
        assert!(scene.drawable(b).unwrap().enabled);
        assert!(layout.is_shown(a));

        assert_eq!(layout.run(&pixel_view(0), &FlatDisplay), None, "no change, no batch");
    }

    #[test]
    fn overlapping_grouped_entries_become_a_cluster_marker() {
        let context = SceneContext::new();
        let layout = manager(&context);
        let mut scene = SceneState::new();
        let (a, b) = (context.registry.allocate(), context.registry.allocate());
        for id in [a, b] {
            add_disabled(&mut scene, id);
        }
        layout.add_entries([entry(a, 50.0, 50.0, Some(1)), entry(b, 55.0, 55.0, Some(1))]);
        layout.run(&pixel_view(0), &FlatDisplay);
        context.queue.apply_pending(&mut scene);

        let markers = layout.cluster_markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].children, [a, b]);
        assert_eq!(layout.objects_for_cluster(markers[0].drawable), [a, b]);
        assert!(!scene.drawable(a).unwrap().enabled);
        assert!(!scene.drawable(b).unwrap().enabled);
        let marker = scene.drawable(markers[0].drawable).unwrap();
        assert_eq!(
            marker.drawable.kind,
            DrawableKind::Cluster {
                count: 2,
                size: [10.0, 10.0]
            }
        );

        // Move one entry away: the cluster dissolves and its marker goes.
        layout.remove_entries(&[b]);
        layout.add_entries([entry(b, 150.0, 50.0, Some(1))]);
        layout.run(&pixel_view(0), &FlatDisplay);
        context.queue.apply_pending(&mut scene);
        assert!(layout.cluster_markers().is_empty());
        assert!(scene.drawable(markers[0].drawable).is_none());
        assert!(scene.drawable(a).unwrap().enabled);
        assert!(scene.drawable(b).unwrap().enabled);
    }

    #[test]
    fn departing_members_take_their_cluster_marker_down() {
        let context = SceneContext::new();
        let layout = manager(&context);
        let mut scene = SceneState::new();
        let ids = context.registry.allocate_many(4);
        for &id in &ids {
            add_disabled(&mut scene, id);
        }
        layout.add_entries([
            entry(ids[0], 50.0, 50.0, Some(1)),
            entry(ids[1], 55.0, 55.0, Some(1)),
            entry(ids[2], 150.0, 50.0, Some(1)),
            entry(ids[3], 155.0, 55.0, Some(1)),
        ]);
        layout.run(&pixel_view(0), &FlatDisplay);
        context.queue.apply_pending(&mut scene);
        let markers = layout.cluster_markers();
        assert_eq!(markers.len(), 2);

        assert!(layout.set_enabled(&[ids[0]], false).is_empty(), "members are not shown");
        context.queue.apply_pending(&mut scene);
        assert_eq!(layout.cluster_markers().len(), 1);
        assert!(scene.drawable(markers[0].drawable).is_none(), "marker goes without a pass");
        assert!(scene.drawable(markers[1].drawable).is_some());

        layout.remove_entries(&[ids[3]]);
        context.queue.apply_pending(&mut scene);
        assert!(layout.cluster_markers().is_empty());
        assert!(scene.drawable(markers[1].drawable).is_none());

        layout.run(&pixel_view(0), &FlatDisplay);
        context.queue.apply_pending(&mut scene);
        assert!(layout.cluster_markers().is_empty());
        assert!(layout.is_shown(ids[1]));
        assert!(layout.is_shown(ids[2]));
        assert!(!layout.is_shown(ids[0]));
    }

    #[test]
    fn frames_computed_before_a_disable_leave_it_out() {
        let context = SceneContext::new();
        let layout = manager(&context);
        let ids = context.registry.allocate_many(2);
        layout.add_entries([
            entry(ids[0], 50.0, 50.0, Some(1)),
            entry(ids[1], 55.0, 55.0, Some(1)),
        ]);
        let frame = layout.compute(&pixel_view(0), &FlatDisplay);
        assert_eq!(frame.result().clusters.len(), 1);
        layout.set_enabled(&ids, false);
        layout.commit(frame);
        assert!(layout.cluster_markers().is_empty());
        assert!(!layout.is_shown(ids[0]));
        assert!(!layout.is_shown(ids[1]));
    }

    #[test]
    fn stale_frames_are_not_committed() {
        let context = SceneContext::new();
        let layout = manager(&context);
        let a = context.registry.allocate();
        layout.add_entries([entry(a, 20.0, 20.0, None)]);
        let frame = layout.compute(&pixel_view(0), &FlatDisplay);
        context.generation.bump();
        assert!(!frame.is_current());
        assert_eq!(layout.commit(frame), None);
        assert!(context.queue.is_empty());
        assert!(!layout.is_shown(a));

        assert!(layout.run(&pixel_view(1), &FlatDisplay).is_some());
        assert!(layout.is_shown(a));
    }

    #[test]
    fn disabled_entries_drop_out() {
        let context = SceneContext::new();
        let layout = manager(&context);
        let a = context.registry.allocate();
        layout.add_entries([entry(a, 20.0, 20.0, None)]);
        layout.run(&pixel_view(0), &FlatDisplay);
        assert_eq!(layout.set_enabled(&[a], false), [a]);
        assert!(!layout.is_shown(a));
        let frame = layout.compute(&pixel_view(0), &FlatDisplay);
        assert!(frame.result().decisions.is_empty());
        assert!(layout.set_enabled(&[a], true).is_empty());
    }

    #[test]
    fn removal_during_a_pass_is_respected() {
        let context = SceneContext::new();
        let layout = manager(&context);
        let (a, b) = (context.registry.allocate(), context.registry.allocate());
        layout.add_entries([entry(a, 20.0, 20.0, None), entry(b, 120.0, 20.0, None)]);
        let frame = layout.compute(&pixel_view(0), &FlatDisplay);
        assert_eq!(layout.remove_entries(&[b]), 1);
        layout.commit(frame);
        let batch = context.queue.drain();
        let enabled: Vec<Identity> = batch
            .iter()
            .flat_map(|b| b.changes.iter())
            .map(ChangeRequest::subject)
            .collect();
        assert_eq!(enabled, [a], "removed entry is not enabled");
    }

    #[test]
    fn anchors_beyond_the_horizon_stay_hidden() {
        let context = SceneContext::new();
        let layout = manager(&context);
        let globe = GlobeDisplay { radius: 1.0 };
        let (near_side, far_pole) = (context.registry.allocate(), context.registry.allocate());
        // The eye sits over the north pole. The south pole projects near the
        // middle of the screen but faces away.
        layout.add_entries([
            LayoutEntry::new(near_side, DVec3::new(0.0, 1.2, 0.0), Size::new(4.0, 4.0)),
            LayoutEntry::new(
                far_pole,
                DVec3::new(0.0, -core::f64::consts::FRAC_PI_2, 0.0),
                Size::new(4.0, 4.0),
            ),
        ]);
        let view = ViewState::look_at_perspective(
            DVec3::new(0.0, 0.0, 3.0),
            DVec3::ZERO,
            DVec3::Y,
            1.0,
            Size::new(200.0, 200.0),
            0.1,
            10.0,
        );
        layout.run(&view, &globe);
        assert!(layout.is_shown(near_side), "near side is shown");
        assert!(!layout.is_shown(far_pole), "far pole projects on screen but faces away");
    }

    #[test]
    fn anchors_behind_the_view_stay_hidden() {
        let context = SceneContext::new();
        let layout = manager(&context);
        let raised = context.registry.allocate();
        layout.add_entries([LayoutEntry::new(
            raised,
            DVec3::new(20.0, 20.0, 5.0),
            Size::new(10.0, 10.0),
        )]);
        assert_eq!(layout.run(&pixel_view(0), &FlatDisplay), None);
        assert!(!layout.is_shown(raised));
    }
}
