// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deferred scene mutations and the queue that carries them to the render thread.
//!
//! Producers (managers, layout, loaders) build a [`ChangeSet`] and submit it to
//! a [`ChangeQueue`] from any thread. One consumer drains the queue at the
//! start of a frame and applies each batch, in order, through a
//! [`ChangeApplier`].
//!
//! Requests inside a batch may depend on earlier requests in the same batch
//! ("add drawable 7" then "enable drawable 7"). Referencing an identity that
//! only a *later* batch creates is a caller bug; the queue does not detect it.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use drape_index::Mbr;
use kurbo::Point;
use parking_lot::Mutex;

use crate::generation::GenerationTicket;
use crate::identity::Identity;
use crate::representation::SceneRepresentation;
use crate::style::Rgba;

/// What a drawable renders as, with the parameters the GPU layer needs.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawableKind {
    /// Lines or polygons in local coordinates.
    Vector {
        /// Stroke width in pixels.
        line_width: f32,
        /// Filled polygon rather than outline.
        filled: bool,
    },
    /// Screen-space marker anchored at a local point.
    Marker {
        /// Marker size in pixels.
        size: [f64; 2],
    },
    /// Screen-space text anchored at a local point.
    Label {
        /// The text.
        text: String,
        /// Font size in pixels.
        font_size: f64,
    },
    /// Tessellated shape in local coordinates.
    Shape {
        /// Tessellation steps around curves.
        sample_count: u32,
    },
    /// Synthetic marker standing in for a cluster of markers or labels.
    Cluster {
        /// Number of objects in the cluster.
        count: usize,
        /// Marker size in pixels.
        size: [f64; 2],
    },
}

/// A render-side object the consumer creates, toggles and destroys.
#[derive(Clone, Debug, PartialEq)]
pub struct Drawable {
    /// Identity of this drawable.
    pub id: Identity,
    /// What it renders as.
    pub kind: DrawableKind,
    /// Local-space bounds; a single point for screen-space drawables.
    pub bounds: Mbr<f64>,
    /// Screen position, for drawables placed directly in pixels.
    pub screen_position: Option<Point>,
    /// Color or tint.
    pub color: Rgba,
    /// Sort key; higher draws later.
    pub draw_priority: i32,
    /// Viewer-distance range in which the drawable shows.
    pub visible_range: (f64, f64),
    /// Fade time in seconds.
    pub fade: f32,
    /// Whether the drawable starts enabled.
    pub enabled: bool,
}

impl Drawable {
    /// An enabled drawable with neutral parameters.
    pub fn new(id: Identity, kind: DrawableKind, bounds: Mbr<f64>) -> Self {
        Self {
            id,
            kind,
            bounds,
            screen_position: None,
            color: Rgba::WHITE,
            draw_priority: 0,
            visible_range: (0.0, f64::MAX),
            fade: 0.0,
            enabled: true,
        }
    }
}

/// One deferred mutation.
#[derive(Clone, Debug)]
pub enum ChangeRequest {
    /// Create a drawable.
    AddDrawable(Drawable),
    /// Destroy a drawable.
    RemoveDrawable(Identity),
    /// Show or hide a drawable.
    EnableDrawable(Identity, bool),
    /// Start a fade on a drawable.
    SetFade(Identity, f32),
    /// Create an offscreen render target.
    AddRenderTarget(Identity),
    /// Destroy a render target; attached drawables fall back to the screen.
    RemoveRenderTarget(Identity),
    /// Draw a drawable into a render target instead of the screen.
    AttachToRenderTarget {
        /// The drawable.
        drawable: Identity,
        /// The target.
        target: Identity,
    },
    /// Register a selection region.
    AddSelectable {
        /// Selection identity.
        id: Identity,
        /// Local bounds.
        bounds: Mbr<f64>,
    },
    /// Remove a selection region.
    RemoveSelectable(Identity),
    /// Enable or disable a selection region.
    EnableSelectable(Identity, bool),
    /// Drop the queue's handle on a removed representation.
    ReleaseRepresentation(Arc<SceneRepresentation>),
}

/// Discriminant of a [`ChangeRequest`], for logs and tests.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// [`ChangeRequest::AddDrawable`]
    AddDrawable,
    /// [`ChangeRequest::RemoveDrawable`]
    RemoveDrawable,
    /// [`ChangeRequest::EnableDrawable`]
    EnableDrawable,
    /// [`ChangeRequest::SetFade`]
    SetFade,
    /// [`ChangeRequest::AddRenderTarget`]
    AddRenderTarget,
    /// [`ChangeRequest::RemoveRenderTarget`]
    RemoveRenderTarget,
    /// [`ChangeRequest::AttachToRenderTarget`]
    AttachToRenderTarget,
    /// [`ChangeRequest::AddSelectable`]
    AddSelectable,
    /// [`ChangeRequest::RemoveSelectable`]
    RemoveSelectable,
    /// [`ChangeRequest::EnableSelectable`]
    EnableSelectable,
    /// [`ChangeRequest::ReleaseRepresentation`]
    ReleaseRepresentation,
}

impl ChangeRequest {
    /// The request's discriminant.
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::AddDrawable(_) => RequestKind::AddDrawable,
            Self::RemoveDrawable(_) => RequestKind::RemoveDrawable,
            Self::EnableDrawable(..) => RequestKind::EnableDrawable,
            Self::SetFade(..) => RequestKind::SetFade,
            Self::AddRenderTarget(_) => RequestKind::AddRenderTarget,
            Self::RemoveRenderTarget(_) => RequestKind::RemoveRenderTarget,
            Self::AttachToRenderTarget { .. } => RequestKind::AttachToRenderTarget,
            Self::AddSelectable { .. } => RequestKind::AddSelectable,
            Self::RemoveSelectable(_) => RequestKind::RemoveSelectable,
            Self::EnableSelectable(..) => RequestKind::EnableSelectable,
            Self::ReleaseRepresentation(_) => RequestKind::ReleaseRepresentation,
        }
    }

    /// The identity the request is about.
    pub fn subject(&self) -> Identity {
        match self {
            Self::AddDrawable(d) => d.id,
            Self::RemoveDrawable(id)
            | Self::EnableDrawable(id, _)
            | Self::SetFade(id, _)
            | Self::AddRenderTarget(id)
            | Self::RemoveRenderTarget(id)
            | Self::AddSelectable { id, .. }
            | Self::RemoveSelectable(id)
            | Self::EnableSelectable(id, _) => *id,
            Self::AttachToRenderTarget { drawable, .. } => *drawable,
            Self::ReleaseRepresentation(rep) => rep.id,
        }
    }
}

/// An ordered batch of requests, applied atomically and in order.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    requests: Vec<ChangeRequest>,
}

impl ChangeSet {
    /// An empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request.
    pub fn push(&mut self, request: ChangeRequest) {
        self.requests.push(request);
    }

    /// Append all of `other`, keeping its order.
    pub fn append(&mut self, other: &mut Self) {
        self.requests.append(&mut other.requests);
    }

    /// Number of requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// True if the batch holds nothing.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Requests in order.
    pub fn iter(&self) -> std::slice::Iter<'_, ChangeRequest> {
        self.requests.iter()
    }
}

impl From<Vec<ChangeRequest>> for ChangeSet {
    fn from(requests: Vec<ChangeRequest>) -> Self {
        Self { requests }
    }
}

impl Extend<ChangeRequest> for ChangeSet {
    fn extend<I: IntoIterator<Item = ChangeRequest>>(&mut self, iter: I) {
        self.requests.extend(iter);
    }
}

impl IntoIterator for ChangeSet {
    type Item = ChangeRequest;
    type IntoIter = std::vec::IntoIter<ChangeRequest>;

    fn into_iter(self) -> Self::IntoIter {
        self.requests.into_iter()
    }
}

/// A submitted batch with its position in the global order.
#[derive(Debug)]
pub struct SequencedBatch {
    /// Submission sequence number; strictly increasing across the queue.
    pub sequence: u64,
    /// The requests.
    pub changes: ChangeSet,
}

/// Applies requests on the consumer side.
pub trait ChangeApplier {
    /// Apply one request.
    fn apply(&mut self, request: ChangeRequest);

    /// Apply a whole batch in order.
    fn apply_batch(&mut self, batch: SequencedBatch) {
        for request in batch.changes {
            self.apply(request);
        }
    }
}

#[derive(Debug, Default)]
struct QueueInner {
    batches: VecDeque<SequencedBatch>,
    next_sequence: u64,
}

/// Multi-producer, single-consumer FIFO of change batches.
///
/// Each submission is sequenced and enqueued under one lock, so batches never
/// interleave and the consumer sees them in submission order.
#[derive(Debug, Default)]
pub struct ChangeQueue {
    inner: Mutex<QueueInner>,
}

impl ChangeQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a batch. Empty batches are dropped and yield `None`.
    pub fn submit(&self, changes: ChangeSet) -> Option<u64> {
        if changes.is_empty() {
            return None;
        }
        let mut inner = self.inner.lock();
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.batches.push_back(SequencedBatch { sequence, changes });
        Some(sequence)
    }

    /// Enqueue a single request as its own batch.
    pub fn submit_one(&self, request: ChangeRequest) -> u64 {
        let mut inner = self.inner.lock();
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.batches.push_back(SequencedBatch {
            sequence,
            changes: ChangeSet::from(vec![request]),
        });
        sequence
    }

    /// Enqueue a batch only if `ticket` is still current.
    ///
    /// Stale batches are dropped and yield `None`.
    pub fn submit_if_current(&self, ticket: &GenerationTicket, changes: ChangeSet) -> Option<u64> {
        if !ticket.is_current() {
            log::debug!(
                "discarding {} changes computed for stale generation {}",
                changes.len(),
                ticket.generation()
            );
            return None;
        }
        self.submit(changes)
    }

    /// Number of batches waiting.
    pub fn pending(&self) -> usize {
        self.inner.lock().batches.len()
    }

    /// True if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().batches.is_empty()
    }

    /// Take every waiting batch, oldest first.
    pub fn drain(&self) -> Vec<SequencedBatch> {
        self.inner.lock().batches.drain(..).collect()
    }

    /// Drain and apply everything waiting. Returns the number of requests applied.
    ///
    /// The lock is released before applying, so producers are never blocked
    /// on the consumer.
    pub fn apply_pending<A: ChangeApplier + ?Sized>(&self, applier: &mut A) -> usize {
        let batches = self.drain();
        let mut applied = 0;
        for batch in batches {
            applied += batch.changes.len();
            applier.apply_batch(batch);
        }
        applied
    }
}

/// Render-side state of one drawable, as tracked by [`SceneState`].
#[derive(Clone, Debug, PartialEq)]
pub struct DrawableState {
    /// The drawable as created.
    pub drawable: Drawable,
    /// Current enable flag.
    pub enabled: bool,
    /// Last fade requested.
    pub fade: f32,
    /// Render target, if attached to one.
    pub target: Option<Identity>,
}

/// Reference consumer that tracks what a GPU layer would hold.
///
/// Requests that reference unknown identities are logged and ignored.
#[derive(Debug, Default)]
pub struct SceneState {
    drawables: HashMap<Identity, DrawableState>,
    render_targets: HashMap<Identity, Vec<Identity>>,
    selectables: HashMap<Identity, (Mbr<f64>, bool)>,
    released: usize,
    history: Vec<(RequestKind, Identity)>,
}

impl SceneState {
    /// An empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// A drawable's state, if it exists.
    pub fn drawable(&self, id: Identity) -> Option<&DrawableState> {
        self.drawables.get(&id)
    }

    /// Number of live drawables.
    pub fn drawable_count(&self) -> usize {
        self.drawables.len()
    }

    /// Live drawables that are enabled.
    pub fn enabled_drawables(&self) -> impl Iterator<Item = &DrawableState> + '_ {
        self.drawables.values().filter(|d| d.enabled)
    }

    /// Whether a render target exists.
    pub fn has_render_target(&self, id: Identity) -> bool {
        self.render_targets.contains_key(&id)
    }

    /// A selectable's bounds and enable flag.
    pub fn selectable(&self, id: Identity) -> Option<(Mbr<f64>, bool)> {
        self.selectables.get(&id).copied()
    }

    /// Number of live selectables.
    pub fn selectable_count(&self) -> usize {
        self.selectables.len()
    }

    /// Representations released so far.
    pub fn released(&self) -> usize {
        self.released
    }

    /// Every request applied so far, in order.
    pub fn history(&self) -> &[(RequestKind, Identity)] {
        &self.history
    }
}

impl ChangeApplier for SceneState {
    fn apply(&mut self, request: ChangeRequest) {
        self.history.push((request.kind(), request.subject()));
        match request {
            ChangeRequest::AddDrawable(drawable) => {
                let state = DrawableState {
                    enabled: drawable.enabled,
                    fade: drawable.fade,
                    target: None,
                    drawable,
                };
                self.drawables.insert(state.drawable.id, state);
            }
            ChangeRequest::RemoveDrawable(id) => match self.drawables.remove(&id) {
                Some(DrawableState {
                    target: Some(t), ..
                }) => {
                    if let Some(attached) = self.render_targets.get_mut(&t) {
                        attached.retain(|d| *d != id);
                    }
                }
                Some(_) => {}
                None => missing("remove drawable", id),
            },
            ChangeRequest::EnableDrawable(id, enabled) => match self.drawables.get_mut(&id) {
                Some(d) => d.enabled = enabled,
                None => missing("enable drawable", id),
            },
            ChangeRequest::SetFade(id, fade) => match self.drawables.get_mut(&id) {
                Some(d) => d.fade = fade,
                None => missing("set fade", id),
            },
            ChangeRequest::AddRenderTarget(id) => {
                self.render_targets.entry(id).or_default();
            }
            ChangeRequest::RemoveRenderTarget(id) => match self.render_targets.remove(&id) {
                Some(attached) => {
                    for d in attached {
                        if let Some(d) = self.drawables.get_mut(&d) {
                            d.target = None;
                        }
                    }
                }
                None => missing("remove render target", id),
            },
            ChangeRequest::AttachToRenderTarget { drawable, target } => {
                let (Some(d), Some(attached)) = (
                    self.drawables.get_mut(&drawable),
                    self.render_targets.get_mut(&target),
                ) else {
                    missing("attach to render target", drawable);
                    return;
                };
                d.target = Some(target);
                attached.push(drawable);
            }
            ChangeRequest::AddSelectable { id, bounds } => {
                self.selectables.insert(id, (bounds, true));
            }
            ChangeRequest::RemoveSelectable(id) => {
                if self.selectables.remove(&id).is_none() {
                    missing("remove selectable", id);
                }
            }
            ChangeRequest::EnableSelectable(id, enabled) => match self.selectables.get_mut(&id) {
                Some(s) => s.1 = enabled,
                None => missing("enable selectable", id),
            },
            ChangeRequest::ReleaseRepresentation(rep) => {
                log::trace!("releasing representation {}", rep.id);
                self.released += 1;
                drop(rep);
            }
        }
    }
}

fn missing(request: &str, id: Identity) {
    log::warn!("{request}: unknown identity {id}");
}
