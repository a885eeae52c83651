// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The shared scene-manager façade.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::change::{ChangeQueue, ChangeRequest, ChangeSet};
use crate::generation::ViewGeneration;
use crate::identity::{Identity, IdentityRegistry};
use crate::representation::SceneRepresentation;

/// Handles shared by every manager of one scene.
#[derive(Clone, Debug, Default)]
pub struct SceneContext {
    /// Identity allocator.
    pub registry: Arc<IdentityRegistry>,
    /// Queue drained by the render thread.
    pub queue: Arc<ChangeQueue>,
    /// View generation, for discarding stale layout.
    pub generation: ViewGeneration,
}

impl SceneContext {
    /// A fresh registry, queue and generation counter.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Operations every feature manager supports.
///
/// `add` is per manager, since features and styles differ by type. All
/// methods take `&self` and may be called from any thread.
pub trait SceneManager: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Remove representations and everything they created.
    ///
    /// Removing an identity this manager never returned is a caller bug: it
    /// asserts in debug builds and is logged and skipped otherwise.
    fn remove(&self, ids: &[Identity]);

    /// Show or hide representations.
    fn enable(&self, ids: &[Identity], enabled: bool);

    /// The current record for `id`.
    fn representation(&self, id: Identity) -> Option<Arc<SceneRepresentation>>;

    /// Number of live representations.
    fn representation_count(&self) -> usize;
}

/// A live representation plus whatever the manager keeps beside it.
#[derive(Debug)]
pub(crate) struct Record<X> {
    pub(crate) rep: Arc<SceneRepresentation>,
    pub(crate) extra: X,
}

/// Representation table and queue plumbing shared by the managers.
///
/// Changes are submitted while the table lock is held, so for any one
/// representation the queue sees its add, enables and removal in the order
/// they happened.
#[derive(Debug)]
pub(crate) struct ManagerCore<X> {
    name: &'static str,
    context: SceneContext,
    records: Mutex<HashMap<Identity, Record<X>>>,
}

impl<X> ManagerCore<X> {
    pub(crate) fn new(name: &'static str, context: SceneContext) -> Self {
        Self {
            name,
            context,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn context(&self) -> &SceneContext {
        &self.context
    }

    /// Record `rep`, submit `changes`, then run `then` before releasing the lock.
    pub(crate) fn insert(
        &self,
        rep: SceneRepresentation,
        extra: X,
        changes: ChangeSet,
        then: impl FnOnce(&SceneRepresentation, &X),
    ) -> Identity {
        let id = rep.id;
        let mut records = self.records.lock();
        self.context.queue.submit(changes);
        let record = Record {
            rep: Arc::new(rep),
            extra,
        };
        then(&record.rep, &record.extra);
        records.insert(id, record);
        log::trace!("{}: added representation {id}", self.name);
        id
    }

    /// Drop representations and queue their teardown.
    ///
    /// `teardown` runs first for each record and may add its own requests.
    /// The release of the representation is always the last request for it.
    pub(crate) fn remove(
        &self,
        ids: &[Identity],
        mut teardown: impl FnMut(&SceneRepresentation, &X, &mut ChangeSet),
    ) {
        let mut records = self.records.lock();
        let mut changes = ChangeSet::new();
        for &id in ids {
            let Some(Record { rep, extra }) = records.remove(&id) else {
                log::warn!("{}: remove of unknown representation {id}", self.name);
                debug_assert!(false, "remove of unknown representation {id}");
                continue;
            };
            teardown(&rep, &extra, &mut changes);
            for &d in &rep.drawables {
                changes.push(ChangeRequest::RemoveDrawable(d));
            }
            for &s in &rep.selectables {
                changes.push(ChangeRequest::RemoveSelectable(s));
            }
            changes.push(ChangeRequest::ReleaseRepresentation(rep));
        }
        self.context.queue.submit(changes);
    }

    /// Flip the enable state of representations.
    ///
    /// `toggle` produces the requests for one record; see [`enable_changes`].
    pub(crate) fn enable(
        &self,
        ids: &[Identity],
        enabled: bool,
        mut toggle: impl FnMut(&SceneRepresentation, &X, &mut ChangeSet),
    ) {
        let mut records = self.records.lock();
        let mut changes = ChangeSet::new();
        for &id in ids {
            let Some(record) = records.get_mut(&id) else {
                log::warn!("{}: enable of unknown representation {id}", self.name);
                continue;
            };
            if record.rep.enabled == enabled {
                continue;
            }
            Arc::make_mut(&mut record.rep).enabled = enabled;
            toggle(&record.rep, &record.extra, &mut changes);
        }
        self.context.queue.submit(changes);
    }

    pub(crate) fn get(&self, id: Identity) -> Option<Arc<SceneRepresentation>> {
        self.records.lock().get(&id).map(|r| Arc::clone(&r.rep))
    }

    pub(crate) fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Run `f` over every live record with the table locked.
    pub(crate) fn for_each(&self, mut f: impl FnMut(&SceneRepresentation, &X)) {
        for record in self.records.lock().values() {
            f(&record.rep, &record.extra);
        }
    }
}

/// The plain enable toggle: fade, then every drawable and selectable.
pub(crate) fn enable_changes(rep: &SceneRepresentation, enabled: bool, changes: &mut ChangeSet) {
    for &d in &rep.drawables {
        if rep.fade > 0.0 {
            changes.push(ChangeRequest::SetFade(d, rep.fade));
        }
        changes.push(ChangeRequest::EnableDrawable(d, enabled));
    }
    for &s in &rep.selectables {
        changes.push(ChangeRequest::EnableSelectable(s, enabled));
    }
}
