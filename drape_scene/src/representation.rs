// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bookkeeping records for one logical add.

use std::collections::BTreeSet;

use crate::identity::Identity;

/// Everything one `add` call produced, so a later remove or enable can find it.
///
/// Managers hold representations as `Arc<SceneRepresentation>`. Removal hands
/// the last manager-side handle to the change queue inside a
/// [`ChangeRequest::ReleaseRepresentation`](crate::ChangeRequest::ReleaseRepresentation),
/// so the record is dropped only once the consumer has applied the removal.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneRepresentation {
    /// Identity returned to the caller of `add`.
    pub id: Identity,
    /// Drawables created for this add.
    pub drawables: BTreeSet<Identity>,
    /// Selection objects created for this add.
    pub selectables: BTreeSet<Identity>,
    /// Fade applied on enable and disable, in seconds.
    pub fade: f32,
    /// Current enable state.
    pub enabled: bool,
}

impl SceneRepresentation {
    /// An empty representation.
    pub fn new(id: Identity) -> Self {
        Self {
            id,
            drawables: BTreeSet::new(),
            selectables: BTreeSet::new(),
            fade: 0.0,
            enabled: true,
        }
    }

    /// Whether `id` is one of this representation's drawables or selectables.
    pub fn owns(&self, id: Identity) -> bool {
        self.drawables.contains(&id) || self.selectables.contains(&id)
    }
}
