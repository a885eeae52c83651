// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identities and the registry that hands them out.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Opaque identifier for drawables, selectables, render targets and
/// representations.
///
/// Identity `0` is never allocated and stands for "none".
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Identity(pub u64);

impl Identity {
    /// The "no identity" value.
    pub const NONE: Self = Self(0);

    /// Whether this is [`Identity::NONE`].
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out unique identities and interns shared strings.
///
/// Construct one per scene and pass it by `Arc` to every component that needs
/// identities. Allocation is lock-free; the string table sits behind a mutex.
#[derive(Debug)]
pub struct IdentityRegistry {
    next: AtomicU64,
    strings: Mutex<Interner>,
}

#[derive(Debug, Default)]
struct Interner {
    index: HashMap<Arc<str>, u32>,
    names: Vec<Arc<str>>,
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityRegistry {
    /// An empty registry. The first identity allocated is `#1`.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            strings: Mutex::new(Interner::default()),
        }
    }

    /// A fresh identity, unique for the lifetime of the registry.
    pub fn allocate(&self) -> Identity {
        Identity(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// `count` fresh identities, contiguous and ascending.
    pub fn allocate_many(&self, count: usize) -> Vec<Identity> {
        let first = self.next.fetch_add(count as u64, Ordering::Relaxed);
        (first..first + count as u64).map(Identity).collect()
    }

    /// Index of `name` in the string table, adding it if new.
    pub fn intern(&self, name: &str) -> u32 {
        let mut strings = self.strings.lock();
        if let Some(&i) = strings.index.get(name) {
            return i;
        }
        let i = u32::try_from(strings.names.len()).unwrap_or(u32::MAX);
        let name: Arc<str> = Arc::from(name);
        strings.names.push(Arc::clone(&name));
        strings.index.insert(name, i);
        i
    }

    /// The string behind an interned index.
    pub fn resolve(&self, index: u32) -> Option<Arc<str>> {
        self.strings.lock().names.get(index as usize).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities_are_unique_across_threads() {
        let registry = IdentityRegistry::new();
        let mut all: Vec<Identity> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| (0..250).map(|_| registry.allocate()).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 1000);
        assert!(!all.contains(&Identity::NONE), "zero is reserved");
    }

    #[test]
    fn batches_are_contiguous() {
        let registry = IdentityRegistry::new();
        let a = registry.allocate();
        let batch = registry.allocate_many(3);
        assert_eq!(batch, [Identity(a.0 + 1), Identity(a.0 + 2), Identity(a.0 + 3)]);
        assert!(registry.allocate_many(0).is_empty());
    }

    #[test]
    fn interning_is_stable() {
        let registry = IdentityRegistry::new();
        let a = registry.intern("roads");
        let b = registry.intern("rivers");
        assert_ne!(a, b);
        assert_eq!(registry.intern("roads"), a);
        assert_eq!(registry.resolve(b).as_deref(), Some("rivers"));
        assert!(registry.resolve(99).is_none());
    }
}
