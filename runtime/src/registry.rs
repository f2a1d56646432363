//! Registry of in-flight cancellable effects.
//!
//! Every leaf of an [`Effect::Cancellable`](postsync_core::effect::Effect::Cancellable)
//! counts as one live registration under the effect's id. The entry is dropped
//! when the last leaf finishes or when the id is cancelled. Registering a
//! different token under an id that is still live cancels the older token
//! first, so at most one generation of work runs per id.

use postsync_core::{CancellationToken, EffectId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

struct Registration {
    token: CancellationToken,
    live: usize,
}

/// Thread-safe map from effect id to the token guarding it.
#[derive(Clone, Default)]
pub struct CancellationRegistry {
    entries: Arc<Mutex<HashMap<EffectId, Registration>>>,
}

impl CancellationRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more live leaf for `id` guarded by `token`.
    ///
    /// Returns `true` if an older, different token had to be cancelled.
    pub fn register(&self, id: &EffectId, token: &CancellationToken) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        match entries.get_mut(id) {
            Some(existing) if existing.token.same_as(token) => {
                existing.live += 1;
                false
            },
            Some(existing) => {
                existing.token.cancel();
                *existing = Registration {
                    token: token.clone(),
                    live: 1,
                };
                true
            },
            None => {
                entries.insert(
                    id.clone(),
                    Registration {
                        token: token.clone(),
                        live: 1,
                    },
                );
                false
            },
        }
    }

    /// Release one live leaf of `id`, if `token` is still the registered one.
    pub fn release(&self, id: &EffectId, token: &CancellationToken) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        let drained = match entries.get_mut(id) {
            Some(existing) if existing.token.same_as(token) => {
                existing.live = existing.live.saturating_sub(1);
                existing.live == 0
            },
            _ => false,
        };

        if drained {
            entries.remove(id);
        }
    }

    /// Cancel and forget the token registered under `id`.
    ///
    /// Returns `false` if nothing was registered.
    pub fn cancel(&self, id: &EffectId) -> bool {
        let removed = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);

        removed.is_some_and(|registration| {
            registration.token.cancel();
            true
        })
    }

    /// Whether an effect is currently registered under `id`.
    #[must_use]
    pub fn contains(&self, id: &EffectId) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Number of ids with live effects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no cancellable effect is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CancellationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationRegistry")
            .field("live_ids", &self.len())
            .finish()
    }
}
