use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::UpdatePolicy;

use super::descriptor::{DescriptorSet, EntityApi, EntityDescriptor, EntityStyle, RenderKey};

#[derive(Debug)]
struct LiveEntity<H> {
    handle: H,
    applied: EntityDescriptor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub failed: usize,
}

impl ReconcileStats {
    /// External calls issued, successful or not.
    pub fn entity_ops(&self) -> usize {
        self.created + self.updated + self.removed + self.failed
    }

    pub fn retained(&self) -> usize {
        self.updated + self.unchanged
    }

    pub(crate) fn accumulate(&mut self, other: ReconcileStats) {
        self.created += other.created;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.removed += other.removed;
        self.failed += other.failed;
    }
}

/// Keyed set of live display entities, diffed against each new frame.
#[derive(Debug)]
pub struct RenderGroup<H> {
    style: EntityStyle,
    policy: UpdatePolicy,
    entries: HashMap<RenderKey, LiveEntity<H>>,
}

impl<H> RenderGroup<H> {
    pub fn new(style: EntityStyle, policy: UpdatePolicy) -> Self {
        Self {
            style,
            policy,
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &RenderKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn handle(&self, key: &RenderKey) -> Option<&H> {
        self.entries.get(key).map(|entry| &entry.handle)
    }

    pub fn applied(&self, key: &RenderKey) -> Option<&EntityDescriptor> {
        self.entries.get(key).map(|entry| &entry.applied)
    }

    pub fn keys(&self) -> Vec<RenderKey> {
        let mut keys: Vec<RenderKey> = self.entries.keys().copied().collect();
        keys.sort();
        keys
    }

    /// Brings the live entities in line with `desired`: creates missing keys,
    /// refreshes retained keys in place and removes keys that disappeared.
    /// A failing call affects only its own key.
    pub fn reconcile<A>(
        &mut self,
        api: &mut A,
        world: &A::World,
        desired: &DescriptorSet,
    ) -> ReconcileStats
    where
        A: EntityApi<Handle = H>,
    {
        let mut stats = ReconcileStats::default();

        let mut stale: Vec<RenderKey> = self
            .entries
            .keys()
            .filter(|key| !desired.contains_key(key))
            .copied()
            .collect();
        stale.sort();
        for key in stale {
            if let Some(entry) = self.entries.remove(&key) {
                match api.remove(entry.handle) {
                    Ok(()) => stats.removed += 1,
                    Err(error) => {
                        stats.failed += 1;
                        warn!(?key, error = %error, "entity_remove_failed");
                    }
                }
            }
        }

        for (key, descriptor) in desired {
            match self.entries.get_mut(key) {
                Some(entry) => {
                    if self.policy == UpdatePolicy::SkipUnchanged && entry.applied == *descriptor {
                        stats.unchanged += 1;
                        continue;
                    }
                    match api.update(
                        &entry.handle,
                        &descriptor.transform,
                        descriptor.background_color,
                    ) {
                        Ok(()) => {
                            entry.applied = *descriptor;
                            stats.updated += 1;
                        }
                        Err(error) => {
                            stats.failed += 1;
                            warn!(?key, error = %error, "entity_update_failed");
                            if let Some(entry) = self.entries.remove(key) {
                                if let Err(error) = api.remove(entry.handle) {
                                    debug!(
                                        ?key,
                                        error = %error,
                                        "entity_remove_after_update_failed"
                                    );
                                }
                            }
                        }
                    }
                }
                None => match api.create(world, &self.style, descriptor) {
                    Ok(handle) => {
                        self.entries.insert(
                            *key,
                            LiveEntity {
                                handle,
                                applied: *descriptor,
                            },
                        );
                        stats.created += 1;
                    }
                    Err(error) => {
                        stats.failed += 1;
                        warn!(?key, error = %error, "entity_create_failed");
                    }
                },
            }
        }

        stats
    }

    /// Removes every live entity.
    pub fn clear<A>(&mut self, api: &mut A, world: &A::World) -> ReconcileStats
    where
        A: EntityApi<Handle = H>,
    {
        self.reconcile(api, world, &DescriptorSet::new())
    }
}
