//! Recording entity host shared by unit tests.

use std::collections::{BTreeSet, HashMap, HashSet};

use glam::Mat4;

use crate::frames::Rgba;
use crate::playback::{AnchorKey, PlaybackHost};
use crate::render::{EntityApi, EntityApiError, EntityDescriptor, EntityStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FakeHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityCall {
    Created(FakeHandle),
    Updated(FakeHandle),
    Removed(FakeHandle),
}

#[derive(Debug, Clone)]
pub struct FakeEntity {
    pub world: u32,
    pub style: EntityStyle,
    pub descriptor: EntityDescriptor,
}

#[derive(Debug, Default)]
pub struct FakeHost {
    next_id: u64,
    pub live: HashMap<FakeHandle, FakeEntity>,
    pub calls: Vec<EntityCall>,
    pub fail_create_colors: HashSet<Rgba>,
    pub fail_update_handles: HashSet<FakeHandle>,
    pub fail_remove_handles: HashSet<FakeHandle>,
    pub inactive: HashSet<AnchorKey>,
    pub started: Vec<AnchorKey>,
}

impl FakeHost {
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn created_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, EntityCall::Created(_)))
            .count()
    }

    pub fn updated_handles(&self) -> BTreeSet<FakeHandle> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                EntityCall::Updated(handle) => Some(*handle),
                _ => None,
            })
            .collect()
    }

    pub fn removed_handles(&self) -> BTreeSet<FakeHandle> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                EntityCall::Removed(handle) => Some(*handle),
                _ => None,
            })
            .collect()
    }

    pub fn live_colors(&self) -> Vec<Rgba> {
        self.live
            .values()
            .map(|entity| entity.descriptor.background_color)
            .collect()
    }
}

impl EntityApi for FakeHost {
    type World = u32;
    type Handle = FakeHandle;

    fn create(
        &mut self,
        world: &u32,
        style: &EntityStyle,
        descriptor: &EntityDescriptor,
    ) -> Result<FakeHandle, EntityApiError> {
        if self.fail_create_colors.contains(&descriptor.background_color) {
            return Err(EntityApiError::Rejected("create refused".to_string()));
        }
        self.next_id += 1;
        let handle = FakeHandle(self.next_id);
        self.live.insert(
            handle,
            FakeEntity {
                world: *world,
                style: style.clone(),
                descriptor: *descriptor,
            },
        );
        self.calls.push(EntityCall::Created(handle));
        Ok(handle)
    }

    fn update(
        &mut self,
        handle: &FakeHandle,
        transform: &Mat4,
        background_color: Rgba,
    ) -> Result<(), EntityApiError> {
        if self.fail_update_handles.contains(handle) {
            return Err(EntityApiError::Rejected("update refused".to_string()));
        }
        let entity = self.live.get_mut(handle).ok_or(EntityApiError::StaleHandle)?;
        entity.descriptor.transform = *transform;
        entity.descriptor.background_color = background_color;
        self.calls.push(EntityCall::Updated(*handle));
        Ok(())
    }

    fn remove(&mut self, handle: FakeHandle) -> Result<(), EntityApiError> {
        if self.fail_remove_handles.contains(&handle) {
            return Err(EntityApiError::Rejected("remove refused".to_string()));
        }
        self.live.remove(&handle).ok_or(EntityApiError::StaleHandle)?;
        self.calls.push(EntityCall::Removed(handle));
        Ok(())
    }
}

impl PlaybackHost for FakeHost {
    fn is_source_active(&self, anchor: AnchorKey, _world: &u32) -> bool {
        !self.inactive.contains(&anchor)
    }

    fn playback_started(&mut self, anchor: AnchorKey, _world: &u32) {
        self.started.push(anchor);
    }
}
