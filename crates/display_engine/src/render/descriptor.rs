use std::collections::BTreeMap;

use glam::{Mat4, Vec3};
use thiserror::Error;

use crate::frames::Rgba;

/// Which face of a double-sided display a pixel entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Forward,
    Backward,
}

/// Stable slot identity: the same key maps to the same entity across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderKey {
    pub side: Side,
    pub column: u32,
    pub row: u32,
}

impl RenderKey {
    pub const fn new(side: Side, column: u32, row: u32) -> Self {
        Self { side, column, row }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Billboard {
    #[default]
    Fixed,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brightness {
    pub block: u8,
    pub sky: u8,
}

impl Brightness {
    pub const fn uniform(level: u8) -> Self {
        Self {
            block: level,
            sky: level,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityDescriptor {
    pub position: Vec3,
    pub transform: Mat4,
    pub background_color: Rgba,
    pub brightness: Brightness,
    pub billboard: Billboard,
}

/// Fields written once when an entity is created and never refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityStyle {
    pub glyph: String,
    pub teleport_duration: u32,
    pub interpolation_duration: u32,
}

impl Default for EntityStyle {
    fn default() -> Self {
        Self {
            glyph: " ".to_string(),
            teleport_duration: 1,
            interpolation_duration: 1,
        }
    }
}

pub type DescriptorSet = BTreeMap<RenderKey, EntityDescriptor>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityApiError {
    #[error("entity api rejected the call: {0}")]
    Rejected(String),
    #[error("entity handle no longer refers to a live entity")]
    StaleHandle,
}

/// Host-owned display entities. Calls are synchronous; a fault on one call
/// is reported and never unwinds the caller.
pub trait EntityApi {
    type World;
    type Handle;

    /// Spawns an entity with its static style, then applies the descriptor.
    fn create(
        &mut self,
        world: &Self::World,
        style: &EntityStyle,
        descriptor: &EntityDescriptor,
    ) -> Result<Self::Handle, EntityApiError>;

    /// Refreshes transform and background color only.
    fn update(
        &mut self,
        handle: &Self::Handle,
        transform: &Mat4,
        background_color: Rgba,
    ) -> Result<(), EntityApiError>;

    fn remove(&mut self, handle: Self::Handle) -> Result<(), EntityApiError>;
}
