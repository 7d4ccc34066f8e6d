use std::collections::{BTreeMap, HashMap};
use std::fmt;

use display_engine::{
    AnchorKey, AnyDisc, Billboard, Brightness, DiscItem, DiscRecognizer, EntityApi,
    EntityApiError, EntityDescriptor, EntityStyle, PlaybackHost, Rgba,
};
use glam::{Mat4, Vec3};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct WorldId(pub u32);

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "world#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct DisplayEntityId(pub u64);

#[derive(Debug, Default)]
struct DisplayEntityIdAllocator {
    next: u64,
}

impl DisplayEntityIdAllocator {
    fn allocate(&mut self) -> DisplayEntityId {
        let id = DisplayEntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// A text display entity as the world stores it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DisplayEntity {
    pub(crate) world: WorldId,
    pub(crate) position: Vec3,
    pub(crate) transform: Mat4,
    pub(crate) background_color: Rgba,
    pub(crate) brightness: Brightness,
    pub(crate) billboard: Billboard,
    pub(crate) text: String,
    pub(crate) teleport_duration: u32,
    pub(crate) interpolation_duration: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Jukebox {
    pub(crate) world: WorldId,
    pub(crate) record: Option<DiscItem>,
}

impl Jukebox {
    pub(crate) fn is_playing(&self) -> bool {
        self.record.as_ref().is_some_and(DiscItem::is_music_disc)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WorldActionError {
    NoJukebox(AnchorKey),
    Occupied(AnchorKey),
    Empty(AnchorKey),
}

impl fmt::Display for WorldActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoJukebox(anchor) => write!(f, "no jukebox at {anchor}"),
            Self::Occupied(anchor) => write!(f, "jukebox at {anchor} already holds a record"),
            Self::Empty(anchor) => write!(f, "jukebox at {anchor} holds no record"),
        }
    }
}

/// In-memory block world: jukeboxes plus the display entities spawned for
/// playback.
#[derive(Debug)]
pub(crate) struct SimWorld {
    allocator: DisplayEntityIdAllocator,
    entities: BTreeMap<DisplayEntityId, DisplayEntity>,
    jukeboxes: HashMap<AnchorKey, Jukebox>,
    recognizer: AnyDisc,
    entity_limit: Option<usize>,
    started: Vec<AnchorKey>,
}

impl SimWorld {
    pub(crate) fn new(recognizer: AnyDisc) -> Self {
        Self {
            allocator: DisplayEntityIdAllocator::default(),
            entities: BTreeMap::new(),
            jukeboxes: HashMap::new(),
            recognizer,
            entity_limit: None,
            started: Vec::new(),
        }
    }

    pub(crate) fn with_entity_limit(mut self, limit: Option<usize>) -> Self {
        self.entity_limit = limit;
        self
    }

    pub(crate) fn place_jukebox(&mut self, anchor: AnchorKey, world: WorldId) {
        self.jukeboxes.insert(
            anchor,
            Jukebox {
                world,
                record: None,
            },
        );
    }

    pub(crate) fn insert_disc(
        &mut self,
        anchor: AnchorKey,
        item: DiscItem,
    ) -> Result<WorldId, WorldActionError> {
        let jukebox = self
            .jukeboxes
            .get_mut(&anchor)
            .ok_or(WorldActionError::NoJukebox(anchor))?;
        if jukebox.record.is_some() {
            return Err(WorldActionError::Occupied(anchor));
        }
        jukebox.record = Some(item);
        Ok(jukebox.world)
    }

    pub(crate) fn eject_disc(
        &mut self,
        anchor: AnchorKey,
    ) -> Result<(WorldId, DiscItem), WorldActionError> {
        let jukebox = self
            .jukeboxes
            .get_mut(&anchor)
            .ok_or(WorldActionError::NoJukebox(anchor))?;
        let record = jukebox.record.take().ok_or(WorldActionError::Empty(anchor))?;
        Ok((jukebox.world, record))
    }

    pub(crate) fn break_jukebox(&mut self, anchor: AnchorKey) -> Result<Jukebox, WorldActionError> {
        self.jukeboxes
            .remove(&anchor)
            .ok_or(WorldActionError::NoJukebox(anchor))
    }

    pub(crate) fn entity_count(&self) -> usize {
        self.entities.len()
    }

    #[cfg(test)]
    pub(crate) fn entity(&self, id: DisplayEntityId) -> Option<&DisplayEntity> {
        self.entities.get(&id)
    }

    pub(crate) fn started(&self) -> &[AnchorKey] {
        &self.started
    }
}

impl EntityApi for SimWorld {
    type World = WorldId;
    type Handle = DisplayEntityId;

    fn create(
        &mut self,
        world: &WorldId,
        style: &EntityStyle,
        descriptor: &EntityDescriptor,
    ) -> Result<DisplayEntityId, EntityApiError> {
        if let Some(limit) = self.entity_limit {
            if self.entities.len() >= limit {
                return Err(EntityApiError::Rejected(format!(
                    "entity limit {limit} reached"
                )));
            }
        }
        let id = self.allocator.allocate();
        self.entities.insert(
            id,
            DisplayEntity {
                world: *world,
                position: descriptor.position,
                transform: descriptor.transform,
                background_color: descriptor.background_color,
                brightness: descriptor.brightness,
                billboard: descriptor.billboard,
                text: style.glyph.clone(),
                teleport_duration: style.teleport_duration,
                interpolation_duration: style.interpolation_duration,
            },
        );
        Ok(id)
    }

    fn update(
        &mut self,
        handle: &DisplayEntityId,
        transform: &Mat4,
        background_color: Rgba,
    ) -> Result<(), EntityApiError> {
        let entity = self
            .entities
            .get_mut(handle)
            .ok_or(EntityApiError::StaleHandle)?;
        entity.transform = *transform;
        entity.background_color = background_color;
        Ok(())
    }

    fn remove(&mut self, handle: DisplayEntityId) -> Result<(), EntityApiError> {
        self.entities
            .remove(&handle)
            .map(|_| ())
            .ok_or(EntityApiError::StaleHandle)
    }
}

impl PlaybackHost for SimWorld {
    fn is_source_active(&self, anchor: AnchorKey, world: &WorldId) -> bool {
        match self.jukeboxes.get(&anchor) {
            Some(jukebox) if jukebox.world == *world && jukebox.is_playing() => jukebox
                .record
                .as_ref()
                .is_some_and(|record| self.recognizer.recognizes(record)),
            Some(_) => false,
            None => {
                debug!(%anchor, %world, "jukebox_missing");
                false
            }
        }
    }

    fn playback_started(&mut self, anchor: AnchorKey, world: &WorldId) {
        info!(%anchor, %world, "video_started_above_jukebox");
        self.started.push(anchor);
    }
}
