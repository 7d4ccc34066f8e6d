mod descriptor;
mod group;
mod projector;

pub use descriptor::{
    Billboard, Brightness, DescriptorSet, EntityApi, EntityApiError, EntityDescriptor,
    EntityStyle, RenderKey, Side,
};
pub use group::{ReconcileStats, RenderGroup};
pub use projector::{project_frame, ProjectionConfig, TEXT_DISPLAY_UNIT_SQUARE};
