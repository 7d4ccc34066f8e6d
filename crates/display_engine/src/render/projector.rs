use std::f32::consts::PI;

use glam::{Mat4, Vec3, Vec4};

use crate::config::PlaybackConfig;
use crate::frames::Frame;

use super::descriptor::{
    Billboard, Brightness, DescriptorSet, EntityDescriptor, RenderKey, Side,
};

/// Maps a text display's background quad onto the unit square: one space
/// glyph is 1/8 block wide and 1/4 block tall, offset 0.1 to the left.
pub const TEXT_DISPLAY_UNIT_SQUARE: Mat4 = Mat4::from_cols(
    Vec4::new(8.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 4.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 1.0, 0.0),
    Vec4::new(0.4, 0.0, 0.0, 1.0),
);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionConfig {
    pub scale: f32,
    pub offset: Vec3,
    pub double_sided: bool,
    pub brightness: Brightness,
    pub billboard: Billboard,
}

impl ProjectionConfig {
    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self {
            scale: config.scale,
            offset: Vec3::new(config.x_offset, config.height_above_anchor, config.z_offset),
            double_sided: config.double_sided,
            brightness: Brightness::uniform(config.brightness),
            billboard: if config.billboard {
                Billboard::Center
            } else {
                Billboard::Fixed
            },
        }
    }
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self::from_config(&PlaybackConfig::default())
    }
}

/// Projects every lit pixel of `frame` onto a vertical plane centred above
/// `anchor_position`. Unlit pixels produce no descriptor.
pub fn project_frame(
    frame: &Frame,
    anchor_position: Vec3,
    config: &ProjectionConfig,
) -> DescriptorSet {
    let mut descriptors = DescriptorSet::new();
    let width = frame.width();
    let height = frame.height();
    if width == 0 || height == 0 {
        return descriptors;
    }

    let position = anchor_position + config.offset;
    let pixel_scale = Mat4::from_scale(Vec3::new(
        config.scale / width as f32,
        config.scale / height as f32,
        1.0,
    ));
    let quad = pixel_scale * TEXT_DISPLAY_UNIT_SQUARE;
    let flip = Mat4::from_rotation_y(PI);

    for y in 0..height {
        for x in 0..width {
            let u = x as f32 / width as f32;
            let v = y as f32 / height as f32;
            let Some(color) = frame.pixel(x, y) else {
                continue;
            };
            if color.is_unlit() {
                continue;
            }

            let translation = Mat4::from_translation(Vec3::new(
                (u - 0.5) * config.scale,
                (v - 0.5) * config.scale,
                0.0,
            ));
            let base = EntityDescriptor {
                position,
                transform: translation * quad,
                background_color: color,
                brightness: config.brightness,
                billboard: config.billboard,
            };
            descriptors.insert(RenderKey::new(Side::Forward, x, y), base);

            if config.double_sided {
                descriptors.insert(
                    RenderKey::new(Side::Backward, x, y),
                    EntityDescriptor {
                        transform: translation * flip * quad,
                        ..base
                    },
                );
            }
        }
    }

    descriptors
}
