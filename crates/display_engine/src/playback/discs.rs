use crate::config::PlaybackConfig;

/// Material of the custom video disc.
pub const CUSTOM_DISC_MATERIAL: &str = "music_disc_13";
/// Identifier tag carried by the custom video disc.
pub const CUSTOM_DISC_TAG: &str = "music_disc";
/// Untagged material accepted when regular discs are enabled.
pub const REGULAR_DISC_MATERIAL: &str = "music_disc_blocks";

/// Item as seen by the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscItem {
    pub material: String,
    pub custom_tag: Option<String>,
}

impl DiscItem {
    pub fn plain(material: impl Into<String>) -> Self {
        Self {
            material: material.into(),
            custom_tag: None,
        }
    }

    pub fn tagged(material: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            material: material.into(),
            custom_tag: Some(tag.into()),
        }
    }

    pub fn is_music_disc(&self) -> bool {
        self.material.starts_with("music_disc_")
    }
}

/// Decides whether an inserted item should start video playback.
pub trait DiscRecognizer {
    fn recognizes(&self, item: &DiscItem) -> bool;
}

/// Matches one material carrying one identifier tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedDisc {
    pub material: String,
    pub tag: String,
}

impl Default for TaggedDisc {
    fn default() -> Self {
        Self {
            material: CUSTOM_DISC_MATERIAL.to_string(),
            tag: CUSTOM_DISC_TAG.to_string(),
        }
    }
}

impl DiscRecognizer for TaggedDisc {
    fn recognizes(&self, item: &DiscItem) -> bool {
        item.material == self.material && item.custom_tag.as_deref() == Some(self.tag.as_str())
    }
}

/// Matches a material regardless of tags. With no material set, any music
/// disc matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterialDisc {
    pub material: Option<String>,
}

impl DiscRecognizer for MaterialDisc {
    fn recognizes(&self, item: &DiscItem) -> bool {
        match &self.material {
            Some(material) => item.material == *material,
            None => item.is_music_disc(),
        }
    }
}

/// Matches when any inner recognizer does.
#[derive(Default)]
pub struct AnyDisc {
    recognizers: Vec<Box<dyn DiscRecognizer>>,
}

impl AnyDisc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, recognizer: impl DiscRecognizer + 'static) -> Self {
        self.recognizers.push(Box::new(recognizer));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.recognizers.is_empty()
    }
}

impl DiscRecognizer for AnyDisc {
    fn recognizes(&self, item: &DiscItem) -> bool {
        self.recognizers
            .iter()
            .any(|recognizer| recognizer.recognizes(item))
    }
}

impl std::fmt::Debug for AnyDisc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyDisc")
            .field("recognizers", &self.recognizers.len())
            .finish()
    }
}

/// Builds the recognizer selected by `use_custom_disc` and
/// `accept_regular_discs`. With both off, nothing is recognized.
pub fn recognizer_from_config(config: &PlaybackConfig) -> AnyDisc {
    let mut recognizer = AnyDisc::new();
    if config.use_custom_disc {
        recognizer = recognizer.with(TaggedDisc::default());
    }
    if config.accept_regular_discs {
        recognizer = recognizer.with(MaterialDisc {
            material: Some(REGULAR_DISC_MATERIAL.to_string()),
        });
    }
    recognizer
}
