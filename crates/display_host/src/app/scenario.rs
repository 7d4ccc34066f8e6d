use std::fmt::Display;
use std::fs;
use std::path::Path;

use display_engine::{AnchorKey, DiscItem, CUSTOM_DISC_MATERIAL, CUSTOM_DISC_TAG};
use serde::{Deserialize, Serialize};

pub(crate) type ScenarioResult<T> = Result<T, String>;

/// Scripted session for the headless host: where jukeboxes stand and what
/// happens to them on which tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Scenario {
    pub(crate) total_ticks: u64,
    /// Pace ticks in real time instead of running them back to back.
    pub(crate) realtime: bool,
    pub(crate) entity_limit: Option<usize>,
    pub(crate) jukeboxes: Vec<JukeboxSpec>,
    pub(crate) events: Vec<ScriptedEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct JukeboxSpec {
    pub(crate) at: [i32; 3],
    #[serde(default)]
    pub(crate) world: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ScriptedEvent {
    pub(crate) tick: u64,
    #[serde(flatten)]
    pub(crate) action: ScriptedAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum ScriptedAction {
    Insert {
        at: [i32; 3],
        #[serde(default)]
        disc: DiscSpec,
    },
    FeederInsert {
        at: [i32; 3],
        #[serde(default)]
        disc: DiscSpec,
    },
    Eject {
        at: [i32; 3],
    },
    Break {
        at: [i32; 3],
    },
    ReloadFrames,
}

impl ScriptedAction {
    pub(crate) fn anchor(&self) -> Option<AnchorKey> {
        match self {
            Self::Insert { at, .. }
            | Self::FeederInsert { at, .. }
            | Self::Eject { at }
            | Self::Break { at } => Some(anchor_at(*at)),
            Self::ReloadFrames => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DiscSpec {
    pub(crate) material: String,
    #[serde(default)]
    pub(crate) tag: Option<String>,
}

impl Default for DiscSpec {
    fn default() -> Self {
        Self {
            material: CUSTOM_DISC_MATERIAL.to_string(),
            tag: Some(CUSTOM_DISC_TAG.to_string()),
        }
    }
}

impl DiscSpec {
    pub(crate) fn to_item(&self) -> DiscItem {
        DiscItem {
            material: self.material.clone(),
            custom_tag: self.tag.clone(),
        }
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            total_ticks: 400,
            realtime: false,
            entity_limit: None,
            jukeboxes: Vec::new(),
            events: Vec::new(),
        }
    }
}

pub(crate) fn anchor_at(at: [i32; 3]) -> AnchorKey {
    AnchorKey::new(at[0], at[1], at[2])
}

impl Scenario {
    /// Two jukeboxes: one played by hand and ejected, one fed automatically
    /// and then broken.
    pub(crate) fn demo() -> Self {
        let manual = [0, 64, 0];
        let fed = [16, 64, 0];
        Self {
            jukeboxes: vec![
                JukeboxSpec { at: manual, world: 0 },
                JukeboxSpec { at: fed, world: 0 },
            ],
            events: vec![
                ScriptedEvent {
                    tick: 1,
                    action: ScriptedAction::Insert {
                        at: manual,
                        disc: DiscSpec::default(),
                    },
                },
                ScriptedEvent {
                    tick: 40,
                    action: ScriptedAction::FeederInsert {
                        at: fed,
                        disc: DiscSpec::default(),
                    },
                },
                ScriptedEvent {
                    tick: 240,
                    action: ScriptedAction::Break { at: fed },
                },
                ScriptedEvent {
                    tick: 320,
                    action: ScriptedAction::Eject { at: manual },
                },
            ],
            ..Self::default()
        }
    }

    pub(crate) fn load(path: &Path) -> ScenarioResult<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|error| format!("read scenario '{}': {error}", path.display()))?;
        let scenario = Self::parse_json(&raw)?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn parse_json(raw: &str) -> ScenarioResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        match serde_path_to_error::deserialize::<_, Scenario>(&mut deserializer) {
            Ok(scenario) => Ok(scenario),
            Err(error) => {
                let path = error.path().to_string();
                let source = error.into_inner();
                if path.is_empty() || path == "." {
                    Err(format!("parse scenario json: {source}"))
                } else {
                    Err(format!("parse scenario json at {path}: {source}"))
                }
            }
        }
    }

    pub(crate) fn validate(&self) -> ScenarioResult<()> {
        if self.total_ticks == 0 {
            return Err(expected_actual("total_ticks", "at least 1", self.total_ticks));
        }
        if self.entity_limit == Some(0) {
            return Err(expected_actual("entity_limit", "at least 1 or null", 0));
        }
        for (index, event) in self.events.iter().enumerate() {
            if event.tick >= self.total_ticks {
                return Err(expected_actual(
                    &format!("events[{index}].tick"),
                    format!("below total_ticks {}", self.total_ticks),
                    event.tick,
                ));
            }
        }
        Ok(())
    }

    /// Events ordered by tick, keeping script order within a tick.
    pub(crate) fn timeline(&self) -> Vec<ScriptedEvent> {
        let mut events = self.events.clone();
        events.sort_by_key(|event| event.tick);
        events
    }
}

fn validation_err(path: &str, message: impl Into<String>) -> String {
    format!("validation failed at {path}: {}", message.into())
}

fn expected_actual(path: &str, expected: impl Display, actual: impl Display) -> String {
    validation_err(path, format!("expected {expected}, got {actual}"))
}
