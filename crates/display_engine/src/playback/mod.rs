mod anchor;
mod clock;
mod discs;
mod manager;
mod session;
mod triggers;

pub use anchor::AnchorKey;
pub use clock::FrameClock;
pub use discs::{
    recognizer_from_config, AnyDisc, DiscItem, DiscRecognizer, MaterialDisc, TaggedDisc,
    CUSTOM_DISC_MATERIAL, CUSTOM_DISC_TAG, REGULAR_DISC_MATERIAL,
};
pub use manager::{PlaybackHost, PlaybackManager, StartOutcome, StopReason, TickReport};
pub use session::PlaybackSession;
pub use triggers::{
    IgnoreReason, TriggerDisposition, TriggerEvent, TriggerOutcome, TriggerScheduler,
};
