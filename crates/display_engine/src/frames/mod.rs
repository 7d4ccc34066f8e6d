mod frame;
mod store;

pub use frame::{Frame, FrameError, Rgba};
pub use store::{load_frames, FrameDecodeError, FrameLoadError, FrameLoadOptions, FrameStore};
