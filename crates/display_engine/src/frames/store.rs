use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::ImageReader;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::PlaybackConfig;

use super::frame::Frame;

#[derive(Debug, Error)]
pub enum FrameLoadError {
    #[error("frame directory does not exist: {path}")]
    Missing { path: PathBuf },
    #[error("frame path is not a directory: {path}")]
    NotADirectory { path: PathBuf },
    #[error("failed to read frame directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read directory entry in {path}: {source}")]
    ReadDirEntry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
#[error("failed to decode frame {path}: {source}")]
pub struct FrameDecodeError {
    pub path: PathBuf,
    #[source]
    pub source: image::ImageError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLoadOptions {
    pub width: u32,
    pub height: u32,
    pub extensions: Vec<String>,
}

impl FrameLoadOptions {
    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self {
            width: config.video_width,
            height: config.video_height,
            extensions: config.supported_formats.clone(),
        }
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|accepted| accepted.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
    }
}

/// Ordered frame sequence for one video, decoded once and kept for the
/// lifetime of the store.
#[derive(Debug)]
pub struct FrameStore {
    source_dir: PathBuf,
    options: FrameLoadOptions,
    frames: Vec<Frame>,
}

impl FrameStore {
    pub fn new(source_dir: impl Into<PathBuf>, options: FrameLoadOptions) -> Self {
        Self {
            source_dir: source_dir.into(),
            options,
            frames: Vec::new(),
        }
    }

    /// Store that already holds decoded frames and never touches the disk.
    pub fn from_frames(frames: Vec<Frame>) -> Self {
        let (width, height) = frames
            .first()
            .map(|frame| (frame.width(), frame.height()))
            .unwrap_or((0, 0));
        Self {
            source_dir: PathBuf::new(),
            options: FrameLoadOptions {
                width,
                height,
                extensions: Vec::new(),
            },
            frames,
        }
    }

    pub fn is_loaded(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// Loads from the configured directory unless frames are already present.
    pub fn ensure_loaded(&mut self) -> usize {
        if self.is_loaded() || self.source_dir.as_os_str().is_empty() {
            return self.frames.len();
        }
        self.reload()
    }

    /// Clears any prior frames and loads the configured directory again.
    pub fn reload(&mut self) -> usize {
        if self.source_dir.as_os_str().is_empty() {
            return self.frames.len();
        }
        let dir = self.source_dir.clone();
        self.load(&dir)
    }

    /// Replaces the held frames with the contents of `dir`. Never fails: a
    /// missing or unreadable directory leaves the store empty.
    pub fn load(&mut self, dir: &Path) -> usize {
        self.frames.clear();
        match load_frames(dir, &self.options) {
            Ok(frames) => {
                self.frames = frames;
                info!(
                    dir = %dir.display(),
                    frame_count = self.frames.len(),
                    width = self.options.width,
                    height = self.options.height,
                    "frames_loaded"
                );
            }
            Err(error) => {
                warn!(dir = %dir.display(), error = %error, "frame_directory_unavailable");
            }
        }
        self.frames.len()
    }
}

/// Decodes every accepted file in `dir`, in filename order, resized to the
/// configured resolution. Undecodable files are logged and skipped.
pub fn load_frames(dir: &Path, options: &FrameLoadOptions) -> Result<Vec<Frame>, FrameLoadError> {
    let files = collect_frame_files(dir, options)?;
    let mut frames = Vec::with_capacity(files.len());
    for path in &files {
        match decode_frame(path, options.width, options.height) {
            Ok(frame) => frames.push(frame),
            Err(error) => {
                warn!(path = %error.path.display(), error = %error.source, "frame_decode_failed");
            }
        }
    }
    Ok(frames)
}

pub(crate) fn collect_frame_files(
    dir: &Path,
    options: &FrameLoadOptions,
) -> Result<Vec<PathBuf>, FrameLoadError> {
    if !dir.exists() {
        return Err(FrameLoadError::Missing {
            path: dir.to_path_buf(),
        });
    }
    if !dir.is_dir() {
        return Err(FrameLoadError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let entries = fs::read_dir(dir).map_err(|source| FrameLoadError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::<(String, PathBuf)>::new();
    for entry in entries {
        let entry = entry.map_err(|source| FrameLoadError::ReadDirEntry {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() || !options.accepts(&path) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        files.push((name, path));
    }
    files.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

fn decode_frame(path: &Path, width: u32, height: u32) -> Result<Frame, FrameDecodeError> {
    let decoded = ImageReader::open(path)
        .map_err(|source| FrameDecodeError {
            path: path.to_path_buf(),
            source: image::ImageError::IoError(source),
        })?
        .with_guessed_format()
        .map_err(|source| FrameDecodeError {
            path: path.to_path_buf(),
            source: image::ImageError::IoError(source),
        })?
        .decode()
        .map_err(|source| FrameDecodeError {
            path: path.to_path_buf(),
            source,
        })?;
    let rgba = decoded.to_rgba8();
    if rgba.width() == width && rgba.height() == height {
        return Ok(Frame::from_rgba_image(&rgba));
    }
    let resized = imageops::resize(&rgba, width, height, FilterType::Triangle);
    Ok(Frame::from_rgba_image(&resized))
}
