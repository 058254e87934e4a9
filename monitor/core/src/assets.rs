//! Exercise Asset Layout
//!
//! Reference videos and voice-guidance clips live under one root directory:
//!
//! ```text
//! {root}/{exercise_id}/reference.mp4
//! {root}/{exercise_id}/audio/{clip}
//! ```
//!
//! Exercise ids and clip names come from the network, so every component is
//! checked to be a single plain path segment before it is joined.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Default asset root, relative to the working directory
pub const DEFAULT_ASSET_ROOT: &str = "exercises1";

/// File name of an exercise's reference clip
pub const REFERENCE_CLIP: &str = "reference.mp4";

/// A name from the network that cannot be used as a path segment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    /// Empty exercise id or clip name
    #[error("empty {0}")]
    Empty(&'static str),

    /// Name contains a separator, `..` or is absolute
    #[error("unsafe {what}: {name:?}")]
    Unsafe {
        /// Which kind of name was rejected
        what: &'static str,
        /// The rejected name
        name: String,
    },
}

/// Resolves asset paths for exercises
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetLayout {
    root: PathBuf,
}

impl Default for AssetLayout {
    fn default() -> Self {
        Self::new(DEFAULT_ASSET_ROOT)
    }
}

impl AssetLayout {
    /// Create a layout rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Asset root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the reference clip for an exercise
    ///
    /// # Errors
    ///
    /// Returns [`AssetError`] if the exercise id is not a plain segment.
    pub fn reference_path(&self, exercise_id: &str) -> Result<PathBuf, AssetError> {
        let exercise = segment("exercise id", exercise_id)?;
        Ok(self.root.join(exercise).join(REFERENCE_CLIP))
    }

    /// Path of a voice-guidance clip scoped to an exercise
    ///
    /// # Errors
    ///
    /// Returns [`AssetError`] if the exercise id or clip name is not a
    /// plain segment.
    pub fn clip_path(&self, exercise_id: &str, clip: &str) -> Result<PathBuf, AssetError> {
        let exercise = segment("exercise id", exercise_id)?;
        let clip = segment("clip name", clip)?;
        Ok(self.root.join(exercise).join("audio").join(clip))
    }
}

fn segment<'a>(what: &'static str, name: &'a str) -> Result<&'a str, AssetError> {
    if name.is_empty() {
        return Err(AssetError::Empty(what));
    }

    let mut components = Path::new(name).components();
    let plain = matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none()
        && !name.contains(['/', '\\']);

    if plain {
        Ok(name)
    } else {
        Err(AssetError::Unsafe {
            what,
            name: name.to_string(),
        })
    }
}
