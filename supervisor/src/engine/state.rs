use frame_delta_common::frame::Frame;
use frame_delta_common::image::Image;
use std::path::PathBuf;

/// Where the engine stands within the current frame group.
pub(super) enum GroupState {
    /// No frame of the group has been seen yet.
    AwaitingInception,
    /// The group's reference frame is known; later frames diff against it.
    HasInception(Inception),
}

/// The reference frame of one group, alive until the group ends.
pub(super) struct Inception {
    pub image: Image,
    pub frame: Frame,
    /// Absolute path the artifacts of this group are keyed on.
    pub source: PathBuf,
    /// Differences written so far in this group.
    pub diffs: usize,
}

impl Inception {
    pub fn new(image: Image, frame: Frame, source: PathBuf) -> Self {
        Self {
            image,
            frame,
            source,
            diffs: 0,
        }
    }
}
