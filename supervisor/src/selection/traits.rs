use frame_delta_common::image::Image;

/// Decides when a frame group ends and a new inception frame is chosen.
///
/// Implementations see the current inception and the frame being processed
/// and answer before any difference is computed.
pub trait InceptionStrategy {
    /// Returns `true` if `current` should become the new inception (starting
    /// a new group) instead of being diffed against `inception`.
    fn should_reselect(&mut self, inception: &Image, current: &Image) -> bool;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}
