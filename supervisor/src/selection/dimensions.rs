use frame_delta_common::image::Image;
use tracing::debug;

use super::traits::InceptionStrategy;

/// Starts a new group whenever a frame's width or height differs from the
/// inception, since such frames cannot be diffed against it.
#[derive(Debug, Default)]
pub struct DimensionChange;

impl InceptionStrategy for DimensionChange {
    fn should_reselect(&mut self, inception: &Image, current: &Image) -> bool {
        let changed = inception.dimensions() != current.dimensions();
        if changed {
            debug!(
                inception = ?inception.dimensions(),
                current = ?current.dimensions(),
                "frame size changed"
            );
        }
        changed
    }

    fn name(&self) -> &str {
        "dimensions"
    }
}
