use frame_delta_common::image::Image;

use super::traits::InceptionStrategy;

/// Keeps the first inception for the whole run.
#[derive(Debug, Default)]
pub struct NeverReselect;

impl InceptionStrategy for NeverReselect {
    fn should_reselect(&mut self, _inception: &Image, _current: &Image) -> bool {
        false
    }

    fn name(&self) -> &str {
        "never"
    }
}
