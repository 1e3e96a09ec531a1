use frame_delta_common::image::Image;
use tracing::debug;

use super::traits::InceptionStrategy;
use crate::codec::mean_absolute_difference;

/// Starts a new group once a frame drifts too far from the inception.
///
/// Drift is the mean absolute channel difference (0..=255). A frame of a
/// different size always counts as drifted.
#[derive(Debug)]
pub struct DifferenceThreshold {
    threshold: f64,
}

impl DifferenceThreshold {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl InceptionStrategy for DifferenceThreshold {
    fn should_reselect(&mut self, inception: &Image, current: &Image) -> bool {
        let Some(distance) = mean_absolute_difference(inception, current) else {
            debug!("frame size changed, treating as drift");
            return true;
        };
        let reselect = distance > self.threshold;
        debug!(
            distance = format!("{:.3}", distance),
            threshold = format!("{:.3}", self.threshold),
            reselect,
            "inception drift check"
        );
        reselect
    }

    fn name(&self) -> &str {
        "threshold"
    }
}
