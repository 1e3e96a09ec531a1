pub mod dimensions;
pub mod never;
pub mod threshold;
pub mod traits;

use frame_delta_common::config::EngineConfig;

use dimensions::DimensionChange;
use never::NeverReselect;
use threshold::DifferenceThreshold;
pub use traits::InceptionStrategy;

/// Build the strategy named in the engine config. `None` for unknown names.
pub fn from_config(config: &EngineConfig) -> Option<Box<dyn InceptionStrategy>> {
    match config.inception.as_str() {
        "never" => Some(Box::new(NeverReselect)),
        "dimensions" => Some(Box::new(DimensionChange)),
        "threshold" => Some(Box::new(DifferenceThreshold::new(config.threshold))),
        _ => None,
    }
}
