pub mod moment_span;
pub mod shape_distance;
pub mod traits;

use shape_stream_common::config::{MatchAlgorithm, MatcherConfig};

pub use moment_span::MomentSpanMatcher;
pub use shape_distance::ShapeDistanceMatcher;
pub use traits::ShapeMatcher;

/// Build the matcher selected in the config.
pub fn from_config(config: &MatcherConfig) -> Box<dyn ShapeMatcher> {
    match config.algorithm {
        MatchAlgorithm::MomentSpan => Box::new(MomentSpanMatcher::new(config.span)),
        MatchAlgorithm::ShapeDistance => Box::new(ShapeDistanceMatcher::new(config.comp_factor)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_selects_algorithm() {
        let mut config = MatcherConfig::default();
        assert_eq!(from_config(&config).name(), "shape_distance");
        config.algorithm = MatchAlgorithm::MomentSpan;
        assert_eq!(from_config(&config).name(), "moment_span");
    }
}
